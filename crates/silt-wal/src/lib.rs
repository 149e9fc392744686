//! Write-ahead logging for SiltDB.
//!
//! This crate provides an append-only log of records identified by LSN.
//! The buffer pool accepts a [`LogManager`] handle at construction and
//! passes it through untouched; components that log do so directly.

mod record;
mod writer;

pub use record::{LogRecord, LogRecordType, Lsn};
pub use writer::{LogManager, WalConfig};
