//! Buffer pool management for SiltDB.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size buffer pool with configurable frame count
//! - Clock eviction policy with second-chance semantics
//! - Pin counting so in-use pages are never evicted
//! - Write-through of dirty pages on unpin
//!
//! The disk layer is consumed through the [`DiskStore`] trait; the pool
//! never touches files itself.

mod frame;
mod pool;
mod replacer;

pub use frame::{BufferFrame, FrameId};
pub use pool::{BufferPoolConfig, BufferPoolManager, DiskStore};
pub use replacer::{ClockReplacer, Replacer};
