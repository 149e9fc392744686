//! Error types for SiltDB.

use thiserror::Error;

/// Result type alias using SiltError.
pub type Result<T> = std::result::Result<T, SiltError>;

/// Errors that can occur in SiltDB operations.
#[derive(Debug, Error)]
pub enum SiltError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Buffer pool errors
    #[error("Buffer pool full, unable to acquire a frame")]
    BufferPoolFull,

    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: u32 },

    #[error("Page pinned: {page_id}, pin count {pin_count}")]
    PagePinned { page_id: u32, pin_count: u32 },

    #[error("Page corrupted: {page_id}, reason: {reason}")]
    PageCorrupted { page_id: u32, reason: String },

    // Hash index errors
    #[error("Duplicate entry")]
    DuplicateEntry,

    #[error("Block full, no free slot in home block")]
    BlockFull,

    // WAL errors
    #[error("WAL write failed: {0}")]
    WalWriteFailed(String),

    #[error("WAL corrupted at offset {offset}: {reason}")]
    WalCorrupted { offset: u64, reason: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
