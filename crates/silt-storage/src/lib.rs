//! Storage engine for SiltDB.
//!
//! This crate provides:
//! - Disk manager for page-level file I/O
//! - Disk-backed linear-probing hash index layered on the buffer pool

mod disk;
mod hash;

pub use disk::{DiskManager, DiskManagerConfig};
pub use hash::{
    BlockLayout, DefaultComparator, FixedCodec, HashBlock, HashBlockMut, HashFunction, HashHeader,
    HashHeaderMut, KeyComparator, LinearProbeHashIndex, MulHash, HEADER_META_SIZE, MAX_BLOCKS,
};
