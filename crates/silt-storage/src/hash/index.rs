//! Disk-backed linear-probing hash index.
//!
//! A fixed-capacity map over (key, value) pairs stored entirely in buffer
//! pool pages: one header page plus N block pages, created once at
//! construction. Every access pins the pages it touches through the buffer
//! pool and unpins them before returning.
//!
//! Probing is confined to a key's home block; there is no wraparound into
//! other blocks, no spill, and no resizing. Capacity is pre-sized by the
//! caller and fixed for the index's lifetime.

use super::block::{BlockLayout, HashBlock, HashBlockMut};
use super::codec::{FixedCodec, HashFunction, KeyComparator};
use super::header::{HashHeader, HashHeaderMut, MAX_BLOCKS};
use silt_buffer::BufferPoolManager;
use silt_common::{PageId, Result, SiltError};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Disk-backed hash table with linear probing, layered on the buffer pool.
pub struct LinearProbeHashIndex<K, V, C, H> {
    /// Index name, bookkeeping only.
    name: String,
    /// The buffer pool mediating every page access.
    pool: Arc<BufferPoolManager>,
    /// Key equality capability.
    comparator: C,
    /// Key hash capability.
    hash_fn: H,
    /// Root page recording the block pages.
    header_page_id: PageId,
    /// Number of block pages, fixed at construction.
    num_blocks: usize,
    _marker: PhantomData<(K, V)>,
}

impl<K, V, C, H> LinearProbeHashIndex<K, V, C, H>
where
    K: FixedCodec,
    V: FixedCodec + PartialEq,
    C: KeyComparator<K>,
    H: HashFunction<K>,
{
    /// Creates a new index with `num_blocks` block pages.
    ///
    /// Allocates the header page and every block page through the buffer
    /// pool, records the block ids in allocation order, and unpins each
    /// page once its initial write is complete. The pool needs at least
    /// two free frames during construction (header plus one block).
    pub fn new(
        name: impl Into<String>,
        pool: Arc<BufferPoolManager>,
        comparator: C,
        num_blocks: usize,
        hash_fn: H,
    ) -> Result<Self> {
        if num_blocks == 0 || num_blocks > MAX_BLOCKS {
            return Err(SiltError::ConfigError(format!(
                "block count {} outside 1..={}",
                num_blocks, MAX_BLOCKS
            )));
        }

        let name = name.into();
        let (header_page_id, header_frame) = pool.new_page()?;

        {
            let mut data = header_frame.data_mut();
            let mut header = HashHeaderMut::new(&mut data[..]);
            header.set_page_id(header_page_id);
            header.set_capacity((num_blocks * BlockLayout::<K, V>::CAPACITY) as u64);
        }

        for _ in 0..num_blocks {
            // A fresh page is zero-filled: every slot unoccupied. That is
            // the block's initial state, so only the header needs writing.
            let (block_page_id, _) = pool.new_page()?;
            {
                let mut data = header_frame.data_mut();
                HashHeaderMut::new(&mut data[..]).add_block_page_id(block_page_id)?;
            }
            pool.unpin_page(block_page_id, true)?;
        }

        pool.unpin_page(header_page_id, true)?;

        debug!(
            index = %name,
            header = %header_page_id,
            blocks = num_blocks,
            "created hash index"
        );

        Ok(Self {
            name,
            pool,
            comparator,
            hash_fn,
            header_page_id,
            num_blocks,
            _marker: PhantomData,
        })
    }

    /// Returns the index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the header page id.
    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    /// Returns the number of block pages.
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Returns the total slot capacity. Fixed at construction; the index
    /// never grows.
    pub fn capacity(&self) -> usize {
        self.num_blocks * BlockLayout::<K, V>::CAPACITY
    }

    /// Resolves the home block page for a hash through the header page.
    fn home_block_page(&self, hash: u64) -> Result<PageId> {
        let frame = self.pool.fetch_page(self.header_page_id)?;
        let block_page_id = {
            let data = frame.data();
            let header = HashHeader::new(&data[..]);
            match header.validate(self.num_blocks) {
                Ok(()) => Ok(header.block_page_id((hash % self.num_blocks as u64) as usize)),
                Err(e) => Err(e),
            }
        };
        self.pool.unpin_page(self.header_page_id, false)?;
        block_page_id
    }

    /// Returns every value on the key's probe chain.
    ///
    /// Scans from the home slot upward, stopping at the first unoccupied
    /// slot; tombstones are skipped but keep the chain alive. Returns an
    /// empty vec when nothing matches.
    pub fn get(&self, key: K) -> Result<Vec<V>> {
        let hash = self.hash_fn.hash(&key);
        let block_page_id = self.home_block_page(hash)?;
        let frame = self.pool.fetch_page(block_page_id)?;

        let mut values = Vec::new();
        {
            let data = frame.data();
            let block = HashBlock::<K, V>::new(&data[..]);
            let mut slot = (hash % BlockLayout::<K, V>::CAPACITY as u64) as usize;
            while slot < BlockLayout::<K, V>::CAPACITY {
                if !block.is_occupied(slot) {
                    break;
                }
                if block.is_readable(slot) {
                    values.push(block.value_at(slot));
                }
                slot += 1;
            }
        }

        self.pool.unpin_page(block_page_id, false)?;
        Ok(values)
    }

    /// Inserts a (key, value) pair.
    ///
    /// Fails with [`SiltError::DuplicateEntry`] if an identical pair is
    /// already live on the probe chain, and with [`SiltError::BlockFull`]
    /// if the home block has no free slot; there is no spill into other
    /// blocks.
    pub fn insert(&self, key: K, value: V) -> Result<()> {
        let hash = self.hash_fn.hash(&key);
        let block_page_id = self.home_block_page(hash)?;
        let frame = self.pool.fetch_page(block_page_id)?;

        let mut data = frame.data_mut();
        let home_slot = (hash % BlockLayout::<K, V>::CAPACITY as u64) as usize;

        // Walk the chain once: detect a duplicate anywhere on it and
        // remember the first claimable slot (tombstoned or unoccupied).
        let mut duplicate = false;
        let mut first_free = None;
        {
            let block = HashBlock::<K, V>::new(&data[..]);
            let mut slot = home_slot;
            while slot < BlockLayout::<K, V>::CAPACITY {
                if !block.is_occupied(slot) {
                    if first_free.is_none() {
                        first_free = Some(slot);
                    }
                    break;
                }
                if block.is_readable(slot) {
                    if self.comparator.eq(&block.key_at(slot), &key)
                        && block.value_at(slot) == value
                    {
                        duplicate = true;
                        break;
                    }
                } else if first_free.is_none() {
                    first_free = Some(slot);
                }
                slot += 1;
            }
        }

        if duplicate {
            drop(data);
            self.pool.unpin_page(block_page_id, false)?;
            return Err(SiltError::DuplicateEntry);
        }

        match first_free {
            Some(slot) => {
                HashBlockMut::<K, V>::new(&mut data[..]).put(slot, &key, &value);
                drop(data);
                self.pool.unpin_page(block_page_id, true)?;
                Ok(())
            }
            None => {
                drop(data);
                self.pool.unpin_page(block_page_id, false)?;
                Err(SiltError::BlockFull)
            }
        }
    }

    /// Removes the first entry on the key's probe chain whose value equals
    /// `value`, leaving a tombstone.
    ///
    /// Returns `Ok(false)` when the chain ends without a match.
    pub fn remove(&self, key: K, value: V) -> Result<bool> {
        let hash = self.hash_fn.hash(&key);
        let block_page_id = self.home_block_page(hash)?;
        let frame = self.pool.fetch_page(block_page_id)?;

        let mut data = frame.data_mut();

        let mut found = None;
        {
            let block = HashBlock::<K, V>::new(&data[..]);
            let mut slot = (hash % BlockLayout::<K, V>::CAPACITY as u64) as usize;
            while slot < BlockLayout::<K, V>::CAPACITY {
                if block.is_readable(slot) && block.value_at(slot) == value {
                    found = Some(slot);
                    break;
                }
                if !block.is_occupied(slot) {
                    break;
                }
                slot += 1;
            }
        }

        match found {
            Some(slot) => {
                HashBlockMut::<K, V>::new(&mut data[..]).remove(slot);
                drop(data);
                self.pool.unpin_page(block_page_id, true)?;
                Ok(true)
            }
            None => {
                drop(data);
                self.pool.unpin_page(block_page_id, false)?;
                Ok(false)
            }
        }
    }
}
