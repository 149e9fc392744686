//! Buffer pool manager.

use crate::frame::{BufferFrame, FrameId};
use crate::replacer::{ClockReplacer, Replacer};
use parking_lot::Mutex;
use silt_common::page::{PageId, PAGE_SIZE};
use silt_common::{Result, SiltError};
use silt_wal::LogManager;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use sysinfo::System;
use tracing::debug;

/// Contract the buffer pool requires from the disk layer.
///
/// Reads of pages that were never written observe zero-filled content.
/// Writes are durable when they return. `allocate_page` hands out fresh,
/// monotonically increasing ids; `deallocate_page` is best-effort
/// reclamation with no ordering guarantee.
pub trait DiskStore: Send + Sync {
    /// Reads a page into the provided buffer.
    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()>;

    /// Writes a page from the provided buffer.
    fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()>;

    /// Allocates a fresh page id.
    fn allocate_page(&self) -> Result<PageId>;

    /// Releases a page id.
    fn deallocate_page(&self, page_id: PageId) -> Result<()>;
}

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

/// Cache-management state, guarded by one coarse lock per pool.
///
/// Every operation read-modify-writes overlapping parts of this struct, so
/// it lives behind a single mutex; frame content has its own per-frame lock.
struct PoolState {
    /// Authoritative page id to frame id mapping. Injective for resident
    /// pages.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no valid page content. Disjoint from the replacer's
    /// candidate set.
    free_list: VecDeque<FrameId>,
    /// Page replacement policy.
    replacer: ClockReplacer,
}

/// Buffer pool manager.
///
/// Multiplexes a fixed set of memory frames across an unbounded set of
/// on-disk pages:
/// - Page table mapping resident page ids to frame indices
/// - Free frame list for frames holding no content
/// - Clock replacement for eviction among unpinned frames
/// - Pin counting so in-use pages are never evicted
///
/// Dirty pages are written through on unpin: once `unpin_page` with
/// `is_dirty = true` returns, the content is on disk.
pub struct BufferPoolManager {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames, allocated once for the process lifetime.
    frames: Vec<BufferFrame>,
    /// Cache-management state.
    state: Mutex<PoolState>,
    /// Disk collaborator performing the actual page I/O.
    disk: Arc<dyn DiskStore>,
    /// Log manager handle, held for callers; never driven by the pool.
    log_manager: Option<Arc<LogManager>>,
}

impl BufferPoolManager {
    /// Creates a new buffer pool manager.
    pub fn new(
        config: BufferPoolConfig,
        disk: Arc<dyn DiskStore>,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        let num_frames = config.num_frames;

        let frames: Vec<_> = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();

        // All frames start in the free list.
        let free_list: VecDeque<_> = (0..num_frames).map(|i| FrameId(i as u32)).collect();

        Self {
            config,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(num_frames),
                free_list,
                replacer: ClockReplacer::new(num_frames),
            }),
            disk,
            log_manager,
        }
    }

    /// Creates a buffer pool sized to 25% of available system RAM.
    ///
    /// Minimum 1,000 frames so caching stays useful on low-memory systems.
    pub fn auto_sized(disk: Arc<dyn DiskStore>, log_manager: Option<Arc<LogManager>>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4;
        let num_frames = (target_bytes / PAGE_SIZE).max(1_000);

        Self::new(BufferPoolConfig { num_frames }, disk, log_manager)
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the number of free frames.
    pub fn free_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Returns the number of pages currently resident.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Checks if a page is resident in the pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Returns the pin count of a resident page.
    pub fn pin_count_of(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        let frame_id = state.page_table.get(&page_id)?;
        Some(self.frames[frame_id.0 as usize].pin_count())
    }

    /// Returns the log manager handle passed at construction.
    pub fn log_manager(&self) -> Option<&Arc<LogManager>> {
        self.log_manager.as_ref()
    }

    /// Acquires a frame for a new resident page: free list first, then a
    /// victim from the replacer. A dirty victim is written back before its
    /// frame is reused, and its page-table entry is removed. The returned
    /// frame is reset and zero-filled.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            self.frames[frame_id.0 as usize].reset();
            return Ok(frame_id);
        }

        let victim_id = state.replacer.victim().ok_or(SiltError::BufferPoolFull)?;
        let frame = &self.frames[victim_id.0 as usize];

        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                let write_result = {
                    let data = frame.data();
                    self.disk.write_page(old_page_id, &**data)
                };
                if let Err(e) = write_result {
                    // The frame still holds a valid page; restore its
                    // eviction candidacy before giving up.
                    state.replacer.unpin(victim_id);
                    return Err(e);
                }
                frame.clear_dirty();
            }
            debug!(page = %old_page_id, frame = %victim_id, "evicting page");
            state.page_table.remove(&old_page_id);
        }

        frame.reset();
        Ok(victim_id)
    }

    /// Fetches a page, pinning it.
    ///
    /// A resident page is pinned and returned directly. Otherwise a frame
    /// is acquired (evicting if needed) and the content is loaded from
    /// disk. Fails with [`SiltError::BufferPoolFull`] when every frame is
    /// pinned; callers decide their own retry policy.
    pub fn fetch_page(&self, page_id: PageId) -> Result<&BufferFrame> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.pin() == 1 {
                // First pin after idling at zero: withdraw from candidacy.
                state.replacer.pin(frame_id);
            }
            return Ok(frame);
        }

        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.0 as usize];

        let read_result = {
            let mut data = frame.data_mut();
            self.disk.read_page(page_id, &mut **data)
        };
        if let Err(e) = read_result {
            state.free_list.push_back(frame_id);
            return Err(e);
        }

        frame.set_page_id(Some(page_id));
        frame.pin();
        state.page_table.insert(page_id, frame_id);

        Ok(frame)
    }

    /// Allocates a fresh page on disk and installs it, pinned and
    /// zero-filled, without reading from disk.
    pub fn new_page(&self) -> Result<(PageId, &BufferFrame)> {
        let mut state = self.state.lock();

        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.0 as usize];

        let page_id = match self.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        };

        frame.set_page_id(Some(page_id));
        frame.pin();
        state.page_table.insert(page_id, frame_id);

        debug!(page = %page_id, frame = %frame_id, "created page");
        Ok((page_id, frame))
    }

    /// Unpins a page, ORing in the dirty flag.
    ///
    /// Returns `Ok(false)` if the page is not resident. When the pin count
    /// reaches zero the frame becomes an eviction candidate (never a free
    /// frame: it still holds valid content). A dirty page is written
    /// through before this call returns, so a later fetch after eviction
    /// always observes the committed content.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<bool> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.0 as usize];

        if is_dirty {
            frame.mark_dirty();
        }

        if frame.unpin() == 0 {
            state.replacer.unpin(frame_id);
        }

        if frame.is_dirty() {
            {
                let data = frame.data();
                self.disk.write_page(page_id, &**data)?;
            }
            frame.clear_dirty();
        }

        Ok(true)
    }

    /// Writes a resident page to disk unconditionally.
    ///
    /// Returns `Ok(false)` if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.0 as usize];

        {
            let data = frame.data();
            self.disk.write_page(page_id, &**data)?;
        }
        frame.clear_dirty();

        Ok(true)
    }

    /// Flushes every resident page. Returns the number of pages written.
    pub fn flush_all(&self) -> Result<usize> {
        let state = self.state.lock();

        let mut flushed = 0;
        for (&page_id, &frame_id) in state.page_table.iter() {
            let frame = &self.frames[frame_id.0 as usize];
            {
                let data = frame.data();
                self.disk.write_page(page_id, &**data)?;
            }
            frame.clear_dirty();
            flushed += 1;
        }

        Ok(flushed)
    }

    /// Deletes a page from the pool and deallocates it on disk.
    ///
    /// Returns `Ok(true)` when the page is absent (idempotent) or deleted,
    /// `Ok(false)` when it is pinned. The frame index is captured before
    /// the page-table entry is erased; the emptied frame returns to the
    /// free list.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.0 as usize];

        if frame.is_pinned() {
            return Ok(false);
        }

        self.disk.deallocate_page(page_id)?;
        state.page_table.remove(&page_id);
        // The frame leaves the replacer before it joins the free list; the
        // two sets stay disjoint.
        state.replacer.pin(frame_id);
        frame.reset();
        state.free_list.push_back(frame_id);

        debug!(page = %page_id, frame = %frame_id, "deleted page");
        Ok(true)
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("num_frames", &self.config.num_frames)
            .field("free_count", &self.free_count())
            .field("page_count", &self.page_count())
            .finish()
    }
}
