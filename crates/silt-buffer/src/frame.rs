//! Buffer frames: the fixed memory slots that pages are cached in.

use parking_lot::RwLock;
use silt_common::page::{PageId, PAGE_SIZE};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Position of a frame within the buffer pool's frame array.
///
/// Frame ids are assigned once at pool construction and are stable for the
/// process lifetime; the page table maps page ids to these indices, never
/// to raw addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl FrameId {
    /// Invalid frame ID.
    pub const INVALID: FrameId = FrameId(u32::MAX);

    /// Returns true if this is a valid frame ID.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame:{}", self.0)
    }
}

/// One slot of the buffer pool, cycling through many page identities.
///
/// Metadata (resident page, pin count, dirty flag) is atomic so it can be
/// inspected without the content lock; the content itself sits behind a
/// per-frame `RwLock` so reads and writes of unrelated pages never
/// serialize against each other. Identity changes are the pool's business:
/// the mutators are crate-private and called only under the pool's state
/// lock.
pub struct BufferFrame {
    frame_id: FrameId,
    /// Raw id of the resident page; `PageId::INVALID` when empty.
    page_id: AtomicU32,
    /// Users currently holding this page. Nonzero forbids eviction.
    pin_count: AtomicU32,
    /// Set when the in-memory content diverged from disk.
    dirty: AtomicBool,
    /// The cached page content.
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl BufferFrame {
    pub(crate) fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            page_id: AtomicU32::new(PageId::INVALID.0),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    /// Returns the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the id of the resident page, if any.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        let raw = self.page_id.load(Ordering::Acquire);
        (raw != PageId::INVALID.0).then_some(PageId(raw))
    }

    #[inline]
    pub(crate) fn set_page_id(&self, page_id: Option<PageId>) {
        let raw = page_id.unwrap_or(PageId::INVALID).0;
        self.page_id.store(raw, Ordering::Release);
    }

    /// Returns true if no page is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_id().is_none()
    }

    /// Returns the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Returns true if this frame is pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Increments the pin count and returns the new count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count, saturating at zero, and returns the new
    /// count.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        match self
            .pin_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            }) {
            Ok(previous) => previous - 1,
            Err(_) => 0,
        }
    }

    /// Returns true if this frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Flags the content as diverged from disk.
    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub(crate) fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    /// Locks the page content for reading.
    #[inline]
    pub fn data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.read()
    }

    /// Locks the page content for writing.
    #[inline]
    pub fn data_mut(&self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.write()
    }

    /// Returns the frame to its empty state: no page, no pins, clean,
    /// zero-filled content.
    pub(crate) fn reset(&self) {
        self.set_page_id(None);
        self.pin_count.store(0, Ordering::Release);
        self.clear_dirty();
        self.data.write().fill(0);
    }
}

impl std::fmt::Debug for BufferFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferFrame")
            .field("frame_id", &self.frame_id)
            .field("page_id", &self.page_id())
            .field("pin_count", &self.pin_count())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_id_sentinel() {
        assert!(FrameId(0).is_valid());
        assert!(FrameId(123).is_valid());
        assert!(!FrameId::INVALID.is_valid());
        assert_eq!(FrameId(42).to_string(), "frame:42");
    }

    #[test]
    fn test_frame_starts_empty() {
        let frame = BufferFrame::new(FrameId(3));

        assert_eq!(frame.frame_id(), FrameId(3));
        assert!(frame.is_empty());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_frame_pin_counting() {
        let frame = BufferFrame::new(FrameId(0));

        assert_eq!(frame.pin(), 1);
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.unpin(), 1);
        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());

        // Saturates rather than wrapping on an unbalanced unpin.
        assert_eq!(frame.unpin(), 0);
        assert_eq!(frame.pin_count(), 0);
    }

    #[test]
    fn test_frame_page_identity() {
        let frame = BufferFrame::new(FrameId(0));

        frame.set_page_id(Some(PageId(9)));
        assert_eq!(frame.page_id(), Some(PageId(9)));
        assert!(!frame.is_empty());

        frame.set_page_id(None);
        assert!(frame.is_empty());
    }

    #[test]
    fn test_frame_dirty_flag() {
        let frame = BufferFrame::new(FrameId(0));

        frame.mark_dirty();
        assert!(frame.is_dirty());
        frame.clear_dirty();
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_content_round_trip() {
        let frame = BufferFrame::new(FrameId(0));

        {
            let mut data = frame.data_mut();
            data[0] = 0x12;
            data[PAGE_SIZE - 1] = 0x34;
        }

        let data = frame.data();
        assert_eq!(data[0], 0x12);
        assert_eq!(data[PAGE_SIZE - 1], 0x34);
    }

    #[test]
    fn test_frame_reset_clears_everything() {
        let frame = BufferFrame::new(FrameId(0));

        frame.set_page_id(Some(PageId(1)));
        frame.pin();
        frame.mark_dirty();
        frame.data_mut()[10] = 0xFF;

        frame.reset();

        assert!(frame.is_empty());
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert_eq!(frame.data()[10], 0);
    }

    #[test]
    fn test_frame_debug_format() {
        let frame = BufferFrame::new(FrameId(5));
        frame.set_page_id(Some(PageId(10)));
        frame.pin();

        let rendered = format!("{:?}", frame);
        assert!(rendered.contains("BufferFrame"));
        assert!(rendered.contains("pin_count"));
    }
}
