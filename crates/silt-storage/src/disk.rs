//! Disk manager for page-level file I/O.

use parking_lot::Mutex;
use silt_buffer::DiskStore;
use silt_common::page::{PageId, PAGE_SIZE};
use silt_common::Result;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Configuration for the disk manager.
#[derive(Debug, Clone)]
pub struct DiskManagerConfig {
    /// Base directory for the data file.
    pub data_dir: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for DiskManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fsync_enabled: true,
        }
    }
}

/// Manages reading and writing pages in a single data file.
///
/// Page ids are byte offsets divided by the page size and are allocated in
/// monotonically increasing order. Reads of pages that were never written
/// observe zero-filled content; deallocation is best-effort bookkeeping
/// and never reuses an id.
pub struct DiskManager {
    /// Configuration.
    config: DiskManagerConfig,
    /// File state, guarded for seek/read pairs.
    inner: Mutex<DiskInner>,
}

struct DiskInner {
    /// The open data file.
    file: File,
    /// Number of pages the file currently spans.
    num_pages: u32,
}

impl DiskManager {
    /// Name of the data file within the data directory.
    const DATA_FILE: &'static str = "pages.dat";

    /// Creates a new disk manager, opening or creating the data file.
    pub fn new(config: DiskManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let path = config.data_dir.join(Self::DATA_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            config,
            inner: Mutex::new(DiskInner { file, num_pages }),
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Returns the number of pages in the data file.
    pub fn num_pages(&self) -> u32 {
        self.inner.lock().num_pages
    }

    /// Reads a page from disk.
    ///
    /// A page beyond the current end of the file reads as zero-filled.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let mut inner = self.inner.lock();

        if page_id.0 >= inner.num_pages {
            buf.fill(0);
            return Ok(());
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.read_exact(buf)?;

        Ok(())
    }

    /// Writes a page to disk, extending the file if needed.
    ///
    /// Durable on return when fsync is enabled.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let mut inner = self.inner.lock();

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(data)?;

        if self.config.fsync_enabled {
            inner.file.sync_all()?;
        }

        if page_id.0 >= inner.num_pages {
            inner.num_pages = page_id.0 + 1;
        }

        Ok(())
    }

    /// Allocates a new page at the end of the file.
    ///
    /// Returns the PageId of the newly allocated page. Ids increase
    /// monotonically and survive reopen.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut inner = self.inner.lock();

        let page_id = PageId(inner.num_pages);

        // Extend the file with a zeroed page so the id is durable.
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&[0u8; PAGE_SIZE])?;

        if self.config.fsync_enabled {
            inner.file.sync_all()?;
        }

        inner.num_pages = page_id.0 + 1;

        trace!(page = %page_id, "allocated page");
        Ok(page_id)
    }

    /// Releases a page id.
    ///
    /// Best-effort: the id is never handed out again and the space is not
    /// reclaimed.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        trace!(page = %page_id, "deallocated page");
        Ok(())
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        let inner = self.inner.lock();
        inner.file.sync_all()?;
        Ok(())
    }
}

impl DiskStore for DiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        DiskManager::read_page(self, page_id, buf)
    }

    fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        DiskManager::write_page(self, page_id, data)
    }

    fn allocate_page(&self) -> Result<PageId> {
        DiskManager::allocate_page(self)
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        DiskManager::deallocate_page(self, page_id)
    }
}
