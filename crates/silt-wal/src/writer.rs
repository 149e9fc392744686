//! Log manager for appending records to the write-ahead log.

use crate::record::{LogRecord, Lsn};
use parking_lot::Mutex;
use silt_common::{Result, SiltError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Configuration for the log manager.
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Directory for the log file.
    pub wal_dir: PathBuf,
    /// Enable fsync after each append.
    pub fsync_enabled: bool,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            wal_dir: PathBuf::from("./data/wal"),
            fsync_enabled: true,
        }
    }
}

/// Thread-safe log manager appending records to a single log file.
///
/// LSNs are byte offsets into the file and increase monotonically. The
/// buffer pool holds a handle to this type without driving it; callers that
/// want logging append records themselves.
pub struct LogManager {
    /// Configuration.
    config: WalConfig,
    /// The open log file, None after close.
    file: Mutex<Option<File>>,
    /// Next LSN to assign (current end of file).
    next_lsn: AtomicU64,
}

impl LogManager {
    /// Name of the log file within the WAL directory.
    const LOG_FILE: &'static str = "silt.wal";

    /// Creates a log manager, opening or creating the log file.
    ///
    /// Appends resume at the current end of the file.
    pub fn new(config: WalConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.wal_dir)?;

        let path = config.wal_dir.join(Self::LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let next_lsn = file.metadata()?.len();

        Ok(Self {
            config,
            file: Mutex::new(Some(file)),
            next_lsn: AtomicU64::new(next_lsn),
        })
    }

    /// Returns the directory containing the log file.
    pub fn wal_dir(&self) -> &Path {
        &self.config.wal_dir
    }

    /// Returns the next LSN that will be assigned.
    pub fn next_lsn(&self) -> Lsn {
        Lsn(self.next_lsn.load(Ordering::SeqCst))
    }

    /// Appends a log record and returns its assigned LSN.
    pub fn append(&self, mut record: LogRecord) -> Result<Lsn> {
        let mut file_guard = self.file.lock();
        let file = file_guard
            .as_mut()
            .ok_or_else(|| SiltError::WalWriteFailed("log closed".to_string()))?;

        // LSN assignment and the write happen under the same lock so
        // records land in the file in LSN order.
        let lsn = Lsn(self.next_lsn.load(Ordering::SeqCst));
        record.lsn = lsn;

        let encoded = record.encode()?;
        file.write_all(&encoded)?;

        if self.config.fsync_enabled {
            file.sync_all()?;
        }

        self.next_lsn
            .store(lsn.advance(encoded.len() as u64).0, Ordering::SeqCst);

        Ok(lsn)
    }

    /// Forces any buffered log data to disk.
    pub fn flush(&self) -> Result<()> {
        let file_guard = self.file.lock();
        if let Some(file) = file_guard.as_ref() {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Closes the log file. Further appends fail.
    pub fn close(&self) -> Result<()> {
        let mut file_guard = self.file.lock();
        if let Some(file) = file_guard.take() {
            file.sync_all()?;
        }
        Ok(())
    }
}
