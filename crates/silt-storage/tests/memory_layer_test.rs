//! Integration tests for the SiltDB memory layer:
//! - Buffer pool eviction and write-through over the real disk manager
//! - Hash index operations under eviction pressure
//! - Log manager handle plumbing

use rand::seq::SliceRandom;
use std::sync::Arc;

use silt_buffer::{BufferPoolConfig, BufferPoolManager, DiskStore};
use silt_common::page::{PageId, PAGE_SIZE};
use silt_common::SiltError;
use silt_storage::{
    DefaultComparator, DiskManager, DiskManagerConfig, LinearProbeHashIndex, MulHash,
};
use silt_wal::{LogManager, LogRecord, LogRecordType, WalConfig};

fn create_disk(dir: &tempfile::TempDir) -> Arc<DiskManager> {
    Arc::new(
        DiskManager::new(DiskManagerConfig {
            data_dir: dir.path().to_path_buf(),
            fsync_enabled: false,
        })
        .unwrap(),
    )
}

fn create_pool(disk: Arc<DiskManager>, num_frames: usize) -> Arc<BufferPoolManager> {
    Arc::new(BufferPoolManager::new(
        BufferPoolConfig { num_frames },
        disk as Arc<dyn DiskStore>,
        None,
    ))
}

#[test]
fn test_pool_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let disk = create_disk(&dir);
    let pool = create_pool(Arc::clone(&disk), 3);

    // Write distinct content into more pages than the pool has frames.
    let mut page_ids = Vec::new();
    for i in 0..10u8 {
        let (page_id, frame) = pool.new_page().unwrap();
        frame.data_mut()[0] = i;
        frame.data_mut()[PAGE_SIZE - 1] = i;
        pool.unpin_page(page_id, true).unwrap();
        page_ids.push(page_id);
    }

    // At most 3 pages can be resident; the rest were evicted after their
    // write-through.
    assert_eq!(pool.page_count(), 3);

    // Every page fetches back with its committed content.
    for (i, page_id) in page_ids.iter().enumerate() {
        let frame = pool.fetch_page(*page_id).unwrap();
        assert_eq!(frame.data()[0], i as u8);
        assert_eq!(frame.data()[PAGE_SIZE - 1], i as u8);
        pool.unpin_page(*page_id, false).unwrap();
    }
}

#[test]
fn test_pool_content_visible_to_new_pool() {
    let dir = tempfile::tempdir().unwrap();
    let disk = create_disk(&dir);
    let page_id;

    {
        let pool = create_pool(Arc::clone(&disk), 2);
        let (id, frame) = pool.new_page().unwrap();
        frame.data_mut()[42] = 0x42;
        pool.unpin_page(id, true).unwrap();
        page_id = id;
    }

    // A cache-cold pool over the same disk observes the write-through.
    let pool = create_pool(disk, 2);
    let frame = pool.fetch_page(page_id).unwrap();
    assert_eq!(frame.data()[42], 0x42);
}

#[test]
fn test_pool_exhaustion_and_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let disk = create_disk(&dir);
    let pool = create_pool(disk, 2);

    let (page_a, frame_a) = pool.new_page().unwrap();
    frame_a.data_mut()[0] = 0xAA;
    let (page_b, _) = pool.new_page().unwrap();

    // Both frames pinned: no third page.
    assert!(matches!(pool.new_page(), Err(SiltError::BufferPoolFull)));

    // Releasing A lets the third creation evict it.
    pool.unpin_page(page_a, true).unwrap();
    let (page_c, _) = pool.new_page().unwrap();
    assert!(!pool.contains(page_a));
    assert!(pool.contains(page_b));
    assert!(pool.contains(page_c));

    // A's content survived eviction via its write-through.
    pool.unpin_page(page_c, false).unwrap();
    let frame = pool.fetch_page(page_a).unwrap();
    assert_eq!(frame.data()[0], 0xAA);
}

#[test]
fn test_pool_reopen_reads_persisted_pages() {
    let dir = tempfile::tempdir().unwrap();
    let page_id;

    {
        let disk = create_disk(&dir);
        let pool = create_pool(disk, 2);
        let (id, frame) = pool.new_page().unwrap();
        frame.data_mut()[7] = 0x77;
        pool.unpin_page(id, true).unwrap();
        page_id = id;
    }

    // A fresh disk manager over the same directory sees the page.
    let disk = create_disk(&dir);
    let mut buf = [0u8; PAGE_SIZE];
    disk.read_page(page_id, &mut buf).unwrap();
    assert_eq!(buf[7], 0x77);
}

#[test]
fn test_index_under_eviction_pressure() {
    let dir = tempfile::tempdir().unwrap();
    let disk = create_disk(&dir);
    // 4 frames serving 17 index pages: every operation churns the cache.
    let pool = create_pool(disk, 4);

    let index = LinearProbeHashIndex::<i32, i32, _, _>::new(
        "pressure",
        Arc::clone(&pool),
        DefaultComparator,
        16,
        MulHash,
    )
    .unwrap();

    let mut keys: Vec<i32> = (0..280).collect();
    let mut rng = rand::thread_rng();
    keys.shuffle(&mut rng);

    for &key in &keys {
        index.insert(key, key * 2).unwrap();
    }
    for &key in &keys {
        assert_eq!(index.get(key).unwrap(), vec![key * 2]);
    }

    // Remove every even key, keep the odd ones.
    for &key in &keys {
        if key % 2 == 0 {
            assert!(index.remove(key, key * 2).unwrap());
        }
    }
    for &key in &keys {
        if key % 2 == 0 {
            assert!(index.get(key).unwrap().is_empty());
        } else {
            assert_eq!(index.get(key).unwrap(), vec![key * 2]);
        }
    }

    // Tombstoned slots accept reinsertion.
    for &key in &keys {
        if key % 2 == 0 {
            index.insert(key, key * 2).unwrap();
            assert_eq!(index.get(key).unwrap(), vec![key * 2]);
        }
    }

    // Nothing stays pinned between operations.
    assert_eq!(pool.pin_count_of(index.header_page_id()), Some(0));
}

#[test]
fn test_index_multiple_values_per_key() {
    let dir = tempfile::tempdir().unwrap();
    let disk = create_disk(&dir);
    let pool = create_pool(disk, 4);

    let index = LinearProbeHashIndex::<i32, i32, _, _>::new(
        "multi",
        pool,
        DefaultComparator,
        2,
        MulHash,
    )
    .unwrap();

    for value in 0..8 {
        index.insert(5, value).unwrap();
    }
    assert_eq!(index.get(5).unwrap(), (0..8).collect::<Vec<_>>());

    assert!(index.remove(5, 3).unwrap());
    assert_eq!(
        index.get(5).unwrap(),
        vec![0, 1, 2, 4, 5, 6, 7]
    );
}

#[test]
fn test_log_manager_handle_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let disk = create_disk(&dir);
    let log_manager = Arc::new(
        LogManager::new(WalConfig {
            wal_dir: dir.path().join("wal"),
            fsync_enabled: false,
        })
        .unwrap(),
    );

    let pool = Arc::new(BufferPoolManager::new(
        BufferPoolConfig { num_frames: 4 },
        disk as Arc<dyn DiskStore>,
        Some(Arc::clone(&log_manager)),
    ));

    // The pool carries the handle without driving it.
    let handle = pool.log_manager().expect("handle present");
    assert_eq!(handle.next_lsn(), log_manager.next_lsn());

    // Pool traffic leaves the log untouched.
    let before = log_manager.next_lsn();
    let (page_id, _) = pool.new_page().unwrap();
    pool.unpin_page(page_id, true).unwrap();
    assert_eq!(log_manager.next_lsn(), before);

    // Callers append through the same handle.
    let lsn = handle
        .append(LogRecord::new(1, LogRecordType::Begin, bytes::Bytes::new()))
        .unwrap();
    assert!(log_manager.next_lsn() > lsn);
}
