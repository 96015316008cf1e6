//! Disk backend under concurrent access.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use databank_storage::{DiskConfig, DiskDriver, Driver, Entry, MemoryDriver, SyncDriver};
use tempfile::TempDir;

const PAYLOAD: usize = 1 << 20;

fn large(fill: u8) -> Entry {
    Entry::new("large", Duration::ZERO).with_content(vec![fill; PAYLOAD])
}

#[test]
fn test_reads_never_see_a_partial_rewrite() {
    let dir = TempDir::new().unwrap();
    let driver = DiskDriver::new(DiskConfig::new(dir.path().join("bank")));
    driver.write(&large(0)).unwrap();

    let (mut errors, mut misses) = (0, 0);
    thread::scope(|s| {
        s.spawn(|| {
            for round in 0..100u8 {
                driver.write(&large(round)).unwrap();
            }
        });
        for _ in 0..200 {
            match driver.read("large") {
                Ok(Some(entry)) => {
                    assert_eq!(entry.content.len(), PAYLOAD);
                    assert!(entry.content.iter().all(|b| *b == entry.content[0]));
                }
                Ok(None) => misses += 1,
                Err(_) => errors += 1,
            }
        }
    });

    assert_eq!((errors, misses), (0, 0));
    assert_eq!(driver.scan().unwrap(), vec!["large"]);
}

#[test]
fn test_tiered_reads_survive_concurrent_authority_writes() {
    let dir = TempDir::new().unwrap();
    let config = DiskConfig::new(dir.path().join("bank"));
    let disk: Arc<dyn Driver> = Arc::new(DiskDriver::new(config));
    let front = Arc::new(MemoryDriver::new());
    let sync = SyncDriver::new(vec![front.clone() as Arc<dyn Driver>, disk.clone()]).unwrap();
    disk.write(&large(0)).unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for round in 0..50u8 {
                disk.write(&large(round)).unwrap();
            }
        });
        for _ in 0..100 {
            front.delete("large").unwrap();
            assert!(sync.read("large").unwrap().is_some());
        }
    });
}
