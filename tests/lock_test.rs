use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use lucy_core::store::{Lock, LockFactory};
use lucy_core::{Folder, FsFolder, IndexManager, IndexManagerConfig, Indexer, IndexerConfig, RamFolder, Schema};

fn fs_folder(temp_dir: &TempDir) -> Arc<dyn Folder> {
    let folder: Arc<dyn Folder> = Arc::new(FsFolder::new(temp_dir.path()));
    folder.initialize().unwrap();
    folder
}

#[test]
fn test_exclusive_lock_waits_for_full_timeout() {
    let temp_dir = TempDir::new().unwrap();
    let factory = LockFactory::new(fs_folder(&temp_dir), "localhost");

    let mut holder: Lock = factory.make_lock("write", 100, 10).unwrap();
    holder.obtain_exclusive().unwrap();
    assert!(holder.is_locked());

    let mut contender = factory.make_lock("write", 100, 10).unwrap();
    let start = Instant::now();
    let err = contender.obtain_exclusive().unwrap_err();
    let waited = start.elapsed();
    assert!(err.is_lock_timeout(), "unexpected error: {err}");
    assert!(
        waited >= Duration::from_millis(100),
        "gave up after {waited:?}, before the timeout"
    );

    holder.release().unwrap();
    contender.obtain_exclusive().unwrap();
    assert!(contender.is_held());
}

#[test]
fn test_zero_timeout_makes_one_attempt() {
    let folder: Arc<dyn Folder> = Arc::new(RamFolder::new());
    let factory = LockFactory::new(folder, "localhost");
    let mut holder = factory.make_lock("merge", 0, 1000).unwrap();
    holder.obtain_exclusive().unwrap();

    let mut contender = factory.make_lock("merge", 0, 1000).unwrap();
    let start = Instant::now();
    assert!(contender.obtain_exclusive().unwrap_err().is_lock_timeout());
    assert!(start.elapsed() < Duration::from_millis(1000), "no sleep without a timeout");
    assert!(!contender.request_exclusive().unwrap());
}

#[test]
fn test_dropped_lock_is_released() {
    let temp_dir = TempDir::new().unwrap();
    let folder = fs_folder(&temp_dir);
    let factory = LockFactory::new(folder.clone(), "localhost");
    {
        let mut lock = factory.make_lock("write", 0, 10).unwrap();
        lock.obtain_exclusive().unwrap();
        assert!(folder.exists(lock.lock_path()));
    }
    let mut again = factory.make_lock("write", 0, 10).unwrap();
    assert!(again.request_exclusive().unwrap());
}

#[test]
fn test_indexer_respects_write_lock_timeout() {
    let temp_dir = TempDir::new().unwrap();
    let folder = fs_folder(&temp_dir);
    let mut config = IndexManagerConfig::default();
    config.set_write_lock_timeout(100).unwrap();
    config.set_write_lock_interval(10).unwrap();
    let manager = IndexManager::new(folder.clone(), config);

    let mut schema = Schema::new();
    schema.spec_field("title", lucy_core::FieldType::string()).unwrap();
    let mut first = Indexer::open(Some(schema.clone()), folder.clone(), Some(manager.clone()), IndexerConfig::create())
        .unwrap();

    let start = Instant::now();
    let err = Indexer::open(Some(schema.clone()), folder.clone(), Some(manager.clone()), IndexerConfig::create())
        .unwrap_err();
    assert!(err.is_lock_timeout());
    assert!(start.elapsed() >= Duration::from_millis(100));

    first.commit().unwrap();
    let mut second = Indexer::open(Some(schema), folder, Some(manager), IndexerConfig::create()).unwrap();
    second.commit().unwrap();
}
