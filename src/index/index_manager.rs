//! Index-wide policy: lock construction, segment numbering, merge
//! selection and background merge bookkeeping.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{IndexError, Result};
use crate::index::deletions::DeletionsWriter;
use crate::index::file_names::{self, is_snapshot_file};
use crate::index::poly_reader::PolyReader;
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;
use crate::index::snapshot::Snapshot;
use crate::store::compound::json_to_i64;
use crate::store::{Folder, Lock, LockFactory, SharedLock};

pub const MERGE_DATA_FILE: &str = "merge.json";

const WRITE_LOCK_NAME: &str = "write";
const MERGE_LOCK_NAME: &str = "merge";
const DELETION_LOCK_NAME: &str = "deletion";

/// Minimum share of deleted documents that makes a segment worth rewriting.
const DELETION_RATIO_THRESHOLD: f64 = 0.1;

/// Past this many target segments everything is considered sparse.
const FIBONACCI_LIMIT: usize = 47;

/// Lock timing and host identity.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexManagerConfig {
    /// Identifies this machine in lock files.
    pub host: String,

    /// Write lock timeout in milliseconds.
    pub write_lock_timeout: u64,

    /// Write lock retry interval in milliseconds.
    pub write_lock_interval: u64,

    /// Merge lock timeout in milliseconds.
    pub merge_lock_timeout: u64,

    /// Merge lock retry interval in milliseconds.
    pub merge_lock_interval: u64,

    /// Deletion lock timeout in milliseconds.
    pub deletion_lock_timeout: u64,

    /// Deletion lock retry interval in milliseconds.
    pub deletion_lock_interval: u64,

    /// Snapshot read lock timeout in milliseconds.
    pub snapshot_read_lock_timeout: u64,

    /// Snapshot read lock retry interval in milliseconds.
    pub snapshot_read_lock_interval: u64,
}

impl Default for IndexManagerConfig {
    fn default() -> Self {
        IndexManagerConfig {
            host: String::new(),
            write_lock_timeout: 1000,
            write_lock_interval: 100,
            merge_lock_timeout: 0,
            merge_lock_interval: 1000,
            deletion_lock_timeout: 1000,
            deletion_lock_interval: 100,
            snapshot_read_lock_timeout: 1000,
            snapshot_read_lock_interval: 100,
        }
    }
}

impl fmt::Debug for IndexManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexManagerConfig")
            .field("host", &self.host)
            .field(
                "write_lock",
                &format_args!("{}ms/{}ms", self.write_lock_timeout, self.write_lock_interval),
            )
            .field(
                "merge_lock",
                &format_args!("{}ms/{}ms", self.merge_lock_timeout, self.merge_lock_interval),
            )
            .field(
                "deletion_lock",
                &format_args!("{}ms/{}ms", self.deletion_lock_timeout, self.deletion_lock_interval),
            )
            .field(
                "snapshot_read_lock",
                &format_args!(
                    "{}ms/{}ms",
                    self.snapshot_read_lock_timeout, self.snapshot_read_lock_interval
                ),
            )
            .finish()
    }
}

fn check_millis(name: &str, value: u64) -> Result<u64> {
    if value > i32::MAX as u64 {
        return Err(IndexError::invalid_argument(format!(
            "{name} too large: {value}"
        )));
    }
    Ok(value)
}

impl IndexManagerConfig {
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    pub fn set_write_lock_timeout(&mut self, ms: u64) -> Result<()> {
        self.write_lock_timeout = check_millis("write_lock_timeout", ms)?;
        Ok(())
    }

    pub fn set_write_lock_interval(&mut self, ms: u64) -> Result<()> {
        self.write_lock_interval = check_millis("write_lock_interval", ms)?;
        Ok(())
    }

    pub fn set_merge_lock_timeout(&mut self, ms: u64) -> Result<()> {
        self.merge_lock_timeout = check_millis("merge_lock_timeout", ms)?;
        Ok(())
    }

    pub fn set_merge_lock_interval(&mut self, ms: u64) -> Result<()> {
        self.merge_lock_interval = check_millis("merge_lock_interval", ms)?;
        Ok(())
    }

    pub fn set_deletion_lock_timeout(&mut self, ms: u64) -> Result<()> {
        self.deletion_lock_timeout = check_millis("deletion_lock_timeout", ms)?;
        Ok(())
    }

    pub fn set_deletion_lock_interval(&mut self, ms: u64) -> Result<()> {
        self.deletion_lock_interval = check_millis("deletion_lock_interval", ms)?;
        Ok(())
    }
}

/// Policy object shared by indexers, merges, purgers and readers of one
/// index folder.
#[derive(Debug, Clone)]
pub struct IndexManager {
    folder: Arc<dyn Folder>,
    config: IndexManagerConfig,
    lock_factory: LockFactory,
}

impl IndexManager {
    pub fn new(folder: Arc<dyn Folder>, config: IndexManagerConfig) -> Self {
        let lock_factory = LockFactory::new(folder.clone(), config.host.clone());
        IndexManager {
            folder,
            config,
            lock_factory,
        }
    }

    pub fn folder(&self) -> &Arc<dyn Folder> {
        &self.folder
    }

    pub fn config(&self) -> &IndexManagerConfig {
        &self.config
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Highest segment number listed in `snapshot`, 0 if there is none.
    pub fn highest_seg_num(&self, snapshot: &Snapshot) -> u64 {
        snapshot
            .segment_names()
            .iter()
            .filter_map(|name| Segment::name_to_num(name))
            .max()
            .unwrap_or(0)
    }

    /// Name for the next snapshot file.
    pub fn make_snapshot_filename(&self) -> Result<String> {
        let latest = file_names::latest_snapshot(self.folder.as_ref())?;
        let next_gen = latest.map_or(1, |name| file_names::extract_gen(&name) + 1);
        Ok(file_names::snapshot_file_name(next_gen))
    }

    /// Segments of `reader` worth merging into the segment being written.
    ///
    /// Only segments numbered above `cutoff` are considered. With
    /// `optimize` every one of them is returned; otherwise the sparsely
    /// populated ones plus any with at least a tenth of their documents
    /// deleted.
    pub fn recycle(
        &self,
        reader: &PolyReader,
        del_writer: &DeletionsWriter,
        cutoff: u64,
        optimize: bool,
    ) -> Vec<Arc<SegReader>> {
        let mut candidates: Vec<Arc<SegReader>> = reader
            .seg_readers()
            .iter()
            .filter(|seg_reader| seg_reader.seg_num() > cutoff)
            .cloned()
            .collect();
        if optimize {
            return candidates;
        }

        candidates.sort_by_key(|seg_reader| seg_reader.doc_count());
        let doc_counts: Vec<i32> = candidates.iter().map(|r| r.doc_count()).collect();
        let threshold = self.choose_sparse(&doc_counts);

        let remainder = candidates.split_off(threshold);
        for seg_reader in remainder {
            let doc_max = seg_reader.doc_max() as f64;
            let num_deletions = del_writer.seg_del_count(seg_reader.seg_name()) as f64;
            if num_deletions / doc_max >= DELETION_RATIO_THRESHOLD {
                candidates.push(seg_reader);
            }
        }
        candidates
    }

    /// Given segment sizes in ascending order, the number of leading
    /// segments to merge so that segment sizes grow roughly along the
    /// Fibonacci sequence.
    pub fn choose_sparse(&self, doc_counts: &[i32]) -> usize {
        let num_candidates = doc_counts.len();
        let mut threshold = 0;
        let mut total_docs: i64 = 0;
        for (i, &count) in doc_counts.iter().enumerate() {
            let num_segs_when_done = num_candidates - threshold + 1;
            total_docs += count as i64;
            let fib_idx = num_segs_when_done + 5;
            if fib_idx >= FIBONACCI_LIMIT || total_docs < fibonacci(fib_idx) {
                threshold = i + 1;
            }
        }

        // Avoid rewriting one big segment over and over on small commits.
        if threshold == 1 && num_candidates > 2 && doc_counts[1] / 2 < doc_counts[0] {
            threshold = 2;
        }
        threshold
    }

    pub fn make_write_lock(&self) -> Result<Lock> {
        self.lock_factory.make_lock(
            WRITE_LOCK_NAME,
            self.config.write_lock_timeout,
            self.config.write_lock_interval,
        )
    }

    pub fn make_merge_lock(&self) -> Result<Lock> {
        self.lock_factory.make_lock(
            MERGE_LOCK_NAME,
            self.config.merge_lock_timeout,
            self.config.merge_lock_interval,
        )
    }

    pub fn make_deletion_lock(&self) -> Result<Lock> {
        self.lock_factory.make_lock(
            DELETION_LOCK_NAME,
            self.config.deletion_lock_timeout,
            self.config.deletion_lock_interval,
        )
    }

    /// Shared lock marking `filename` as in use by a reader.
    pub fn make_snapshot_read_lock(&self, filename: &str) -> Result<SharedLock> {
        if !is_snapshot_file(filename) {
            return Err(IndexError::invalid_argument(format!(
                "Not a snapshot filename: '{filename}'"
            )));
        }
        let lock_name = filename.trim_end_matches(".json");
        self.lock_factory.make_shared_lock(
            lock_name,
            self.config.snapshot_read_lock_timeout,
            self.config.snapshot_read_lock_interval,
        )
    }

    /// Record the segment number claimed by a background merge.
    pub fn write_merge_data(&self, cutoff: u64) -> Result<()> {
        if self.folder.exists(MERGE_DATA_FILE) {
            self.folder.delete(MERGE_DATA_FILE)?;
        }
        self.folder
            .write_json(MERGE_DATA_FILE, &json!({ "cutoff": cutoff.to_string() }))
    }

    /// The background merge record, if one exists. An unreadable record
    /// yields an empty object.
    pub fn read_merge_data(&self) -> Result<Option<Value>> {
        if !self.folder.exists(MERGE_DATA_FILE) {
            return Ok(None);
        }
        match self.folder.read_json::<Value>(MERGE_DATA_FILE) {
            Ok(data @ Value::Object(_)) => Ok(Some(data)),
            Ok(_) => Ok(Some(json!({}))),
            Err(e) if e.is_format_error() => Ok(Some(json!({}))),
            Err(e) => Err(e),
        }
    }

    /// Segment number recorded by a background merge, if readable.
    pub fn merge_cutoff(&self) -> Result<Option<u64>> {
        Ok(self
            .read_merge_data()?
            .and_then(|data| data.get("cutoff").and_then(json_to_i64))
            .map(|cutoff| cutoff.max(0) as u64))
    }

    pub fn remove_merge_data(&self) -> Result<bool> {
        self.folder.delete(MERGE_DATA_FILE)
    }

    /// Name of the segment a background merge is writing.
    pub fn cutoff_seg_name(cutoff: u64) -> String {
        Segment::num_to_name(cutoff)
    }
}

fn fibonacci(n: usize) -> i64 {
    let (mut a, mut b) = (0i64, 1i64);
    for _ in 0..n {
        (a, b) = (b, a.saturating_add(b));
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RamFolder;

    fn manager() -> IndexManager {
        IndexManager::new(Arc::new(RamFolder::new()), IndexManagerConfig::default())
    }

    #[test]
    fn test_config_defaults() {
        let config = IndexManagerConfig::default();
        assert_eq!((config.write_lock_timeout, config.write_lock_interval), (1000, 100));
        assert_eq!((config.merge_lock_timeout, config.merge_lock_interval), (0, 1000));
        assert_eq!((config.deletion_lock_timeout, config.deletion_lock_interval), (1000, 100));

        let mut config = config.with_host("box");
        assert!(config.set_write_lock_timeout(i32::MAX as u64 + 1).is_err());
        config.set_write_lock_timeout(10_000).unwrap();
        assert_eq!(config.write_lock_timeout, 10_000);
        assert!(format!("{config:?}").contains("10000ms/100ms"));
    }

    #[test]
    fn test_fibonacci() {
        let seq: Vec<i64> = (0..10).map(fibonacci).collect();
        assert_eq!(seq, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
    }

    #[test]
    fn test_choose_sparse() {
        let manager = manager();
        assert_eq!(manager.choose_sparse(&[]), 0);
        // Small segments are all merged.
        assert_eq!(manager.choose_sparse(&[1, 1, 1]), 3);
        // A large segment stays put.
        assert_eq!(manager.choose_sparse(&[1, 1, 1000]), 2);
        // One small segment followed by a similar one gets company.
        assert_eq!(manager.choose_sparse(&[30, 40, 5000]), 2);
        assert_eq!(manager.choose_sparse(&[10_000]), 0);
    }

    #[test]
    fn test_highest_seg_num() {
        let manager = manager();
        let mut snapshot = Snapshot::new();
        assert_eq!(manager.highest_seg_num(&snapshot), 0);
        snapshot.add_entry("seg_3");
        snapshot.add_entry("seg_a");
        snapshot.add_entry("schema_z.json");
        assert_eq!(manager.highest_seg_num(&snapshot), 10);
    }

    #[test]
    fn test_snapshot_filename() {
        let manager = manager();
        assert_eq!(manager.make_snapshot_filename().unwrap(), "snapshot_1.json");
        manager.folder().open_out("snapshot_z.json").unwrap().close().unwrap();
        assert_eq!(manager.make_snapshot_filename().unwrap(), "snapshot_10.json");
        assert!(manager.make_snapshot_read_lock("seg_1").is_err());
        let lock = manager.make_snapshot_read_lock("snapshot_z.json").unwrap();
        assert_eq!(lock.name(), "snapshot_z");
    }

    #[test]
    fn test_merge_data() {
        let manager = manager();
        assert!(manager.read_merge_data().unwrap().is_none());
        assert_eq!(manager.merge_cutoff().unwrap(), None);
        manager.write_merge_data(42).unwrap();
        assert_eq!(manager.merge_cutoff().unwrap(), Some(42));
        manager.write_merge_data(43).unwrap();
        assert_eq!(manager.merge_cutoff().unwrap(), Some(43));
        assert!(manager.remove_merge_data().unwrap());
        assert!(!manager.remove_merge_data().unwrap());
    }

    #[test]
    fn test_lock_names() {
        let manager = manager();
        assert_eq!(manager.make_write_lock().unwrap().name(), "write");
        assert_eq!(manager.make_merge_lock().unwrap().timeout_ms(), 0);
        assert_eq!(manager.make_deletion_lock().unwrap().interval_ms(), 100);
    }
}
