//! Snapshots: the list of top-level files and segments making up one
//! point-in-time view of an index.

use std::collections::BTreeSet;

use serde_json::{Value, json};

use crate::error::{IndexError, Result};
use crate::index::file_names::{self, SNAPSHOT_PREFIX};
use crate::index::segment::Segment;
use crate::store::Folder;
use crate::store::compound::json_to_i64;
use crate::util::base36::to_base36;

pub const CURRENT_FILE_FORMAT: i64 = 2;
pub const CURRENT_FILE_SUBFORMAT: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: BTreeSet<String>,
    path: Option<String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    pub fn add_entry<S: Into<String>>(&mut self, entry: S) {
        self.entries.insert(entry.into());
    }

    pub fn delete_entry(&mut self, entry: &str) -> bool {
        self.entries.remove(entry)
    }

    /// Entries in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }

    /// Entries naming segment directories, in sorted order.
    pub fn segment_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| Segment::valid_seg_name(e))
            .cloned()
            .collect()
    }

    /// Path of the file this snapshot was last read from or written to.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_path<S: Into<String>>(&mut self, path: Option<S>) {
        self.path = path.map(Into::into);
    }

    /// Load the snapshot at `path`, or the most recent one when `path` is
    /// `None`. An index without snapshot files yields an empty snapshot.
    pub fn read_file(&mut self, folder: &dyn Folder, path: Option<&str>) -> Result<()> {
        let path = match path {
            Some(p) => Some(p.to_string()),
            None => file_names::latest_snapshot(folder)?,
        };
        self.entries.clear();
        self.path = None;
        let Some(path) = path else {
            return Ok(());
        };

        let dump: Value = folder.read_json(&path)?;
        let format = dump
            .get("format")
            .and_then(json_to_i64)
            .ok_or_else(|| IndexError::format(format!("Missing 'format' in '{path}'")))?;
        let subformat = dump.get("subformat").and_then(json_to_i64).unwrap_or(0);
        if format > CURRENT_FILE_FORMAT {
            return Err(IndexError::format(format!(
                "Snapshot format too recent: {format}, {CURRENT_FILE_FORMAT}"
            )));
        }
        let entries = dump
            .get("entries")
            .and_then(Value::as_array)
            .ok_or_else(|| IndexError::format(format!("Missing 'entries' in '{path}'")))?;

        for entry in entries {
            let entry = entry
                .as_str()
                .ok_or_else(|| IndexError::format(format!("Non-string entry in '{path}'")))?;
            // Older snapshots also listed every file inside a segment.
            if subformat < 1 && entry.contains('/') {
                let dir = entry.split('/').next().unwrap_or(entry);
                if Segment::valid_seg_name(dir) {
                    continue;
                }
            }
            self.entries.insert(entry.to_string());
        }
        self.path = Some(path);
        Ok(())
    }

    /// Persist the snapshot. When `path` is `None` the next generation after
    /// every existing snapshot file is used. Existing files are never
    /// overwritten.
    pub fn write_file(&mut self, folder: &dyn Folder, path: Option<&str>) -> Result<()> {
        let path = match path {
            Some(p) => p.to_string(),
            None => {
                let latest = file_names::latest_snapshot(folder)?;
                let next_gen = latest.map_or(1, |name| file_names::extract_gen(&name) + 1);
                format!("{SNAPSHOT_PREFIX}{}.json", to_base36(next_gen))
            }
        };
        if folder.exists(&path) {
            return Err(IndexError::contract(format!(
                "Snapshot file '{path}' already exists"
            )));
        }

        let dump = json!({
            "entries": self.list(),
            "format": CURRENT_FILE_FORMAT,
            "subformat": CURRENT_FILE_SUBFORMAT,
        });
        let temp_path = format!("{path}.temp");
        if folder.exists(&temp_path) {
            folder.delete(&temp_path)?;
        }
        folder.write_json(&temp_path, &dump)?;
        folder.rename(&temp_path, &path)?;
        log::debug!("Wrote snapshot '{path}' with {} entries", self.entries.len());
        self.path = Some(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RamFolder;

    #[test]
    fn test_add_and_delete() {
        let mut snapshot = Snapshot::new();
        snapshot.add_entry("foo");
        snapshot.add_entry("foo");
        assert_eq!(snapshot.num_entries(), 1, "redundant entry ignored");
        snapshot.add_entry("bar");
        assert_eq!(snapshot.list(), vec!["bar", "foo"]);
        assert!(snapshot.delete_entry("foo"));
        assert_eq!(snapshot.num_entries(), 1);
    }

    #[test]
    fn test_path_handling() {
        let folder = RamFolder::new();
        let mut snapshot = Snapshot::new();
        snapshot.write_file(&folder, Some("snap")).unwrap();
        assert_eq!(snapshot.path(), Some("snap"));
        folder.rename("snap", "crackle").unwrap();
        snapshot.read_file(&folder, Some("crackle")).unwrap();
        assert_eq!(snapshot.path(), Some("crackle"));
    }

    #[test]
    fn test_generations_increase() {
        let folder = RamFolder::new();
        let mut snapshot = Snapshot::new();
        snapshot.add_entry("seg_1");
        snapshot.write_file(&folder, None).unwrap();
        assert_eq!(snapshot.path(), Some("snapshot_1.json"));
        snapshot.write_file(&folder, None).unwrap();
        assert_eq!(snapshot.path(), Some("snapshot_2.json"));
        assert!(
            snapshot
                .write_file(&folder, Some("snapshot_2.json"))
                .unwrap_err()
                .is_contract_violation()
        );

        let mut latest = Snapshot::new();
        latest.read_file(&folder, None).unwrap();
        assert_eq!(latest.path(), Some("snapshot_2.json"));
        assert_eq!(latest.list(), vec!["seg_1"]);
    }

    #[test]
    fn test_old_subformat_filters_segment_files() {
        let folder = RamFolder::new();
        let dyn_folder: &dyn Folder = &folder;
        dyn_folder
            .write_json(
                "snapshot_5.json",
                &json!({"format": "2", "entries": ["seg_1", "seg_1/segmeta.json", "schema_1.json"]}),
            )
            .unwrap();
        let mut snapshot = Snapshot::new();
        snapshot.read_file(&folder, None).unwrap();
        assert_eq!(snapshot.list(), vec!["schema_1.json", "seg_1"]);
    }

    #[test]
    fn test_future_format_rejected() {
        let folder = RamFolder::new();
        let dyn_folder: &dyn Folder = &folder;
        dyn_folder
            .write_json("snapshot_1.json", &json!({"format": 99, "entries": []}))
            .unwrap();
        let mut snapshot = Snapshot::new();
        assert!(snapshot.read_file(&folder, None).unwrap_err().is_format_error());
    }
}
