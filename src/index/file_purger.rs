//! Deletes index files which no live snapshot needs any more.

use std::sync::Arc;

use ahash::AHashSet;

use crate::error::Result;
use crate::index::file_names::{is_schema_file, is_snapshot_file};
use crate::index::index_manager::{IndexManager, MERGE_DATA_FILE};
use crate::index::segment::Segment;
use crate::index::snapshot::Snapshot;
use crate::store::Folder;
use crate::store::lock::LOCK_DIR;

/// Removes superseded snapshots together with the segments and schema
/// files only they referenced.
///
/// Snapshots carrying a read lock are left alone along with everything
/// they list. Callers hold the write lock, so segment directories which no
/// snapshot lists can only be leftovers of crashed sessions, except for the
/// one a running background merge is writing.
#[derive(Debug)]
pub struct FilePurger {
    folder: Arc<dyn Folder>,
    manager: IndexManager,
}

impl FilePurger {
    pub fn new(folder: Arc<dyn Folder>, manager: IndexManager) -> Self {
        FilePurger { folder, manager }
    }

    /// Clear out an aborted background merge, then everything `current`
    /// and the read-locked snapshots don't need.
    pub fn purge(&self, current: &Snapshot) -> Result<()> {
        self.purge_aborted_merge()?;
        self.purge_snapshots(current)
    }

    /// Delete what superseded snapshots reference, keeping anything that
    /// `current` or a read-locked snapshot still lists.
    pub fn purge_snapshots(&self, current: &Snapshot) -> Result<()> {
        let mut deletion_lock = self.manager.make_deletion_lock()?;
        if let Err(e) = deletion_lock.obtain_exclusive() {
            log::warn!("Can't obtain deletion lock, skipping deletion of obsolete files: {e}");
            return Ok(());
        }

        let mut spared: AHashSet<String> = AHashSet::new();
        let mut purged: AHashSet<String> = AHashSet::new();
        let mut snapshots = Vec::new();
        spared.insert(LOCK_DIR.to_string());
        self.discover_unused(current, &mut spared, &mut purged, &mut snapshots)?;

        let mut failures: AHashSet<String> = AHashSet::new();
        let mut num_deleted = 0;
        for entry in purged.difference(&spared) {
            match self.folder.delete_tree(entry) {
                Ok(true) => num_deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    log::debug!("Failed to purge '{entry}': {e}");
                    if self.folder.exists(entry) {
                        failures.insert(entry.clone());
                    }
                }
            }
        }

        // A snapshot goes only once every one of its entries is gone.
        for snapshot in &snapshots {
            let has_failures = snapshot.list().iter().any(|entry| failures.contains(entry));
            if let Some(path) = snapshot.path()
                && !has_failures
            {
                self.folder.delete(path)?;
            }
        }

        let num_orphans = self.purge_orphans(&spared)?;
        log::info!(
            "Purged {num_deleted} entries and {} snapshots, {num_orphans} orphans",
            snapshots.len()
        );
        deletion_lock.release()
    }

    fn discover_unused(
        &self,
        current: &Snapshot,
        spared: &mut AHashSet<String>,
        purged: &mut AHashSet<String>,
        snapshots: &mut Vec<Snapshot>,
    ) -> Result<()> {
        let current_path = current.path();
        if let Some(path) = current_path {
            spared.insert(path.to_string());
        }
        spared.extend(current.list());

        for entry in self.folder.list("")? {
            if !is_snapshot_file(&entry) || Some(entry.as_str()) == current_path {
                continue;
            }
            let mut snapshot = Snapshot::new();
            snapshot.read_file(self.folder.as_ref(), Some(&entry))?;
            // Only look: someone holding the read lock is using this view.
            let read_lock = self.manager.make_snapshot_read_lock(&entry)?;
            if read_lock.is_locked()? {
                spared.insert(entry);
                spared.extend(snapshot.list());
            } else {
                purged.extend(snapshot.list());
                snapshots.push(snapshot);
            }
        }
        Ok(())
    }

    /// Delete segment directories and schema files no snapshot lists, plus
    /// temp files left by interrupted commits.
    fn purge_orphans(&self, spared: &AHashSet<String>) -> Result<usize> {
        let mut listed: AHashSet<String> = spared.clone();
        for entry in self.folder.list("")? {
            if is_snapshot_file(&entry) {
                let mut snapshot = Snapshot::new();
                snapshot.read_file(self.folder.as_ref(), Some(&entry))?;
                listed.extend(snapshot.list());
            }
        }

        let merging = self.manager.make_merge_lock()?.is_locked();
        let merge_seg = if merging {
            self.manager.merge_cutoff()?.map(IndexManager::cutoff_seg_name)
        } else {
            None
        };

        let mut num_orphans = 0;
        for entry in self.folder.list("")? {
            if listed.contains(&entry) || merge_seg.as_deref() == Some(entry.as_str()) {
                continue;
            }
            let orphan = Segment::valid_seg_name(&entry)
                || is_schema_file(&entry)
                || (entry.ends_with(".temp") && !merging);
            if !orphan {
                continue;
            }
            match self.folder.delete_tree(&entry) {
                Ok(true) => {
                    log::debug!("Deleted orphaned '{entry}'");
                    num_orphans += 1;
                }
                Ok(false) => {}
                Err(e) => log::warn!("Couldn't delete orphaned '{entry}': {e}"),
            }
        }
        Ok(num_orphans)
    }

    /// Remove the segment and `merge.json` of a background merge which died
    /// without releasing its claim.
    pub fn purge_aborted_merge(&self) -> Result<()> {
        let merge_lock = self.manager.make_merge_lock()?;
        if merge_lock.is_locked() {
            return Ok(());
        }
        let Some(cutoff) = self.manager.merge_cutoff()? else {
            return Ok(());
        };
        let cutoff_seg = IndexManager::cutoff_seg_name(cutoff);
        if self.folder.exists(&cutoff_seg) && !self.folder.delete_tree(&cutoff_seg)? {
            log::warn!("Couldn't delete '{cutoff_seg}' from aborted merge");
        }
        if !self.manager.remove_merge_data()? && self.folder.exists(MERGE_DATA_FILE) {
            log::warn!("Couldn't delete '{MERGE_DATA_FILE}' from aborted merge");
        }
        log::info!("Cleaned up aborted merge into {cutoff_seg}");
        Ok(())
    }
}
