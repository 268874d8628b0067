//! Consolidates segments while indexers keep working on the same index.
//!
//! The merger holds the write lock only while it claims a segment number
//! (`merge.json` records it as the cutoff) and again while it commits.
//! Indexers running in between number their segments above the cutoff and
//! leave every segment at or below it alone.

use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{IndexError, Result};
use crate::index::file_names::{self, is_schema_file};
use crate::index::file_purger::FilePurger;
use crate::index::index_manager::{IndexManager, IndexManagerConfig};
use crate::index::poly_reader::PolyReader;
use crate::index::seg_reader::SegReader;
use crate::index::seg_writer::SegWriter;
use crate::index::segment::Segment;
use crate::index::snapshot::Snapshot;
use crate::plan::Schema;
use crate::search::Matcher;
use crate::store::{Folder, Lock};

const DEFAULT_WRITE_LOCK_TIMEOUT: u64 = 10_000;

#[derive(Debug)]
pub struct BackgroundMerger {
    folder: Arc<dyn Folder>,
    manager: IndexManager,
    file_purger: FilePurger,
    polyreader: Option<Arc<PolyReader>>,
    seg_writer: Option<SegWriter>,
    write_lock: Option<Lock>,
    merge_lock: Option<Lock>,
    cutoff: u64,
    doc_maps: AHashMap<String, Vec<i32>>,
    snapfile: Option<String>,
    optimize: bool,
    prepared: bool,
    needs_commit: bool,
    committed: bool,
}

impl BackgroundMerger {
    /// Claim the next segment number for a merge of the index in `folder`.
    ///
    /// Fails when another merger is running. An index without content
    /// yields a merger with nothing to do.
    pub fn open(folder: Arc<dyn Folder>, manager: Option<IndexManager>) -> Result<Self> {
        if !folder.check() {
            return Err(IndexError::not_found(format!(
                "Folder '{}' failed check",
                folder.path()
            )));
        }
        let manager = match manager {
            Some(manager) => manager,
            None => {
                let mut config = IndexManagerConfig::default();
                config.set_write_lock_timeout(DEFAULT_WRITE_LOCK_TIMEOUT)?;
                IndexManager::new(folder.clone(), config)
            }
        };
        let file_purger = FilePurger::new(folder.clone(), manager.clone());

        let mut merger = BackgroundMerger {
            folder: folder.clone(),
            manager,
            file_purger,
            polyreader: None,
            seg_writer: None,
            write_lock: None,
            merge_lock: None,
            cutoff: 0,
            doc_maps: AHashMap::new(),
            snapfile: None,
            optimize: false,
            prepared: false,
            needs_commit: false,
            committed: false,
        };
        merger.obtain_write_lock()?;
        let mut merge_lock = merger.manager.make_merge_lock()?;
        merge_lock.clear_stale()?;
        merge_lock.obtain_exclusive()?;
        merger.merge_lock = Some(merge_lock);

        let mut snapshot = Snapshot::new();
        snapshot.read_file(folder.as_ref(), None)?;
        if snapshot.path().is_none() {
            merger.release_locks()?;
            return Ok(merger);
        }

        merger.file_purger.purge(&snapshot)?;

        // The read lock keeps indexers from purging the files being merged.
        let polyreader = Arc::new(PolyReader::open(folder.clone(), None, Some(&merger.manager))?);
        let schema = Arc::new(Schema::clone(polyreader.schema()));

        let mut segment = Segment::new(merger.manager.highest_seg_num(&snapshot) + 1);
        for field in schema.all_fields() {
            segment.add_field(field);
        }
        merger.cutoff = segment.number();
        merger.manager.write_merge_data(merger.cutoff)?;

        // The segment directory is prepared only once there is something
        // to merge; merge.json already reserves the name.
        merger.seg_writer = Some(SegWriter::new(
            folder.clone(),
            schema,
            snapshot,
            segment,
            polyreader.clone(),
        ));
        merger.polyreader = Some(polyreader);

        if let Some(mut write_lock) = merger.write_lock.take() {
            write_lock.release()?;
        }
        log::info!("Background merge into {} started", Segment::num_to_name(merger.cutoff));
        Ok(merger)
    }

    /// Number of the segment this merger writes. Indexers stay above it.
    pub fn cutoff(&self) -> u64 {
        self.cutoff
    }

    /// Merge every segment rather than only the sparse ones.
    pub fn optimize(&mut self) {
        self.optimize = true;
    }

    fn obtain_write_lock(&mut self) -> Result<()> {
        let mut write_lock = self.manager.make_write_lock()?;
        write_lock.clear_stale()?;
        write_lock.obtain_exclusive()?;
        self.write_lock = Some(write_lock);
        Ok(())
    }

    fn release_locks(&mut self) -> Result<()> {
        if let Some(mut merge_lock) = self.merge_lock.take() {
            merge_lock.release()?;
        }
        if let Some(mut write_lock) = self.write_lock.take() {
            write_lock.release()?;
        }
        Ok(())
    }

    fn maybe_merge(&mut self) -> Result<usize> {
        let (Some(polyreader), Some(seg_writer)) = (&self.polyreader, self.seg_writer.as_mut()) else {
            return Ok(0);
        };
        let to_merge: Vec<Arc<SegReader>> =
            self.manager
                .recycle(polyreader, seg_writer.del_writer(), 0, self.optimize);

        // Rewriting a lone segment only pays off if it drops deletions.
        match to_merge.as_slice() {
            [] => return Ok(0),
            [only] if only.del_count() == 0 => return Ok(0),
            _ => {}
        }

        seg_writer.prep_seg_dir()?;
        for seg_reader in &to_merge {
            let offset = seg_writer.segment().count() as i32;
            let doc_map = seg_writer.del_writer().generate_doc_map(seg_reader, offset);
            seg_writer.merge_segment(seg_reader, &doc_map)?;
            self.doc_maps.insert(seg_reader.seg_name().to_string(), doc_map);
        }
        log::info!(
            "Merged {} of {} segments into {}",
            to_merge.len(),
            polyreader.seg_readers().len(),
            seg_writer.segment().name()
        );
        Ok(to_merge.len())
    }

    /// Carry forward deletions that indexers applied to merged-away
    /// segments while the merge ran, as a further segment on top of ours.
    fn merge_updated_deletions(&mut self) -> Result<bool> {
        let (Some(polyreader), Some(seg_writer)) = (&self.polyreader, self.seg_writer.as_mut()) else {
            return Ok(false);
        };
        let new_polyreader = PolyReader::open(self.folder.clone(), None, None)?;
        let new_segs: AHashMap<&str, &Arc<SegReader>> = new_polyreader
            .seg_readers()
            .iter()
            .map(|seg_reader| (seg_reader.seg_name(), seg_reader))
            .collect();

        let mut updated_deletions = Vec::new();
        for seg_reader in polyreader.seg_readers() {
            let seg_name = seg_reader.seg_name();
            if !self.doc_maps.contains_key(seg_name) {
                continue;
            }
            let new_seg_reader = new_segs.get(seg_name).ok_or_else(|| {
                IndexError::internal(format!("Merged segment {seg_name} vanished during merge"))
            })?;
            if seg_reader.del_count() != new_seg_reader.del_count() {
                let del_reader = new_seg_reader.deletions_reader().ok_or_else(|| {
                    IndexError::internal(format!("No DeletionsReader for {seg_name}"))
                })?;
                updated_deletions.push((seg_name.to_string(), del_reader.iterator()));
            }
        }
        if updated_deletions.is_empty() {
            return Ok(false);
        }

        let snapshot = seg_writer.snapshot().clone();
        let merge_polyreader = Arc::new(PolyReader::open(self.folder.clone(), Some(&snapshot), None)?);
        let mut latest_snapshot = Snapshot::new();
        latest_snapshot.read_file(self.folder.as_ref(), None)?;
        let new_seg_num = self.manager.highest_seg_num(&latest_snapshot) + 1;

        let merge_seg_num = seg_writer.segment().number();
        let seg_tick = merge_polyreader
            .seg_readers()
            .iter()
            .position(|seg_reader| seg_reader.seg_num() == merge_seg_num)
            .ok_or_else(|| IndexError::internal("Merged segment missing from its own snapshot"))?;
        let offset = merge_polyreader.offsets()[seg_tick];

        let mut del_seg_writer = SegWriter::new(
            self.folder.clone(),
            seg_writer.schema().clone(),
            snapshot,
            Segment::new(new_seg_num),
            merge_polyreader,
        );
        del_seg_writer.prep_seg_dir()?;
        let mut num_carried = 0;
        for (seg_name, mut deletions) in updated_deletions {
            let doc_map = &self.doc_maps[&seg_name];
            loop {
                let deleted = deletions.next()?;
                if deleted == 0 {
                    break;
                }
                // Zero means the doc was already gone when we merged.
                let remapped = doc_map.get(deleted as usize).copied().unwrap_or(0);
                if remapped != 0 {
                    del_seg_writer.del_writer_mut().delete_by_doc_id(remapped + offset)?;
                    num_carried += 1;
                }
            }
        }
        del_seg_writer.finish_deletions()?;
        del_seg_writer.finish()?;
        log::debug!(
            "Carried {num_carried} deletions forward into {}",
            del_seg_writer.segment().name()
        );
        *seg_writer.snapshot_mut() = del_seg_writer.into_snapshot();
        Ok(true)
    }

    /// Merge, finish the new segment and write a temporary snapshot. The
    /// write lock is held from here until [`BackgroundMerger::commit`].
    pub fn prepare_commit(&mut self) -> Result<()> {
        if self.prepared {
            return Err(IndexError::contract("Can't call prepare_commit() more than once"));
        }
        let num_seg_readers = self.polyreader.as_ref().map_or(0, |r| r.seg_readers().len());
        let segs_merged = if num_seg_readers > 0 { self.maybe_merge()? } else { 0 };
        if segs_merged == 0 {
            self.prepared = true;
            return Ok(());
        }
        let (Some(polyreader), Some(seg_writer)) = (self.polyreader.clone(), self.seg_writer.as_mut()) else {
            return Err(IndexError::internal("Merged without a segment writer"));
        };

        // Deletions against merged segments were applied through the doc maps.
        if seg_writer.del_writer().updated() && segs_merged != num_seg_readers {
            seg_writer.finish_deletions()?;
        }
        seg_writer.finish()?;

        self.obtain_write_lock()?;
        let snapfile = format!("{}.temp", self.manager.make_snapshot_filename()?);
        self.write_temp_snapshot(&snapfile)?;

        let start_snapfile = polyreader.snapshot().path().map(str::to_string);
        let mut latest_snapshot = Snapshot::new();
        latest_snapshot.read_file(self.folder.as_ref(), None)?;
        if latest_snapshot.path().map(str::to_string) != start_snapfile {
            // Has to run before the fresh segments join our snapshot, or
            // changed deletion counts couldn't be told apart.
            self.merge_updated_deletions()?;
            self.absorb_fresh_entries(&latest_snapshot)?;
            self.write_temp_snapshot(&snapfile)?;
        }
        self.snapfile = Some(snapfile);
        self.needs_commit = true;

        polyreader.close()?;
        self.prepared = true;
        Ok(())
    }

    fn write_temp_snapshot(&mut self, snapfile: &str) -> Result<()> {
        let seg_writer = self
            .seg_writer
            .as_mut()
            .ok_or_else(|| IndexError::internal("No snapshot to write"))?;
        if self.folder.exists(snapfile) {
            self.folder.delete(snapfile)?;
        }
        seg_writer.snapshot_mut().write_file(self.folder.as_ref(), Some(snapfile))
    }

    /// Add the segments indexers committed above the cutoff, and their
    /// schema if it is newer than ours.
    fn absorb_fresh_entries(&mut self, latest_snapshot: &Snapshot) -> Result<()> {
        let seg_writer = self
            .seg_writer
            .as_mut()
            .ok_or_else(|| IndexError::internal("No snapshot to update"))?;
        let snapshot = seg_writer.snapshot_mut();
        for entry in latest_snapshot.list() {
            if Segment::valid_seg_name(&entry) && file_names::extract_gen(&entry) > self.cutoff {
                snapshot.add_entry(entry);
            }
        }

        let newest_schema = |snapshot: &Snapshot| {
            snapshot
                .list()
                .into_iter()
                .filter(|entry| is_schema_file(entry))
                .max_by_key(|entry| file_names::extract_gen(entry))
        };
        if let Some(theirs) = newest_schema(latest_snapshot) {
            let ours = newest_schema(&*snapshot);
            let newer = ours
                .as_deref()
                .is_none_or(|ours| file_names::extract_gen(ours) < file_names::extract_gen(&theirs));
            if newer {
                if let Some(ours) = ours {
                    snapshot.delete_entry(&ours);
                }
                snapshot.add_entry(theirs);
            }
        }
        Ok(())
    }

    /// Publish the merged segment and release every lock.
    pub fn commit(&mut self) -> Result<()> {
        if self.committed {
            return Err(IndexError::contract("Can't call commit() more than once"));
        }
        if !self.prepared {
            self.prepare_commit()?;
        }

        if self.needs_commit {
            let temp_snapfile = self
                .snapfile
                .take()
                .ok_or_else(|| IndexError::internal("Prepared commit lost its snapshot file"))?;
            let snapfile = temp_snapfile
                .strip_suffix(".temp")
                .filter(|name| !name.is_empty())
                .ok_or_else(|| IndexError::internal(format!("Invalid snapfile name: {temp_snapfile}")))?
                .to_string();
            self.folder.hard_link(&temp_snapfile, &snapfile)?;
            if let Some(seg_writer) = self.seg_writer.as_mut() {
                seg_writer.snapshot_mut().set_path(Some(snapfile.as_str()));
            }
            if !self.folder.delete(&temp_snapfile)? {
                return Err(IndexError::internal(format!("Can't delete {temp_snapfile}")));
            }
            log::info!("Background merge committed '{snapfile}'");
            self.snapfile = Some(snapfile);
        }

        if let Some(mut merge_lock) = self.merge_lock.take() {
            merge_lock.release()?;
        }
        if self.cutoff > 0 {
            self.manager.remove_merge_data()?;
        }
        if self.needs_commit
            && let Some(seg_writer) = self.seg_writer.as_ref()
        {
            self.file_purger.purge(seg_writer.snapshot())?;
        }
        if let Some(mut write_lock) = self.write_lock.take() {
            write_lock.release()?;
        }
        self.committed = true;
        Ok(())
    }
}
