//! The write entry point: adds and deletes documents, then commits them as
//! a new snapshot.

use std::sync::Arc;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::document::Doc;
use crate::error::{IndexError, Result};
use crate::index::data_writer::generate_doc_map;
use crate::index::file_names::{self, is_schema_file};
use crate::index::file_purger::FilePurger;
use crate::index::index_manager::{IndexManager, IndexManagerConfig};
use crate::index::poly_reader::PolyReader;
use crate::index::seg_writer::SegWriter;
use crate::index::segment::Segment;
use crate::index::snapshot::Snapshot;
use crate::plan::{FieldType, Schema};
use crate::search::Query;
use crate::store::{Folder, Lock};

/// How [`Indexer::open`] treats the target folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Create the folder if it does not exist yet.
    pub create: bool,
    /// Start from an empty index, discarding every existing segment on
    /// commit.
    pub truncate: bool,
}

impl IndexerConfig {
    pub fn create() -> Self {
        IndexerConfig {
            create: true,
            truncate: false,
        }
    }

    pub fn truncate() -> Self {
        IndexerConfig {
            create: false,
            truncate: true,
        }
    }

    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }
}

/// Newest schema file listed in `snapshot`.
fn find_schema_file(snapshot: &Snapshot) -> Option<String> {
    snapshot
        .list()
        .into_iter()
        .filter(|entry| is_schema_file(entry))
        .max_by_key(|entry| file_names::extract_gen(entry))
}

/// Holds the write lock on an index for the duration of one session.
///
/// Changes become visible to readers only after [`Indexer::commit`]. An
/// indexer dropped without committing leaves the index as it was.
#[derive(Debug)]
pub struct Indexer {
    folder: Arc<dyn Folder>,
    schema: Arc<Schema>,
    manager: IndexManager,
    polyreader: Arc<PolyReader>,
    seg_writer: SegWriter,
    file_purger: FilePurger,
    write_lock: Option<Lock>,
    merge_lock: Option<Lock>,
    snapfile: Option<String>,
    truncate: bool,
    optimize: bool,
    prepared: bool,
    needs_commit: bool,
}

impl Indexer {
    /// Open an indexing session on `folder`.
    ///
    /// Without a `schema` the one stored in the index is used. Without a
    /// `manager` a default one is created for `folder`.
    pub fn open(
        schema: Option<Schema>,
        folder: Arc<dyn Folder>,
        manager: Option<IndexManager>,
        config: IndexerConfig,
    ) -> Result<Indexer> {
        if config.create {
            folder.initialize()?;
        }
        if !folder.check() {
            return Err(IndexError::not_found(format!(
                "Folder '{}' doesn't exist",
                folder.path()
            )));
        }
        let manager = manager
            .unwrap_or_else(|| IndexManager::new(folder.clone(), IndexManagerConfig::default()));

        let mut write_lock = manager.make_write_lock()?;
        write_lock.clear_stale()?;
        write_lock.obtain_exclusive()?;

        let mut latest_snapshot = Snapshot::new();
        latest_snapshot.read_file(folder.as_ref(), None)?;
        let has_snapshot = latest_snapshot.path().is_some();

        let mut schema = match schema {
            Some(schema) => schema,
            None => {
                let schema_file = find_schema_file(&latest_snapshot).ok_or_else(|| {
                    IndexError::invalid_argument("No Schema supplied, and can't find one in the index")
                })?;
                Schema::read(folder.as_ref(), &schema_file)?
            }
        };

        let (snapshot, polyreader) = if config.truncate || !has_snapshot {
            let empty = PolyReader::empty(folder.clone(), Arc::new(schema.clone()));
            (Snapshot::new(), empty)
        } else {
            let polyreader = PolyReader::open(folder.clone(), None, None)?;
            // Pick up fields added dynamically in earlier sessions.
            schema.eat(polyreader.schema())?;
            (latest_snapshot.clone(), polyreader)
        };
        let polyreader = Arc::new(polyreader);
        let schema = Arc::new(schema);

        let file_purger = FilePurger::new(folder.clone(), manager.clone());
        file_purger.purge(&latest_snapshot)?;

        let mut new_seg_num = manager.highest_seg_num(&latest_snapshot) + 1;
        if manager.make_merge_lock()?.is_locked() {
            // Stay above the segment a background merge is writing.
            let cutoff = manager.merge_cutoff()?.ok_or_else(|| {
                IndexError::format("Background merge detected, but can't read merge data")
            })?;
            if cutoff >= new_seg_num {
                new_seg_num = cutoff + 1;
            }
        }
        let mut segment = Segment::new(new_seg_num);
        for field in schema.all_fields() {
            segment.add_field(field);
        }

        let seg_writer = SegWriter::new(
            folder.clone(),
            schema.clone(),
            snapshot,
            segment,
            polyreader.clone(),
        );
        seg_writer.prep_seg_dir()?;
        log::debug!(
            "Opened indexer on '{}' writing {}",
            folder.path(),
            seg_writer.segment().name()
        );

        Ok(Indexer {
            folder,
            schema,
            manager,
            polyreader,
            seg_writer,
            file_purger,
            write_lock: Some(write_lock),
            merge_lock: None,
            snapfile: None,
            truncate: config.truncate,
            optimize: false,
            prepared: false,
            needs_commit: false,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn folder(&self) -> &Arc<dyn Folder> {
        &self.folder
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    /// The segment this session is writing.
    pub fn segment(&self) -> &Segment {
        self.seg_writer.segment()
    }

    /// The snapshot this session will commit.
    pub fn snapshot(&self) -> &Snapshot {
        self.seg_writer.snapshot()
    }

    /// Merge every existing segment into the new one on commit.
    pub fn optimize(&mut self) {
        self.optimize = true;
    }

    pub fn add_doc(&mut self, doc: &Doc) -> Result<()> {
        self.seg_writer.add_doc(doc)?;
        Ok(())
    }

    /// Delete every document whose `field` holds `term`. Full text terms
    /// are run through the field's analyzer first.
    pub fn delete_by_term(&mut self, field: &str, term: &str) -> Result<()> {
        let field_type = self
            .schema
            .fetch_type(field)
            .filter(|field_type| field_type.is_indexed())
            .ok_or_else(|| IndexError::invalid_argument(format!("{field} is not an indexed field")))?;
        if let FieldType::FullText { .. } = field_type {
            let analyzer = self.schema.fetch_analyzer(field).ok_or_else(|| {
                IndexError::internal(format!("No analyzer for full text field {field}"))
            })?;
            if let Some(analyzed) = analyzer.split(term)?.into_iter().next() {
                self.seg_writer.del_writer_mut().delete_by_term(field, &analyzed)?;
            }
            return Ok(());
        }
        self.seg_writer.del_writer_mut().delete_by_term(field, term)
    }

    pub fn delete_by_query(&mut self, query: &dyn Query) -> Result<()> {
        self.seg_writer.del_writer_mut().delete_by_query(query)
    }

    /// Delete one document by its id in the index as it was when the
    /// session opened.
    pub fn delete_by_doc_id(&mut self, doc_id: i32) -> Result<()> {
        self.seg_writer.del_writer_mut().delete_by_doc_id(doc_id)
    }

    /// Copy the live documents of another index into the new segment.
    pub fn add_index(&mut self, other: Arc<dyn Folder>) -> Result<()> {
        let reader = PolyReader::open(other.clone(), None, None)?;
        if reader.snapshot().path().is_none() {
            return Err(IndexError::not_found(format!(
                "Index at '{}' doesn't seem to contain any data",
                other.path()
            )));
        }

        let other_schema = reader.schema();
        Arc::make_mut(&mut self.schema).eat(other_schema)?;
        self.seg_writer.set_schema(self.schema.clone());
        for field in other_schema.all_fields() {
            self.seg_writer.segment_mut().add_field(field);
        }

        for seg_reader in reader.seg_readers() {
            let del_reader = seg_reader.deletions_reader();
            let offset = self.seg_writer.segment().count() as i32;
            let doc_map = generate_doc_map(
                |doc_id| del_reader.is_some_and(|d| d.is_deleted(doc_id)),
                seg_reader.doc_max(),
                offset,
            );
            self.seg_writer.add_segment(seg_reader, &doc_map)?;
        }
        log::debug!(
            "Added {} segments from '{}'",
            reader.seg_readers().len(),
            other.path()
        );
        Ok(())
    }

    fn maybe_merge(&mut self) -> Result<bool> {
        let num_seg_readers = self.polyreader.seg_readers().len();
        let mut merge_lock = self.manager.make_merge_lock()?;
        let cutoff = if merge_lock.request_exclusive()? {
            self.merge_lock = Some(merge_lock);
            0
        } else {
            // Leave alone whatever a background merge has claimed.
            self.manager.merge_cutoff()?.unwrap_or(u64::MAX)
        };

        let to_merge = self.manager.recycle(
            &self.polyreader,
            self.seg_writer.del_writer(),
            cutoff,
            self.optimize,
        );
        let mut seen = AHashSet::with_capacity(to_merge.len());
        for seg_reader in &to_merge {
            if !seen.insert(seg_reader.seg_name()) {
                return Err(IndexError::internal(format!(
                    "Recycle() tried to merge segment '{}' twice",
                    seg_reader.seg_name()
                )));
            }
        }

        for seg_reader in &to_merge {
            if seg_reader.seg_num() <= cutoff {
                return Err(IndexError::internal(format!(
                    "Segment {} violates cutoff ({} <= {cutoff})",
                    seg_reader.seg_name(),
                    seg_reader.seg_num()
                )));
            }
            let offset = self.seg_writer.segment().count() as i32;
            let doc_map = self.seg_writer.del_writer().generate_doc_map(seg_reader, offset);
            self.seg_writer.merge_segment(seg_reader, &doc_map)?;
        }

        // Deletions against merged segments were applied through the doc maps.
        if self.seg_writer.del_writer().updated() && to_merge.len() != num_seg_readers {
            self.seg_writer.finish_deletions()?;
        }
        if !to_merge.is_empty() {
            log::info!(
                "Merging {} of {num_seg_readers} segments into {}",
                to_merge.len(),
                self.seg_writer.segment().name()
            );
        }
        Ok(!to_merge.is_empty())
    }

    /// First phase of a commit: merge, finish the segment and write the new
    /// schema and a temporary snapshot file. Can be called once.
    pub fn prepare_commit(&mut self) -> Result<()> {
        if self.write_lock.is_none() || self.prepared {
            return Err(IndexError::contract("Can't call prepare_commit() more than once"));
        }

        let merge_happened = if !self.truncate && !self.polyreader.seg_readers().is_empty() {
            self.maybe_merge()?
        } else {
            false
        };

        if self.seg_writer.segment().count() > 0
            || merge_happened
            || self.seg_writer.snapshot().num_entries() == 0
            || self.seg_writer.del_writer().updated()
        {
            let snapfile = format!("{}.temp", self.manager.make_snapshot_filename()?);
            let new_schema_name = file_names::schema_file_name(file_names::extract_gen(&snapfile));

            self.seg_writer.finish()?;
            self.schema.write(self.folder.as_ref(), &new_schema_name)?;
            let snapshot = self.seg_writer.snapshot_mut();
            if let Some(old_schema_name) = find_schema_file(snapshot) {
                snapshot.delete_entry(&old_schema_name);
            }
            snapshot.add_entry(new_schema_name);

            if self.folder.exists(&snapfile) {
                self.folder.delete(&snapfile)?;
            }
            snapshot.write_file(self.folder.as_ref(), Some(&snapfile))?;
            self.snapfile = Some(snapfile);
            self.needs_commit = true;
        }

        // Let the purger reclaim files only the old view used.
        self.polyreader.close()?;
        self.prepared = true;
        Ok(())
    }

    /// Make the session's changes visible and release the write lock. The
    /// indexer can't be used afterwards.
    pub fn commit(&mut self) -> Result<()> {
        if self.write_lock.is_none() {
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
            self.seg_writer.snapshot_mut().set_path(Some(snapfile.as_str()));
            self.folder.rename(&temp_snapfile, &snapfile)?;
            log::info!(
                "Committed '{snapfile}' with {} docs in {}",
                self.seg_writer.segment().count(),
                self.seg_writer.segment().name()
            );
            self.file_purger.purge(self.seg_writer.snapshot())?;
            self.snapfile = Some(snapfile);
        }

        if let Some(mut merge_lock) = self.merge_lock.take() {
            merge_lock.release()?;
        }
        if let Some(mut write_lock) = self.write_lock.take() {
            write_lock.release()?;
        }
        Ok(())
    }
}
