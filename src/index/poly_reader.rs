//! A read-only view of every segment listed by one snapshot.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::Doc;
use crate::error::{IndexError, Result};
use crate::index::file_names::{self, is_schema_file};
use crate::index::highlight::DocVector;
use crate::index::index_manager::IndexManager;
use crate::index::lexicon::PolyLexicon;
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;
use crate::index::snapshot::Snapshot;
use crate::plan::Schema;
use crate::search::matcher::{Matcher, SeriesMatcher};
use crate::store::{Folder, SharedLock};

/// Aggregates the segments of an index behind index-wide doc ids.
///
/// Segment `i` owns the ids `offsets[i] + 1 ..= offsets[i] + doc_max(i)`.
#[derive(Debug)]
pub struct PolyReader {
    folder: Arc<dyn Folder>,
    schema: Arc<Schema>,
    snapshot: Snapshot,
    seg_readers: Vec<Arc<SegReader>>,
    offsets: Vec<i32>,
    doc_max: i32,
    del_count: i32,
    read_lock: Mutex<Option<SharedLock>>,
}

impl PolyReader {
    /// A reader over no segments at all.
    pub fn empty(folder: Arc<dyn Folder>, schema: Arc<Schema>) -> Self {
        PolyReader {
            folder,
            schema,
            snapshot: Snapshot::new(),
            seg_readers: Vec::new(),
            offsets: Vec::new(),
            doc_max: 0,
            del_count: 0,
            read_lock: Mutex::new(None),
        }
    }

    /// Open the index at the state described by `snapshot`, or at its most
    /// recent snapshot file.
    ///
    /// When a `manager` is given the deletion lock is held while opening and
    /// a read lock on the snapshot file is held for the reader's lifetime,
    /// which keeps purgers away from its files.
    pub fn open(
        folder: Arc<dyn Folder>,
        snapshot: Option<&Snapshot>,
        manager: Option<&IndexManager>,
    ) -> Result<PolyReader> {
        let mut deletion_lock = match manager {
            Some(manager) => {
                let mut lock = manager.make_deletion_lock()?;
                lock.clear_stale()?;
                lock.obtain_exclusive()?;
                Some(lock)
            }
            None => None,
        };
        let outcome = PolyReader::open_retrying(folder, snapshot, manager);
        if let Some(lock) = deletion_lock.as_mut() {
            lock.release()?;
        }
        outcome
    }

    fn open_retrying(
        folder: Arc<dyn Folder>,
        snapshot: Option<&Snapshot>,
        manager: Option<&IndexManager>,
    ) -> Result<PolyReader> {
        let mut last_gen = 0;
        loop {
            let target = match snapshot {
                Some(snapshot) => Some(
                    snapshot
                        .path()
                        .map(str::to_string)
                        .ok_or_else(|| IndexError::invalid_argument("Supplied snapshot has no path"))?,
                ),
                None => file_names::latest_snapshot(folder.as_ref())?,
            };
            let Some(target) = target else {
                return Ok(PolyReader::empty(folder, Arc::new(Schema::new())));
            };
            let generation = file_names::extract_gen(&target);

            let read_lock = match manager {
                Some(manager) => {
                    let mut lock = manager.make_snapshot_read_lock(&target)?;
                    lock.clear_stale()?;
                    lock.obtain_shared()?;
                    Some(lock)
                }
                None => None,
            };

            let attempt = match snapshot {
                Some(snapshot) => PolyReader::open_elements(folder.clone(), snapshot.clone()),
                None => {
                    let mut latest = Snapshot::new();
                    latest
                        .read_file(folder.as_ref(), Some(&target))
                        .and_then(|_| PolyReader::open_elements(folder.clone(), latest))
                }
            };
            match attempt {
                Ok(mut reader) => {
                    *reader.read_lock.get_mut() = read_lock;
                    return Ok(reader);
                }
                // A writer may have purged files between listing and
                // opening; retry once per newer generation.
                Err(e) if snapshot.is_none() && last_gen < generation => {
                    log::debug!("Retrying open of '{target}' after error: {e}");
                    last_gen = generation;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn open_elements(folder: Arc<dyn Folder>, snapshot: Snapshot) -> Result<PolyReader> {
        let entries = snapshot.list();
        let schema_file = entries
            .iter()
            .filter(|entry| is_schema_file(entry))
            .max_by_key(|entry| file_names::extract_gen(entry));
        let schema = match schema_file {
            Some(path) => Schema::read(folder.as_ref(), path)?,
            None => return Err(IndexError::format("Can't find a schema file")),
        };
        let schema = Arc::new(schema);

        let mut segments = Vec::new();
        for name in snapshot.segment_names() {
            segments.push(Segment::read(folder.as_ref(), &name)?);
        }
        segments.sort_by(|a, b| a.compare(b));
        let segments: Vec<Arc<Segment>> = segments.into_iter().map(Arc::new).collect();

        let mut seg_readers = Vec::with_capacity(segments.len());
        for tick in 0..segments.len() {
            let reader = SegReader::open(folder.clone(), schema.clone(), &segments, tick)?;
            seg_readers.push(Arc::new(reader));
        }

        let mut reader = PolyReader::empty(folder, schema);
        reader.snapshot = snapshot;
        reader.init_sub_readers(seg_readers);
        Ok(reader)
    }

    fn init_sub_readers(&mut self, seg_readers: Vec<Arc<SegReader>>) {
        self.offsets = Vec::with_capacity(seg_readers.len());
        self.doc_max = 0;
        self.del_count = 0;
        for seg_reader in &seg_readers {
            self.offsets.push(self.doc_max);
            self.doc_max += seg_reader.doc_max();
            self.del_count += seg_reader.del_count();
        }
        self.seg_readers = seg_readers;
    }

    pub fn folder(&self) -> &Arc<dyn Folder> {
        &self.folder
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn seg_readers(&self) -> &[Arc<SegReader>] {
        &self.seg_readers
    }

    /// Number of doc ids handed out before each segment.
    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    /// Highest index-wide doc id.
    pub fn doc_max(&self) -> i32 {
        self.doc_max
    }

    /// Number of live documents.
    pub fn doc_count(&self) -> i32 {
        self.doc_max - self.del_count
    }

    pub fn del_count(&self) -> i32 {
        self.del_count
    }

    /// Tick of the segment owning index-wide `doc_id`.
    pub fn sub_tick(&self, doc_id: i32) -> usize {
        self.offsets.partition_point(|&offset| offset < doc_id).saturating_sub(1)
    }

    pub fn doc_freq(&self, field: &str, term: &str) -> Result<u32> {
        let mut doc_freq = 0;
        for seg_reader in &self.seg_readers {
            doc_freq += seg_reader.doc_freq(field, term)?;
        }
        Ok(doc_freq)
    }

    pub fn fetch_doc(&self, doc_id: i32) -> Result<Doc> {
        if doc_id < 1 || doc_id > self.doc_max {
            return Err(IndexError::invalid_argument(format!(
                "Doc id {doc_id} out of range (max {})",
                self.doc_max
            )));
        }
        let tick = self.sub_tick(doc_id);
        self.seg_readers[tick].fetch_doc(doc_id - self.offsets[tick])
    }

    pub fn fetch_doc_vec(&self, doc_id: i32) -> Result<DocVector> {
        if doc_id < 1 || doc_id > self.doc_max {
            return Err(IndexError::invalid_argument(format!(
                "Doc id {doc_id} out of range (max {})",
                self.doc_max
            )));
        }
        let tick = self.sub_tick(doc_id);
        self.seg_readers[tick].fetch_doc_vec(doc_id - self.offsets[tick])
    }

    /// The terms of `field` across every segment, positioned at `term` or
    /// at the start. `None` if no segment indexes the field.
    pub fn lexicon(&self, field: &str, term: Option<&str>) -> Result<Option<PolyLexicon>> {
        let mut seg_lexicons = Vec::new();
        for seg_reader in &self.seg_readers {
            if let Some(lex_reader) = seg_reader.lexicon_reader()
                && let Some(lexicon) = lex_reader.lexicon(field, None)?
            {
                seg_lexicons.push(lexicon);
            }
        }
        if seg_lexicons.is_empty() {
            return Ok(None);
        }
        let mut lexicon = PolyLexicon::new(field, seg_lexicons)?;
        if term.is_some() {
            lexicon.seek(term)?;
        }
        Ok(Some(lexicon))
    }

    /// Index-wide deleted doc ids across every segment.
    pub fn deletions(&self) -> SeriesMatcher {
        let matchers = self
            .seg_readers
            .iter()
            .map(|seg_reader| {
                seg_reader
                    .deletions_reader()
                    .filter(|d| d.del_count() > 0)
                    .map(|d| Box::new(d.iterator()) as Box<dyn Matcher>)
            })
            .collect();
        SeriesMatcher::new(matchers, self.offsets.clone())
    }

    /// Give up the snapshot read lock, if one is held.
    pub fn close(&self) -> Result<()> {
        if let Some(mut lock) = self.read_lock.lock().take() {
            lock.release()?;
        }
        Ok(())
    }
}
