use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use serde_json::{Value, json};

use crate::error::{IndexError, Result};
use crate::index::data_writer::DataWriter;
use crate::index::inverter::Inverter;
use crate::index::lexicon::LexiconWriter;
use crate::index::posting::{CURRENT_FILE_FORMAT, PostingPool, post_file, skip_file};
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;
use crate::plan::Schema;
use crate::store::Folder;

/// Collects postings for every indexed field and writes them, together
/// with the lexicon, when the segment is finished.
#[derive(Debug)]
pub struct PostingListWriter {
    folder: Arc<dyn Folder>,
    schema: Arc<Schema>,
    seg_name: String,
    skip_interval: u32,
    pools: AHashMap<String, PostingPool>,
    lex_writer: LexiconWriter,
}

impl PostingListWriter {
    pub const API: &'static str = "PostingListWriter";

    pub fn new<S: Into<String>>(folder: Arc<dyn Folder>, schema: Arc<Schema>, seg_name: S) -> Self {
        let seg_name = seg_name.into();
        let architecture = *schema.architecture();
        let lex_writer = LexiconWriter::new(
            folder.clone(),
            seg_name.clone(),
            architecture.index_interval,
            architecture.skip_interval,
        );
        PostingListWriter {
            folder,
            schema,
            seg_name,
            skip_interval: architecture.skip_interval,
            pools: AHashMap::new(),
            lex_writer,
        }
    }

    fn pool(&mut self, field: &str) -> &mut PostingPool {
        self.pools
            .entry(field.to_string())
            .or_insert_with(|| PostingPool::new(field))
    }

    /// Postings buffered so far, across all fields.
    pub fn num_postings(&self) -> usize {
        self.pools.values().map(PostingPool::num_postings).sum()
    }
}

impl DataWriter for PostingListWriter {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn add_inverted_doc(&mut self, inverter: &Inverter, doc_id: i32) -> Result<()> {
        for entry in inverter.entries() {
            if let Some(inversion) = &entry.inversion {
                self.pool(&entry.field).add_inversion(inversion, doc_id)?;
            }
        }
        Ok(())
    }

    fn add_segment(&mut self, reader: &SegReader, doc_map: &[i32]) -> Result<()> {
        let Some(plist_reader) = reader.posting_list_reader() else {
            return Ok(());
        };
        let lex_reader = plist_reader.lexicon_reader();
        let mut fields: Vec<String> = lex_reader.fields().map(str::to_string).collect();
        fields.sort();
        for field in fields {
            // Fields absorbed from another index may be unknown to our schema.
            let indexed = self
                .schema
                .fetch_type(&field)
                .or_else(|| reader.schema().fetch_type(&field))
                .is_some_and(|field_type| field_type.is_indexed());
            if !indexed {
                continue;
            }
            if let Some(mut lexicon) = lex_reader.lexicon(&field, None)? {
                self.pool(&field).add_segment(&mut lexicon, plist_reader, doc_map)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self, segment: &mut Segment) -> Result<()> {
        let mut fields = Vec::new();
        for (field, pool) in &self.pools {
            if pool.is_empty() {
                continue;
            }
            let field_num = segment.field_num(field);
            if field_num == 0 {
                return Err(IndexError::internal(format!(
                    "Field '{field}' has postings but no number in {}",
                    self.seg_name
                )));
            }
            fields.push((field_num, field.clone()));
        }
        fields.sort();

        if !fields.is_empty() {
            let skip_interval = self.skip_interval;
            let mut skip = self.folder.open_out(&skip_file(&self.seg_name))?;
            for (field_num, field) in fields {
                let Some(mut pool) = self.pools.remove(&field) else {
                    continue;
                };
                let num_postings = pool.num_postings();
                let mut post = self.folder.open_out(&post_file(&self.seg_name, field_num))?;
                self.lex_writer.start_field(&field, field_num)?;
                let lex_writer = &mut self.lex_writer;
                pool.flush(&mut post, &mut skip, skip_interval, |term, tinfo| {
                    lex_writer.add_term(term, tinfo)
                })?;
                self.lex_writer.finish_field()?;
                post.close()?;
                log::trace!("Wrote {num_postings} postings for '{field}' in {}", self.seg_name);
            }
            skip.close()?;
        }
        self.pools.clear();

        segment.store_metadata("lexicon", self.lex_writer.metadata())?;
        segment.store_metadata("postings", self.metadata())?;
        Ok(())
    }

    fn format(&self) -> i32 {
        CURRENT_FILE_FORMAT
    }

    fn metadata(&self) -> Value {
        json!({ "format": CURRENT_FILE_FORMAT })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
