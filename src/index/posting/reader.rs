use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{IndexError, Result};
use crate::index::data_reader::DataReader;
use crate::index::lexicon::LexiconReader;
use crate::index::posting::{CURRENT_FILE_FORMAT, SegPostingList, post_file, skip_file};
use crate::index::segment::Segment;
use crate::index::term_info::TermInfo;
use crate::plan::Schema;
use crate::store::compound::json_to_i64;
use crate::store::{Folder, InStream};

/// Posting list access for one segment.
#[derive(Debug)]
pub struct PostingListReader {
    lex_reader: Arc<LexiconReader>,
    post_files: AHashMap<String, InStream>,
    skip: Option<InStream>,
    skip_interval: u32,
}

impl PostingListReader {
    pub const API: &'static str = "PostingListReader";

    pub fn open(
        folder: &dyn Folder,
        schema: &Schema,
        segment: &Segment,
        lex_reader: Arc<LexiconReader>,
    ) -> Result<Self> {
        if let Some(metadata) = segment.fetch_metadata("postings") {
            let format = metadata
                .get("format")
                .and_then(json_to_i64)
                .ok_or_else(|| IndexError::format("Missing 'format' in postings metadata"))?;
            if format > CURRENT_FILE_FORMAT as i64 {
                return Err(IndexError::format(format!(
                    "Unsupported postings format: {format} (current = {CURRENT_FILE_FORMAT})"
                )));
            }
        }

        let mut post_files = AHashMap::new();
        for field in lex_reader.fields() {
            let field_num = segment.field_num(field);
            post_files.insert(field.to_string(), folder.open_in(&post_file(segment.name(), field_num))?);
        }
        let skip_path = skip_file(segment.name());
        let skip = if folder.exists_virtual(&skip_path) {
            Some(folder.open_in(&skip_path)?)
        } else {
            None
        };

        Ok(PostingListReader {
            lex_reader,
            post_files,
            skip,
            skip_interval: schema.architecture().skip_interval,
        })
    }

    pub fn lexicon_reader(&self) -> &Arc<LexiconReader> {
        &self.lex_reader
    }

    /// Postings for `term` in `field`, or `None` if the segment lacks it.
    pub fn posting_list(&self, field: &str, term: &str) -> Result<Option<SegPostingList>> {
        match self.lex_reader.fetch_term_info(field, term)? {
            Some(tinfo) => self.posting_list_for(field, &tinfo),
            None => Ok(None),
        }
    }

    /// Postings located by an already-fetched `TermInfo`.
    pub fn posting_list_for(&self, field: &str, tinfo: &TermInfo) -> Result<Option<SegPostingList>> {
        let Some(post) = self.post_files.get(field) else {
            return Ok(None);
        };
        SegPostingList::new(post.clone(), self.skip.clone(), tinfo, self.skip_interval).map(Some)
    }
}

impl DataReader for PostingListReader {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
