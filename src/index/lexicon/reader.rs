use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use serde_json::Value;

use crate::error::{IndexError, Result};
use crate::index::data_reader::DataReader;
use crate::index::lexicon::{CURRENT_FILE_FORMAT, LexIndex, SegLexicon, dat_file, ix_file, ixix_file};
use crate::index::segment::Segment;
use crate::index::term_info::TermInfo;
use crate::plan::Schema;
use crate::store::compound::json_to_i64;
use crate::store::{Folder, InStream};

#[derive(Debug, Clone)]
struct FieldFiles {
    size: i32,
    dat: InStream,
    ix: InStream,
    ixix: InStream,
}

/// Term dictionary access for one segment.
#[derive(Debug)]
pub struct LexiconReader {
    segment: Arc<Segment>,
    index_interval: u32,
    skip_interval: u32,
    fields: AHashMap<String, FieldFiles>,
}

impl LexiconReader {
    pub const API: &'static str = "LexiconReader";

    pub fn open(folder: &dyn Folder, schema: &Schema, segment: Arc<Segment>) -> Result<Self> {
        let architecture = schema.architecture();
        let mut reader = LexiconReader {
            segment: segment.clone(),
            index_interval: architecture.index_interval,
            skip_interval: architecture.skip_interval,
            fields: AHashMap::new(),
        };
        let Some(metadata) = segment.fetch_metadata("lexicon") else {
            return Ok(reader);
        };

        let format = metadata
            .get("format")
            .and_then(json_to_i64)
            .ok_or_else(|| IndexError::format("Missing 'format' in lexicon metadata"))?;
        if format > CURRENT_FILE_FORMAT as i64 {
            return Err(IndexError::format(format!(
                "Unsupported lexicon format: {format} (current = {CURRENT_FILE_FORMAT})"
            )));
        }
        let counts = metadata
            .get("counts")
            .and_then(Value::as_object)
            .ok_or_else(|| IndexError::format("Missing 'counts' in lexicon metadata"))?;

        let seg_name = segment.name();
        for (field, count) in counts {
            let size = json_to_i64(count)
                .ok_or_else(|| IndexError::format(format!("Bad lexicon count for '{field}'")))?;
            let field_num = segment.field_num(field);
            if field_num == 0 || size == 0 {
                continue;
            }
            let files = FieldFiles {
                size: size as i32,
                dat: folder.open_in(&dat_file(seg_name, field_num))?,
                ix: folder.open_in(&ix_file(seg_name, field_num))?,
                ixix: folder.open_in(&ixix_file(seg_name, field_num))?,
            };
            reader.fields.insert(field.clone(), files);
        }
        Ok(reader)
    }

    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }

    /// Fields with a lexicon in this segment.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// A cursor over `field`, positioned at `term` if one is given. `None`
    /// when the segment has no terms for the field.
    pub fn lexicon(&self, field: &str, term: Option<&str>) -> Result<Option<SegLexicon>> {
        let Some(files) = self.fields.get(field) else {
            return Ok(None);
        };
        let lex_index = LexIndex::new(
            files.ixix.clone(),
            files.ix.clone(),
            self.index_interval,
            self.skip_interval,
        )?;
        let mut lexicon = SegLexicon::new(
            field,
            files.dat.clone(),
            lex_index,
            files.size,
            self.skip_interval,
        );
        if term.is_some() {
            lexicon.seek(term)?;
        }
        Ok(Some(lexicon))
    }

    /// The `TermInfo` for an exact term match.
    pub fn fetch_term_info(&self, field: &str, term: &str) -> Result<Option<TermInfo>> {
        let Some(mut lexicon) = self.lexicon(field, None)? else {
            return Ok(None);
        };
        lexicon.seek(Some(term))?;
        match lexicon.term() {
            Some(found) if found == term => Ok(lexicon.term_info().copied()),
            _ => Ok(None),
        }
    }

    pub fn doc_freq(&self, field: &str, term: &str) -> Result<u32> {
        Ok(self
            .fetch_term_info(field, term)?
            .map_or(0, |tinfo| tinfo.doc_freq))
    }
}

impl DataReader for LexiconReader {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
