use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::error::{IndexError, Result};
use crate::index::lexicon::{
    CURRENT_FILE_FORMAT, dat_file, ix_file, ixix_file, shared_prefix_len, write_key_frame,
};
use crate::index::term_info::TermInfo;
use crate::store::{Folder, OutStream};

#[derive(Debug)]
struct FieldState {
    field: String,
    dat: OutStream,
    ix: OutStream,
    ixix: OutStream,
    last_term: String,
    last_tinfo: TermInfo,
    count: u32,
    ix_count: u32,
}

/// Writes the sorted term dictionary for each field of a segment.
#[derive(Debug)]
pub struct LexiconWriter {
    folder: Arc<dyn Folder>,
    seg_name: String,
    index_interval: u32,
    skip_interval: u32,
    current: Option<FieldState>,
    counts: Map<String, Value>,
    index_counts: Map<String, Value>,
}

impl LexiconWriter {
    pub fn new<S: Into<String>>(
        folder: Arc<dyn Folder>,
        seg_name: S,
        index_interval: u32,
        skip_interval: u32,
    ) -> Self {
        LexiconWriter {
            folder,
            seg_name: seg_name.into(),
            index_interval: index_interval.max(1),
            skip_interval,
            current: None,
            counts: Map::new(),
            index_counts: Map::new(),
        }
    }

    /// Open the files for `field`. Fields must be finished one at a time.
    pub fn start_field(&mut self, field: &str, field_num: i32) -> Result<()> {
        if let Some(state) = &self.current {
            return Err(IndexError::contract(format!(
                "Can't start field '{field}' while '{}' is still open",
                state.field
            )));
        }
        let folder = self.folder.as_ref();
        self.current = Some(FieldState {
            field: field.to_string(),
            dat: folder.open_out(&dat_file(&self.seg_name, field_num))?,
            ix: folder.open_out(&ix_file(&self.seg_name, field_num))?,
            ixix: folder.open_out(&ixix_file(&self.seg_name, field_num))?,
            last_term: String::new(),
            last_tinfo: TermInfo::default(),
            count: 0,
            ix_count: 0,
        });
        Ok(())
    }

    /// Append a term. Terms must arrive in strictly increasing order.
    pub fn add_term(&mut self, term: &str, tinfo: &TermInfo) -> Result<()> {
        let index_interval = self.index_interval;
        let skip_interval = self.skip_interval;
        let state = self
            .current
            .as_mut()
            .ok_or_else(|| IndexError::contract("add_term called without start_field"))?;
        if state.count > 0 && term <= state.last_term.as_str() {
            return Err(IndexError::contract(format!(
                "Terms out of order in field '{}': '{}' followed by '{term}'",
                state.field, state.last_term
            )));
        }

        if tinfo.post_filepos < state.last_tinfo.post_filepos {
            return Err(IndexError::contract(format!(
                "Posting file position went backwards for term '{term}'"
            )));
        }

        // Every index_interval-th term, record where the scan resumes.
        if state.count % index_interval == 0 {
            state.ixix.write_i64(state.ix.tell() as i64)?;
            let mut key_tinfo = state.last_tinfo;
            key_tinfo.lex_filepos = state.dat.tell();
            write_key_frame(&mut state.ix, &state.last_term, &key_tinfo, skip_interval)?;
            state.ix_count += 1;
        }

        let shared = shared_prefix_len(state.last_term.as_bytes(), term.as_bytes());
        let suffix = &term.as_bytes()[shared..];
        state.dat.write_c32(shared as u32)?;
        state.dat.write_c32(suffix.len() as u32)?;
        state.dat.write_bytes(suffix)?;

        state.dat.write_c32(tinfo.doc_freq)?;
        state.dat.write_c64(tinfo.post_filepos - state.last_tinfo.post_filepos)?;
        if tinfo.doc_freq >= skip_interval {
            state.dat.write_c64(tinfo.skip_filepos)?;
        }

        state.last_term.clear();
        state.last_term.push_str(term);
        state.last_tinfo = *tinfo;
        state.count += 1;
        Ok(())
    }

    /// Close the current field's files and record its term counts.
    pub fn finish_field(&mut self) -> Result<()> {
        let mut state = self
            .current
            .take()
            .ok_or_else(|| IndexError::contract("finish_field called without start_field"))?;
        state.dat.close()?;
        state.ix.close()?;
        state.ixix.close()?;
        log::trace!(
            "Lexicon for '{}' in {}: {} terms, {} key frames",
            state.field,
            self.seg_name,
            state.count,
            state.ix_count
        );
        self.counts.insert(state.field.clone(), json!(state.count));
        self.index_counts.insert(state.field, json!(state.ix_count));
        Ok(())
    }

    pub fn format(&self) -> i32 {
        CURRENT_FILE_FORMAT
    }

    pub fn metadata(&self) -> Value {
        let mut counts = self.counts.clone();
        let mut index_counts = self.index_counts.clone();
        if counts.is_empty() {
            counts.insert("none".to_string(), json!(0));
            index_counts.insert("none".to_string(), json!(0));
        }
        json!({
            "counts": counts,
            "index_counts": index_counts,
            "format": CURRENT_FILE_FORMAT,
        })
    }
}
