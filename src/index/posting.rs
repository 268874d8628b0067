//! Posting lists.
//!
//! `postings-<n>.dat` holds one run per term of field `n`, in lexicon order.
//! Each posting is a doc code, `(delta << 1) | 1` when the term occurs once
//! in the document and `delta << 1` followed by the frequency otherwise,
//! then one position delta per occurrence. Terms whose document frequency
//! reaches the skip interval also get entries in the segment-wide
//! `postings.skip`, one after each full block of postings, recording the
//! last doc id and the file position at the block boundary.

pub mod pool;
pub mod raw_posting;
pub mod reader;
pub mod seg_posting_list;
pub mod writer;

pub use pool::PostingPool;
pub use raw_posting::RawPosting;
pub use reader::PostingListReader;
pub use seg_posting_list::SegPostingList;
pub use writer::PostingListWriter;

use crate::error::Result;
use crate::store::{InStream, OutStream};

/// Version written into the segment's "postings" metadata.
pub const CURRENT_FILE_FORMAT: i32 = 1;

pub(crate) fn post_file(seg_name: &str, field_num: i32) -> String {
    format!("{seg_name}/postings-{field_num}.dat")
}

pub(crate) fn skip_file(seg_name: &str) -> String {
    format!("{seg_name}/postings.skip")
}

/// Write the doc code and frequency of a posting.
pub(crate) fn write_doc_code(out: &mut OutStream, delta: u32, freq: u32) -> Result<()> {
    if freq == 1 {
        out.write_c32((delta << 1) | 1)
    } else {
        out.write_c32(delta << 1)?;
        out.write_c32(freq)
    }
}

/// Read a doc code, returning the doc id delta and the frequency.
pub(crate) fn read_doc_code(input: &mut InStream) -> Result<(u32, u32)> {
    let doc_code = input.read_c32()?;
    let delta = doc_code >> 1;
    let freq = if doc_code & 1 == 1 { 1 } else { input.read_c32()? };
    Ok((delta, freq))
}
