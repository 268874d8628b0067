//! The term dictionary.
//!
//! Each indexed field gets three files in the segment directory:
//!
//! * `lexicon-<n>.dat`: every term in sorted order. A term is stored as the
//!   number of bytes it shares with its predecessor plus the differing
//!   suffix, followed by its [`TermInfo`] with `post_filepos` delta encoded.
//! * `lexicon-<n>.ix`: a key frame with absolute values for every
//!   `index_interval`-th term, used to start scanning near a target.
//! * `lexicon-<n>.ixix`: one big-endian `i64` pointer into `.ix` per key
//!   frame, so key frames can be binary searched.

pub mod lex_index;
pub mod poly_lexicon;
pub mod reader;
pub mod seg_lexicon;
pub mod writer;

pub use lex_index::LexIndex;
pub use poly_lexicon::PolyLexicon;
pub use reader::LexiconReader;
pub use seg_lexicon::SegLexicon;
pub use writer::LexiconWriter;

use crate::error::Result;
use crate::index::term_info::TermInfo;
use crate::store::{InStream, OutStream};

/// Version written into the segment's "lexicon" metadata.
pub const CURRENT_FILE_FORMAT: i32 = 3;

pub(crate) fn dat_file(seg_name: &str, field_num: i32) -> String {
    format!("{seg_name}/lexicon-{field_num}.dat")
}

pub(crate) fn ix_file(seg_name: &str, field_num: i32) -> String {
    format!("{seg_name}/lexicon-{field_num}.ix")
}

pub(crate) fn ixix_file(seg_name: &str, field_num: i32) -> String {
    format!("{seg_name}/lexicon-{field_num}.ixix")
}

/// Number of leading bytes shared by `a` and `b`.
pub(crate) fn shared_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

pub(crate) fn write_key_frame(
    out: &mut OutStream,
    term: &str,
    tinfo: &TermInfo,
    skip_interval: u32,
) -> Result<()> {
    out.write_string(term)?;
    out.write_c32(tinfo.doc_freq)?;
    out.write_c64(tinfo.post_filepos)?;
    if tinfo.doc_freq >= skip_interval {
        out.write_c64(tinfo.skip_filepos)?;
    }
    out.write_c64(tinfo.lex_filepos)
}

pub(crate) fn read_key_frame(input: &mut InStream, skip_interval: u32) -> Result<(String, TermInfo)> {
    let term = input.read_string()?;
    let mut tinfo = TermInfo::new(input.read_c32()?);
    tinfo.post_filepos = input.read_c64()?;
    if tinfo.doc_freq >= skip_interval {
        tinfo.skip_filepos = input.read_c64()?;
    }
    tinfo.lex_filepos = input.read_c64()?;
    Ok((term, tinfo))
}
