//! Deleted-document tracking.
//!
//! Deletions against segment `seg_a` recorded while writing `seg_b` are
//! stored as `seg_b/deletions-seg_a.bv`, a raw bit vector over `seg_a`'s
//! local doc ids. The segment metadata of `seg_b` lists every such file
//! under `deletions.files`, and readers take the file from the newest
//! segment that mentions theirs.

pub mod reader;
pub mod writer;

pub use reader::DeletionsReader;
pub use writer::DeletionsWriter;

/// Version written into the segment's "deletions" metadata.
pub const CURRENT_FILE_FORMAT: i32 = 1;

pub(crate) fn del_file(seg_name: &str, target_seg_name: &str) -> String {
    format!("{seg_name}/deletions-{target_seg_name}.bv")
}
