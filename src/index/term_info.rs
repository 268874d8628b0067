/// Location and frequency data for one term in one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermInfo {
    /// Number of documents in the segment containing the term.
    pub doc_freq: u32,
    /// Start of the term's posting run in `postings-<field>.dat`.
    pub post_filepos: u64,
    /// Start of the term's skip entries in `postings.skip`.
    pub skip_filepos: u64,
    /// Position in `lexicon-<field>.dat`, meaningful in index key frames only.
    pub lex_filepos: u64,
}

impl TermInfo {
    pub fn new(doc_freq: u32) -> Self {
        TermInfo {
            doc_freq,
            ..TermInfo::default()
        }
    }

    pub fn reset(&mut self) {
        *self = TermInfo::default();
    }
}
