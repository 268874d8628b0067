use serde::{Deserialize, Serialize};

/// Default number of lexicon terms between key frames in the lexicon index.
pub const DEFAULT_INDEX_INTERVAL: u32 = 128;

/// Default number of postings between skip entries.
pub const DEFAULT_SKIP_INTERVAL: u32 = 16;

/// Low-level layout parameters shared by writers and readers.
///
/// Both intervals are recorded in the schema file, so readers always use
/// the values the segment was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    pub index_interval: u32,
    pub skip_interval: u32,
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture {
            index_interval: DEFAULT_INDEX_INTERVAL,
            skip_interval: DEFAULT_SKIP_INTERVAL,
        }
    }
}

impl Architecture {
    pub fn new() -> Self {
        Architecture::default()
    }

    pub fn with_index_interval(mut self, interval: u32) -> Self {
        self.index_interval = interval.max(1);
        self
    }

    pub fn with_skip_interval(mut self, interval: u32) -> Self {
        self.skip_interval = interval.max(1);
        self
    }
}
