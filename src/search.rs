//! Query evaluation: compiling queries against an index, driving matchers
//! over each segment and collecting ranked hits.
//!
//! A [`Query`] is compiled once per search into a [`Compiler`], which holds
//! index-wide statistics such as idf. The compiler then produces one
//! [`Matcher`] per segment; matchers walk segment-local doc ids and the
//! [`IndexSearcher`] maps them to index-wide ids for its collectors.

pub mod collector;
pub mod hit_queue;
pub mod matcher;
pub mod query;
pub mod searcher;
pub mod similarity;
pub mod sort_collector;
pub mod span;

pub use collector::{BitCollector, Collector, OffsetCollector};
pub use hit_queue::{HitQueue, MatchDoc, SortRule, SortSpec};
pub use matcher::{Matcher, collect};
pub use query::{
    AndQuery, Compiler, MatchAllQuery, NoMatchQuery, NotQuery, OrQuery, PhraseQuery, Query,
    RangeQuery, RequiredOptionalQuery, TermQuery,
};
pub use searcher::{Hits, IndexSearcher};
pub use similarity::Similarity;
pub use sort_collector::SortCollector;
pub use span::Span;
