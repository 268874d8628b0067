//! Queries and the compilers they produce for a particular searcher.

pub mod and_query;
pub mod match_all_query;
pub mod not_query;
pub mod or_query;
pub mod phrase_query;
pub mod range_query;
pub mod req_opt_query;
pub mod term_query;

use std::fmt;

pub use and_query::AndQuery;
pub use match_all_query::{MatchAllQuery, NoMatchQuery};
pub use not_query::NotQuery;
pub use or_query::OrQuery;
pub use phrase_query::PhraseQuery;
pub use range_query::RangeQuery;
pub use req_opt_query::RequiredOptionalQuery;
pub use term_query::TermQuery;

use crate::error::Result;
use crate::index::highlight::DocVector;
use crate::index::seg_reader::SegReader;
use crate::search::matcher::Matcher;
use crate::search::searcher::IndexSearcher;
use crate::search::similarity::Similarity;
use crate::search::span::Span;

/// A description of what to search for.
pub trait Query: Send + Sync + fmt::Debug {
    fn boost(&self) -> f32;

    /// Weigh the query against `searcher`'s index. Compilers built as part
    /// of a larger query pass `subordinate = true` and leave normalization
    /// to the top-level compiler.
    fn make_compiler(
        &self,
        searcher: &IndexSearcher,
        boost: f32,
        subordinate: bool,
    ) -> Result<Box<dyn Compiler>>;
}

/// A query weighted against one index, producing matchers per segment.
pub trait Compiler: Send + Sync + fmt::Debug {
    /// A matcher over `reader`, or `None` if nothing in the segment can
    /// match.
    fn make_matcher(&self, reader: &SegReader, need_score: bool) -> Result<Option<Box<dyn Matcher>>>;

    fn boost(&self) -> f32;

    fn weight(&self) -> f32 {
        self.boost()
    }

    fn sum_of_squared_weights(&self) -> f32 {
        1.0
    }

    fn apply_norm_factor(&mut self, _factor: f32) {}

    /// Stretches of `field` in `doc_vec` which this query matched.
    fn highlight_spans(&self, _doc_vec: &DocVector, _field: &str) -> Result<Vec<Span>> {
        Ok(Vec::new())
    }

    /// Scale weights so that scores are comparable across queries.
    fn normalize(&mut self) {
        let factor = Similarity::new().query_norm(self.sum_of_squared_weights());
        self.apply_norm_factor(factor);
    }
}

/// Compile each child as a subordinate of a compound query.
pub(crate) fn compile_children(
    children: &[Box<dyn Query>],
    searcher: &IndexSearcher,
) -> Result<Vec<Box<dyn Compiler>>> {
    children
        .iter()
        .map(|child| child.make_compiler(searcher, child.boost(), true))
        .collect()
}

/// Spans of every child, concatenated.
pub(crate) fn children_highlight_spans(
    children: &[Box<dyn Compiler>],
    doc_vec: &DocVector,
    field: &str,
) -> Result<Vec<Span>> {
    let mut spans = Vec::new();
    for child in children {
        spans.extend(child.highlight_spans(doc_vec, field)?);
    }
    Ok(spans)
}

/// Squared weight sum of a compound query's children, scaled by its boost.
pub(crate) fn children_sum_of_squared_weights(children: &[Box<dyn Compiler>], boost: f32) -> f32 {
    let sum: f32 = children.iter().map(|c| c.sum_of_squared_weights()).sum();
    sum * boost * boost
}
