//! Cursors over the doc ids of one segment.

pub mod and_matcher;
pub mod bit_vec_matcher;
pub mod match_all_matcher;
pub mod not_matcher;
pub mod or_matcher;
pub mod phrase_matcher;
pub mod range_matcher;
pub mod req_opt_matcher;
pub mod series_matcher;
pub mod term_matcher;

use std::fmt;

pub use and_matcher::AndMatcher;
pub use bit_vec_matcher::BitVecMatcher;
pub use match_all_matcher::{MatchAllMatcher, NoMatchMatcher};
pub use not_matcher::NotMatcher;
pub use or_matcher::OrMatcher;
pub use phrase_matcher::PhraseMatcher;
pub use range_matcher::RangeMatcher;
pub use req_opt_matcher::RequiredOptionalMatcher;
pub use series_matcher::SeriesMatcher;
pub use term_matcher::TermMatcher;

use crate::error::Result;
use crate::search::collector::Collector;

/// A forward-only cursor over matching doc ids.
///
/// Doc ids start at 1; 0 means the matcher is exhausted.
pub trait Matcher: Send + fmt::Debug {
    /// Move to the next matching doc id.
    fn next(&mut self) -> Result<i32>;

    /// Move to the first matching doc id greater than or equal to `target`.
    /// The matcher always moves forward by at least one document.
    fn advance(&mut self, target: i32) -> Result<i32> {
        loop {
            let doc_id = self.next()?;
            if doc_id == 0 || doc_id >= target {
                return Ok(doc_id);
            }
        }
    }

    fn doc_id(&self) -> i32;

    /// Score of the current document.
    fn score(&mut self) -> Result<f32>;
}

impl Matcher for Box<dyn Matcher> {
    fn next(&mut self) -> Result<i32> {
        (**self).next()
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        (**self).advance(target)
    }

    fn doc_id(&self) -> i32 {
        (**self).doc_id()
    }

    fn score(&mut self) -> Result<f32> {
        (**self).score()
    }
}

/// Feed every doc id from `matcher` to `collector`, skipping those reported
/// by `deletions`.
///
/// The deletions cursor is only moved once `matcher` has passed it.
pub fn collect(
    matcher: &mut dyn Matcher,
    collector: &mut dyn Collector,
    mut deletions: Option<&mut dyn Matcher>,
) -> Result<()> {
    let need_score = collector.need_score();
    let mut next_deletion = if deletions.is_some() { 0 } else { i32::MAX };
    loop {
        let doc_id = matcher.next()?;
        if doc_id == 0 {
            break;
        }
        if doc_id > next_deletion
            && let Some(deletions) = deletions.as_deref_mut()
        {
            next_deletion = deletions.advance(doc_id)?;
            if next_deletion == 0 {
                next_deletion = i32::MAX;
            }
        }
        if doc_id == next_deletion {
            continue;
        }
        let score = if need_score { matcher.score()? } else { 0.0 };
        collector.collect(doc_id, score)?;
    }
    Ok(())
}
