use std::sync::Arc;

use crate::error::Result;
use crate::index::sort::SortCache;
use crate::search::matcher::Matcher;

/// Documents whose sort ordinal lies within `[lower_bound, upper_bound]`.
#[derive(Debug)]
pub struct RangeMatcher {
    sort_cache: Arc<SortCache>,
    lower_bound: i32,
    upper_bound: i32,
    doc_id: i32,
    doc_max: i32,
    exhausted: bool,
}

impl RangeMatcher {
    pub fn new(sort_cache: Arc<SortCache>, lower_bound: i32, upper_bound: i32, doc_max: i32) -> Self {
        RangeMatcher {
            sort_cache,
            // Ordinal 0 marks a missing value and never matches.
            lower_bound: lower_bound.max(1),
            upper_bound,
            doc_id: 0,
            doc_max,
            exhausted: false,
        }
    }
}

impl Matcher for RangeMatcher {
    fn next(&mut self) -> Result<i32> {
        if self.exhausted {
            return Ok(0);
        }
        loop {
            self.doc_id += 1;
            if self.doc_id > self.doc_max {
                self.doc_id = self.doc_max;
                self.exhausted = true;
                return Ok(0);
            }
            let ord = self.sort_cache.ordinal(self.doc_id);
            if ord >= self.lower_bound && ord <= self.upper_bound {
                return Ok(self.doc_id);
            }
        }
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        self.doc_id = self.doc_id.max(target - 1);
        self.next()
    }

    fn doc_id(&self) -> i32 {
        if self.exhausted { 0 } else { self.doc_id }
    }

    fn score(&mut self) -> Result<f32> {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldValue;
    use crate::search::matcher::tests::drain;

    #[test]
    fn test_scans_ordinals() {
        let values = vec![FieldValue::I32(10), FieldValue::I32(20), FieldValue::I32(30)];
        let cache = Arc::new(SortCache::new("price", vec![0, 3, 0, 1, 2, 2, 3], values));
        let mut matcher = RangeMatcher::new(cache.clone(), 2, 3, 6);
        assert_eq!(drain(&mut matcher), vec![1, 4, 5, 6]);

        let mut matcher = RangeMatcher::new(cache, 0, 1, 6);
        assert_eq!(drain(&mut matcher), vec![3], "missing values are excluded");
    }

    #[test]
    fn test_doc_id_is_zero_once_exhausted() {
        let values = vec![FieldValue::I32(1), FieldValue::I32(2)];
        let cache = Arc::new(SortCache::new("price", vec![0, 1, 2], values));
        let mut matcher = RangeMatcher::new(cache, 1, 1, 2);
        assert_eq!(matcher.next().unwrap(), 1);
        assert_eq!(matcher.doc_id(), 1);
        assert_eq!(matcher.next().unwrap(), 0);
        assert_eq!(matcher.doc_id(), 0, "doc_max must not leak out");
        assert_eq!(matcher.advance(1).unwrap(), 0);
        assert_eq!(matcher.doc_id(), 0);
    }
}
