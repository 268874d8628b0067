use crate::error::Result;
use crate::search::matcher::Matcher;

/// Every doc id up to `doc_max` which the negated matcher does not report.
#[derive(Debug)]
pub struct NotMatcher {
    negated: Option<Box<dyn Matcher>>,
    doc_id: i32,
    doc_max: i32,
    exhausted: bool,
    next_negation: i32,
}

impl NotMatcher {
    pub fn new(negated: Box<dyn Matcher>, doc_max: i32) -> Self {
        NotMatcher {
            negated: Some(negated),
            doc_id: 0,
            doc_max,
            exhausted: false,
            next_negation: 0,
        }
    }
}

impl Matcher for NotMatcher {
    fn next(&mut self) -> Result<i32> {
        if self.exhausted {
            return Ok(0);
        }
        loop {
            self.doc_id += 1;
            if self.next_negation < self.doc_id {
                self.next_negation = match self.negated.as_mut() {
                    Some(negated) => negated.advance(self.doc_id)?,
                    None => 0,
                };
                if self.next_negation == 0 {
                    // Nothing left to exclude.
                    self.negated = None;
                    self.next_negation = self.doc_max + 1;
                }
            }
            if self.doc_id > self.doc_max {
                self.doc_id = self.doc_max;
                self.exhausted = true;
                return Ok(0);
            }
            if self.doc_id != self.next_negation {
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
    use crate::search::matcher::tests::{MockMatcher, drain};

    #[test]
    fn test_negation() {
        let mut matcher = NotMatcher::new(MockMatcher::boxed(&[2, 3, 7], 1.0), 8);
        assert_eq!(drain(&mut matcher), vec![1, 4, 5, 6, 8]);
        assert_eq!(matcher.next().unwrap(), 0);
    }

    #[test]
    fn test_advance_and_empty_negation() {
        let mut matcher = NotMatcher::new(MockMatcher::boxed(&[5], 1.0), 6);
        assert_eq!(matcher.advance(5).unwrap(), 6);
        assert_eq!(matcher.next().unwrap(), 0);

        let mut matcher = NotMatcher::new(MockMatcher::boxed(&[], 1.0), 3);
        assert_eq!(drain(&mut matcher), vec![1, 2, 3]);
    }

    #[test]
    fn test_doc_id_is_zero_once_exhausted() {
        let mut matcher = NotMatcher::new(MockMatcher::boxed(&[1], 1.0), 3);
        assert_eq!(matcher.advance(3).unwrap(), 3);
        assert_eq!(matcher.doc_id(), 3);
        assert_eq!(matcher.next().unwrap(), 0);
        assert_eq!(matcher.doc_id(), 0);
        assert_eq!(matcher.advance(2).unwrap(), 0);
        assert_eq!(matcher.doc_id(), 0);
    }
}
