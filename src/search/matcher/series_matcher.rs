use crate::error::Result;
use crate::search::matcher::Matcher;

/// Concatenates per-segment matchers into one stream of index-wide doc ids.
///
/// `offsets[i]` is added to every doc id of `matchers[i]`. Segment `i` owns
/// the ids in `offsets[i] + 1 ..= offsets[i + 1]`.
#[derive(Debug)]
pub struct SeriesMatcher {
    matchers: Vec<Option<Box<dyn Matcher>>>,
    offsets: Vec<i32>,
    tick: usize,
    current: Option<usize>,
    current_end: i32,
    doc_id: i32,
    done: bool,
}

impl SeriesMatcher {
    pub fn new(matchers: Vec<Option<Box<dyn Matcher>>>, offsets: Vec<i32>) -> Self {
        SeriesMatcher {
            done: matchers.is_empty(),
            matchers,
            offsets,
            tick: 0,
            current: None,
            current_end: 0,
            doc_id: 0,
        }
    }
}

impl Matcher for SeriesMatcher {
    fn next(&mut self) -> Result<i32> {
        let target = self.doc_id + 1;
        self.advance(target)
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        let mut target = target.max(self.doc_id + 1);
        while !self.done {
            if let Some(idx) = self.current
                && target <= self.current_end
            {
                let offset = self.offsets[idx];
                let found = match self.matchers[idx].as_mut() {
                    Some(matcher) => matcher.advance(target - offset)?,
                    None => 0,
                };
                if found != 0 {
                    self.doc_id = found + offset;
                    return Ok(self.doc_id);
                }
                if self.tick >= self.matchers.len() {
                    break;
                }
                target = self.current_end + 1;
            }

            // Move on to the next segment that has a matcher.
            if self.tick >= self.matchers.len() {
                break;
            }
            let idx = self.tick;
            self.tick += 1;
            self.current = Some(idx);
            self.current_end = match self.offsets.get(idx + 1) {
                Some(&end) if idx + 1 < self.matchers.len() => end,
                _ => i32::MAX,
            };
            target = target.max(self.offsets[idx] + 1);
        }
        self.done = true;
        self.doc_id = 0;
        Ok(0)
    }

    fn doc_id(&self) -> i32 {
        self.doc_id
    }

    fn score(&mut self) -> Result<f32> {
        match self.current.and_then(|idx| self.matchers[idx].as_mut()) {
            Some(matcher) => matcher.score(),
            None => Ok(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::matcher::tests::{MockMatcher, drain};

    #[test]
    fn test_concatenates_with_offsets() {
        let matchers = vec![
            Some(MockMatcher::boxed(&[1, 3], 1.0)),
            None,
            Some(MockMatcher::boxed(&[2, 4], 1.0)),
        ];
        // Segments own ids 1..=3, 4..=5 and 6..
        let mut matcher = SeriesMatcher::new(matchers, vec![0, 3, 5]);
        assert_eq!(drain(&mut matcher), vec![1, 3, 7, 9]);
        assert_eq!(matcher.next().unwrap(), 0);
    }

    #[test]
    fn test_last_doc_of_segment_is_kept() {
        let matchers = vec![
            Some(MockMatcher::boxed(&[3], 1.0)),
            Some(MockMatcher::boxed(&[1], 1.0)),
        ];
        let mut matcher = SeriesMatcher::new(matchers, vec![0, 3]);
        assert_eq!(drain(&mut matcher), vec![3, 4]);
    }

    #[test]
    fn test_advance_across_segments() {
        let matchers = vec![
            Some(MockMatcher::boxed(&[1, 2], 1.0)),
            Some(MockMatcher::boxed(&[1, 5], 1.0)),
        ];
        let mut matcher = SeriesMatcher::new(matchers, vec![0, 10]);
        assert_eq!(matcher.advance(3).unwrap(), 11);
        assert_eq!(matcher.advance(12).unwrap(), 15);
        assert_eq!(matcher.next().unwrap(), 0);
    }
}
