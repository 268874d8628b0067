use crate::error::Result;
use crate::search::matcher::Matcher;
use crate::search::similarity::Similarity;

/// Walks the required matcher; the optional one only adds to the score.
#[derive(Debug)]
pub struct RequiredOptionalMatcher {
    required: Box<dyn Matcher>,
    optional: Option<Box<dyn Matcher>>,
    coord_factors: Vec<f32>,
    opt_first_time: bool,
}

impl RequiredOptionalMatcher {
    pub fn new(required: Box<dyn Matcher>, optional: Box<dyn Matcher>, sim: &Similarity) -> Self {
        RequiredOptionalMatcher {
            required,
            optional: Some(optional),
            coord_factors: sim.coord_factors(2),
            opt_first_time: true,
        }
    }
}

impl Matcher for RequiredOptionalMatcher {
    fn next(&mut self) -> Result<i32> {
        self.required.next()
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        self.required.advance(target)
    }

    fn doc_id(&self) -> i32 {
        self.required.doc_id()
    }

    fn score(&mut self) -> Result<f32> {
        let current = self.required.doc_id();

        // Bring the optional matcher up to the current doc, lazily.
        if let Some(optional) = self.optional.as_mut() {
            let behind = self.opt_first_time || optional.doc_id() < current;
            if behind && optional.advance(current)? == 0 {
                self.optional = None;
            }
        }
        self.opt_first_time = false;

        let req_score = self.required.score()?;
        match self.optional.as_mut() {
            Some(optional) if optional.doc_id() == current => {
                Ok((req_score + optional.score()?) * self.coord_factors[2])
            }
            _ => Ok(req_score * self.coord_factors[1]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::matcher::tests::{MockMatcher, drain};

    #[test]
    fn test_required_drives_iteration() {
        let mut matcher = RequiredOptionalMatcher::new(
            MockMatcher::boxed(&[1, 4, 9], 1.0),
            MockMatcher::boxed(&[2, 4, 5], 1.0),
            &Similarity::new(),
        );
        assert_eq!(drain(&mut matcher), vec![1, 4, 9]);
    }

    #[test]
    fn test_optional_adds_to_score() {
        let mut matcher = RequiredOptionalMatcher::new(
            MockMatcher::boxed(&[1, 4, 9], 2.0),
            MockMatcher::boxed(&[4], 2.0),
            &Similarity::new(),
        );
        assert_eq!(matcher.next().unwrap(), 1);
        assert_eq!(matcher.score().unwrap(), 1.0);
        assert_eq!(matcher.next().unwrap(), 4);
        assert_eq!(matcher.score().unwrap(), 4.0);
        assert_eq!(matcher.next().unwrap(), 9);
        assert_eq!(matcher.score().unwrap(), 1.0);
    }
}
