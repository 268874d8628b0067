use crate::error::Result;
use crate::search::matcher::Matcher;
use crate::search::similarity::Similarity;

/// Intersection of its children.
#[derive(Debug)]
pub struct AndMatcher {
    kids: Vec<Box<dyn Matcher>>,
    coord_factors: Vec<f32>,
    first_time: bool,
    more: bool,
}

impl AndMatcher {
    pub fn new(kids: Vec<Box<dyn Matcher>>, sim: &Similarity) -> Self {
        AndMatcher {
            coord_factors: sim.coord_factors(kids.len()),
            more: !kids.is_empty(),
            first_time: true,
            kids,
        }
    }

    fn exhaust(&mut self) -> Result<i32> {
        self.more = false;
        Ok(0)
    }
}

impl Matcher for AndMatcher {
    fn next(&mut self) -> Result<i32> {
        if self.first_time {
            return self.advance(1);
        }
        if !self.more {
            return Ok(0);
        }
        let target = self.kids[0].doc_id() + 1;
        self.advance(target)
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        if !self.more {
            return Ok(0);
        }
        self.first_time = false;
        let mut target = target;

        // The first child sets the bar.
        let mut highest = self.kids[0].advance(target)?;
        if highest == 0 {
            return self.exhaust();
        }

        loop {
            for kid in self.kids.iter_mut() {
                let candidate = kid.doc_id();
                if highest < candidate {
                    highest = candidate;
                }
                if target < highest {
                    target = highest;
                }
                if candidate < target {
                    // This child now holds the highest doc id.
                    highest = kid.advance(target)?;
                    if highest == 0 {
                        self.more = false;
                        return Ok(0);
                    }
                }
            }

            let agreement = self.kids.iter().all(|kid| kid.doc_id() == highest);
            if agreement && highest >= target {
                return Ok(highest);
            }
        }
    }

    fn doc_id(&self) -> i32 {
        if self.more {
            self.kids.first().map_or(0, |kid| kid.doc_id())
        } else {
            0
        }
    }

    fn score(&mut self) -> Result<f32> {
        let mut score = 0.0;
        for kid in self.kids.iter_mut() {
            score += kid.score()?;
        }
        Ok(score * self.coord_factors[self.kids.len()])
    }
}
