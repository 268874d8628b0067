use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::search::matcher::Matcher;
use crate::search::similarity::Similarity;

/// Union of its children.
///
/// Children that are not on the current doc wait in a min-heap keyed by
/// their doc id; the ones on the current doc are kept in `matching`.
#[derive(Debug)]
pub struct OrMatcher {
    kids: Vec<Box<dyn Matcher>>,
    coord_factors: Vec<f32>,
    heap: BinaryHeap<Reverse<(i32, usize)>>,
    matching: Vec<usize>,
    doc_id: i32,
    started: bool,
}

impl OrMatcher {
    pub fn new(kids: Vec<Box<dyn Matcher>>, sim: &Similarity) -> Self {
        OrMatcher {
            coord_factors: sim.coord_factors(kids.len()),
            heap: BinaryHeap::with_capacity(kids.len()),
            matching: Vec::with_capacity(kids.len()),
            doc_id: 0,
            started: false,
            kids,
        }
    }

    fn push(&mut self, idx: usize, doc_id: i32) {
        if doc_id != 0 {
            self.heap.push(Reverse((doc_id, idx)));
        }
    }

    /// Pop every child sitting on the lowest doc id.
    fn pop_matching(&mut self) -> i32 {
        self.matching.clear();
        let Some(Reverse((doc_id, idx))) = self.heap.pop() else {
            self.doc_id = 0;
            return 0;
        };
        self.matching.push(idx);
        while let Some(&Reverse((next_doc, next_idx))) = self.heap.peek() {
            if next_doc != doc_id {
                break;
            }
            self.heap.pop();
            self.matching.push(next_idx);
        }
        self.doc_id = doc_id;
        doc_id
    }
}

impl Matcher for OrMatcher {
    fn next(&mut self) -> Result<i32> {
        if !self.started {
            self.started = true;
            for idx in 0..self.kids.len() {
                let doc_id = self.kids[idx].next()?;
                self.push(idx, doc_id);
            }
        } else {
            let matching = std::mem::take(&mut self.matching);
            for &idx in &matching {
                let doc_id = self.kids[idx].next()?;
                self.push(idx, doc_id);
            }
            self.matching = matching;
        }
        Ok(self.pop_matching())
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        if self.started && target <= self.doc_id {
            return self.next();
        }
        if !self.started {
            self.started = true;
            for idx in 0..self.kids.len() {
                let doc_id = self.kids[idx].advance(target)?;
                self.push(idx, doc_id);
            }
        } else {
            let matching = std::mem::take(&mut self.matching);
            for &idx in &matching {
                let doc_id = self.kids[idx].advance(target)?;
                self.push(idx, doc_id);
            }
            self.matching = matching;
            while let Some(&Reverse((doc_id, idx))) = self.heap.peek() {
                if doc_id >= target {
                    break;
                }
                self.heap.pop();
                let doc_id = self.kids[idx].advance(target)?;
                self.push(idx, doc_id);
            }
        }
        Ok(self.pop_matching())
    }

    fn doc_id(&self) -> i32 {
        self.doc_id
    }

    fn score(&mut self) -> Result<f32> {
        let mut score = 0.0;
        for &idx in &self.matching {
            score += self.kids[idx].score()?;
        }
        Ok(score * self.coord_factors[self.matching.len()])
    }
}
