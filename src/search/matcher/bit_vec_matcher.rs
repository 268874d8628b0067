use std::sync::Arc;

use crate::error::Result;
use crate::search::matcher::Matcher;
use crate::util::BitVector;

/// Iterates over the set bits of a bit vector.
#[derive(Debug, Clone)]
pub struct BitVecMatcher {
    bit_vec: Arc<BitVector>,
    doc_id: i32,
    exhausted: bool,
}

impl BitVecMatcher {
    pub fn new(bit_vec: Arc<BitVector>) -> Self {
        BitVecMatcher {
            bit_vec,
            doc_id: 0,
            exhausted: false,
        }
    }
}

impl Matcher for BitVecMatcher {
    fn next(&mut self) -> Result<i32> {
        let target = self.doc_id + 1;
        self.advance(target)
    }

    fn advance(&mut self, target: i32) -> Result<i32> {
        if self.exhausted {
            return Ok(0);
        }
        let from = target.max(self.doc_id + 1).max(1) as usize;
        match self.bit_vec.next_hit(from) {
            Some(hit) => self.doc_id = hit as i32,
            None => {
                self.exhausted = true;
                self.doc_id = 0;
            }
        }
        Ok(self.doc_id)
    }

    fn doc_id(&self) -> i32 {
        self.doc_id
    }

    fn score(&mut self) -> Result<f32> {
        Ok(0.0)
    }
}
