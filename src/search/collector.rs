//! Collectors receive the doc ids a matcher produces.

use std::sync::Arc;

use crate::error::Result;
use crate::index::seg_reader::SegReader;
use crate::util::BitVector;

/// Receives matching documents from [`crate::search::collect`].
///
/// Doc ids passed to [`Collector::collect`] are local to the segment most
/// recently announced through [`Collector::set_reader`]; adding the value
/// given to [`Collector::set_base`] makes them index-wide.
pub trait Collector: Send {
    fn collect(&mut self, doc_id: i32, score: f32) -> Result<()>;

    /// Whether matchers have to compute scores for this collector.
    fn need_score(&self) -> bool;

    fn set_reader(&mut self, _reader: &Arc<SegReader>) {}

    fn set_base(&mut self, _base: i32) {}
}

/// Records every hit in a bit vector.
#[derive(Debug, Clone, Default)]
pub struct BitCollector {
    bit_vec: BitVector,
    base: i32,
}

impl BitCollector {
    pub fn new(capacity: usize) -> Self {
        BitCollector {
            bit_vec: BitVector::new(capacity),
            base: 0,
        }
    }

    pub fn bit_vector(&self) -> &BitVector {
        &self.bit_vec
    }

    pub fn into_bit_vector(self) -> BitVector {
        self.bit_vec
    }
}

impl Collector for BitCollector {
    fn collect(&mut self, doc_id: i32, _score: f32) -> Result<()> {
        self.bit_vec.set((doc_id + self.base) as usize);
        Ok(())
    }

    fn need_score(&self) -> bool {
        false
    }

    fn set_base(&mut self, base: i32) {
        self.base = base;
    }
}

/// Shifts every doc id by a fixed offset before handing it on.
pub struct OffsetCollector<'a> {
    inner: &'a mut dyn Collector,
    offset: i32,
}

impl<'a> OffsetCollector<'a> {
    pub fn new(inner: &'a mut dyn Collector, offset: i32) -> Self {
        OffsetCollector { inner, offset }
    }
}

impl Collector for OffsetCollector<'_> {
    fn collect(&mut self, doc_id: i32, score: f32) -> Result<()> {
        self.inner.collect(doc_id + self.offset, score)
    }

    fn need_score(&self) -> bool {
        self.inner.need_score()
    }

    fn set_reader(&mut self, reader: &Arc<SegReader>) {
        self.inner.set_reader(reader);
    }

    fn set_base(&mut self, base: i32) {
        self.inner.set_base(base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_collector_applies_base() {
        let mut collector = BitCollector::new(8);
        collector.collect(2, 0.0).unwrap();
        collector.set_base(10);
        collector.collect(2, 0.0).unwrap();
        let hits: Vec<usize> = collector.bit_vector().iter_ones().collect();
        assert_eq!(hits, vec![2, 12]);
    }

    #[test]
    fn test_offset_collector() {
        let mut inner = BitCollector::new(8);
        {
            let mut offset = OffsetCollector::new(&mut inner, 5);
            assert!(!offset.need_score());
            offset.collect(1, 0.0).unwrap();
        }
        assert!(inner.bit_vector().get(6));
    }
}
