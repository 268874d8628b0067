//! Growable bit set used for deletions and bulk collection.

use bit_vec::BitVec;

/// A growable set of small non-negative integers.
///
/// Bits beyond the current capacity read as unset; setting one grows the
/// vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitVector {
    bits: BitVec,
}

impl BitVector {
    /// Create a bit vector able to hold `capacity` bits without growing.
    pub fn new(capacity: usize) -> Self {
        BitVector {
            bits: BitVec::from_elem(capacity, false),
        }
    }

    /// Rebuild a bit vector from its serialized bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        BitVector {
            bits: BitVec::from_bytes(bytes),
        }
    }

    /// Serialize to bytes, padding the final byte with zeros.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits.to_bytes()
    }

    /// Serialize to exactly `byte_size` bytes.
    pub fn to_bytes_sized(&self, byte_size: usize) -> Vec<u8> {
        let mut bytes = self.to_bytes();
        bytes.resize(byte_size, 0);
        bytes
    }

    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Grow to hold at least `capacity` bits.
    pub fn grow(&mut self, capacity: usize) {
        if capacity > self.bits.len() {
            let extra = capacity - self.bits.len();
            self.bits.grow(extra, false);
        }
    }

    pub fn get(&self, tick: usize) -> bool {
        self.bits.get(tick).unwrap_or(false)
    }

    pub fn set(&mut self, tick: usize) {
        if tick >= self.bits.len() {
            self.grow(tick + 1);
        }
        self.bits.set(tick, true);
    }

    pub fn clear(&mut self, tick: usize) {
        if tick < self.bits.len() {
            self.bits.set(tick, false);
        }
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|bit| *bit).count()
    }

    /// First set bit at or after `tick`.
    pub fn next_hit(&self, tick: usize) -> Option<usize> {
        (tick..self.bits.len()).find(|&i| self.bits[i])
    }

    /// Union with another bit vector.
    pub fn or(&mut self, other: &BitVector) {
        if other.capacity() > self.capacity() {
            self.grow(other.capacity());
        }
        let mut padded = other.bits.clone();
        if padded.len() < self.bits.len() {
            padded.grow(self.bits.len() - padded.len(), false);
        }
        self.bits.or(&padded);
    }

    /// Iterate over the set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, bit)| bit.then_some(i))
    }
}
