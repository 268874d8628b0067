//! Shared utility modules used across the index core.

pub mod base36;
pub mod bit_vector;
pub mod varint;

pub use bit_vector::BitVector;
