use crate::error::Result;
use crate::store::InStream;
use crate::util::varint;

/// One document's occurrences of a term, with the positions already
/// encoded as they will appear in the posting file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPosting {
    pub doc_id: i32,
    pub freq: u32,
    /// Position deltas, one varint per occurrence.
    pub aux: Vec<u8>,
}

impl RawPosting {
    /// Build a posting from absolute, ascending positions.
    pub fn new(doc_id: i32, positions: &[u32]) -> Self {
        let mut aux = Vec::with_capacity(positions.len());
        let mut last = 0;
        for &pos in positions {
            varint::encode_into((pos - last) as u64, &mut aux);
            last = pos;
        }
        RawPosting {
            doc_id,
            freq: positions.len() as u32,
            aux,
        }
    }

    /// Decode the absolute positions.
    pub fn positions(&self) -> Result<Vec<u32>> {
        let mut input = InStream::from_vec("aux", self.aux.clone());
        read_positions(&mut input, self.freq)
    }
}

pub(crate) fn read_positions(input: &mut InStream, freq: u32) -> Result<Vec<u32>> {
    let mut positions = Vec::with_capacity(freq as usize);
    let mut pos = 0;
    for _ in 0..freq {
        pos += input.read_c32()?;
        positions.push(pos);
    }
    Ok(positions)
}
