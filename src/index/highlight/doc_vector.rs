use std::collections::BTreeMap;

use crate::error::{IndexError, Result};
use crate::store::InStream;

/// The positions and character offsets of one term within one field of
/// one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVector {
    field: String,
    text: String,
    positions: Vec<i32>,
    start_offsets: Vec<i32>,
    end_offsets: Vec<i32>,
}

impl TermVector {
    pub fn new<F: Into<String>, T: Into<String>>(
        field: F,
        text: T,
        positions: Vec<i32>,
        start_offsets: Vec<i32>,
        end_offsets: Vec<i32>,
    ) -> Result<Self> {
        if start_offsets.len() != positions.len() || end_offsets.len() != positions.len() {
            return Err(IndexError::format(format!(
                "Unbalanced term vector arrays: {} {} {}",
                positions.len(),
                start_offsets.len(),
                end_offsets.len()
            )));
        }
        Ok(TermVector {
            field: field.into(),
            text: text.into(),
            positions,
            start_offsets,
            end_offsets,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn positions(&self) -> &[i32] {
        &self.positions
    }

    pub fn start_offsets(&self) -> &[i32] {
        &self.start_offsets
    }

    pub fn end_offsets(&self) -> &[i32] {
        &self.end_offsets
    }
}

/// The term vectors of every highlightable field of one document, kept in
/// their encoded form until a term is asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocVector {
    field_bufs: BTreeMap<String, Vec<u8>>,
}

impl DocVector {
    pub fn new() -> Self {
        DocVector::default()
    }

    pub fn add_field_buf<S: Into<String>>(&mut self, field: S, buf: Vec<u8>) {
        self.field_bufs.insert(field.into(), buf);
    }

    pub fn field_buf(&self, field: &str) -> Option<&[u8]> {
        self.field_bufs.get(field).map(Vec::as_slice)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.field_bufs.keys().map(String::as_str)
    }

    /// The vector for `term` in `field`, or `None` if the field was not
    /// highlightable or does not contain the term.
    pub fn term_vector(&self, field: &str, term: &str) -> Result<Option<TermVector>> {
        let Some(buf) = self.field_bufs.get(field) else {
            return Ok(None);
        };
        let mut found = None;
        decode_field_buf(field, buf, |text| text == term, |tv| found = Some(tv))?;
        Ok(found)
    }

    /// Every term vector of `field`, in term order.
    pub fn term_vectors(&self, field: &str) -> Result<Vec<TermVector>> {
        let mut vectors = Vec::new();
        if let Some(buf) = self.field_bufs.get(field) {
            decode_field_buf(field, buf, |_| true, |tv| vectors.push(tv))?;
        }
        Ok(vectors)
    }
}

/// Walk an encoded field buffer, materializing the terms `wanted` accepts.
fn decode_field_buf(
    field: &str,
    buf: &[u8],
    wanted: impl Fn(&str) -> bool,
    mut emit: impl FnMut(TermVector),
) -> Result<()> {
    let mut input = InStream::from_vec(format!("term vector for '{field}'"), buf.to_vec());
    let num_terms = input.read_c32()?;
    let mut text: Vec<u8> = Vec::new();
    for _ in 0..num_terms {
        let overlap = input.read_c32()? as usize;
        let len = input.read_c32()? as usize;
        if overlap > text.len() {
            return Err(IndexError::format(format!(
                "Corrupt term vector for '{field}': overlap {overlap} exceeds previous term"
            )));
        }
        text.truncate(overlap);
        text.extend_from_slice(&input.read_bytes(len)?);
        let term = std::str::from_utf8(&text).map_err(|e| {
            IndexError::format(format!("Invalid UTF-8 in term vector for '{field}': {e}"))
        })?;

        let num_pos = input.read_c32()? as usize;
        let keep = wanted(term);
        let mut positions = Vec::with_capacity(if keep { num_pos } else { 0 });
        let mut starts = Vec::with_capacity(positions.capacity());
        let mut ends = Vec::with_capacity(positions.capacity());
        for _ in 0..num_pos {
            let pos = input.read_c32()? as i32;
            let start = input.read_c32()? as i32;
            let end = input.read_c32()? as i32;
            if keep {
                positions.push(pos);
                starts.push(start);
                ends.push(end);
            }
        }
        if keep {
            emit(TermVector::new(field, term, positions, starts, ends)?);
        }
    }
    if input.bytes_remaining() != 0 {
        return Err(IndexError::format(format!(
            "Trailing bytes after term vector for '{field}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Inversion;
    use crate::analysis::token::Token;
    use crate::index::highlight::writer::term_vector_buf;

    fn inverted(words: &[&str]) -> Inversion {
        let mut inversion = Inversion::new();
        let mut offset = 0;
        for word in words {
            inversion
                .append(Token::new(*word, offset, offset + word.len() as u32))
                .unwrap();
            offset += word.len() as u32 + 1;
        }
        inversion.invert().unwrap();
        inversion
    }

    #[test]
    fn test_term_vectors_decode_in_term_order() {
        let mut doc_vec = DocVector::new();
        doc_vec.add_field_buf("body", term_vector_buf(&inverted(&["car", "cart", "car"])));

        let vectors = doc_vec.term_vectors("body").unwrap();
        let texts: Vec<&str> = vectors.iter().map(TermVector::text).collect();
        assert_eq!(texts, vec!["car", "cart"]);
        assert_eq!(vectors[0].positions(), &[0, 2]);
        assert_eq!(vectors[0].start_offsets(), &[0, 9]);
        assert_eq!(vectors[1].end_offsets(), &[8]);

        assert_eq!(doc_vec.term_vector("body", "cart").unwrap().as_ref(), Some(&vectors[1]));
        assert!(doc_vec.term_vector("body", "ca").unwrap().is_none());
        assert!(doc_vec.term_vectors("missing").unwrap().is_empty());
    }

    #[test]
    fn test_unbalanced_arrays_are_a_format_error() {
        let err = TermVector::new("body", "x", vec![1, 2], vec![0, 4], vec![3]).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_truncated_buffer_is_rejected() {
        let mut buf = term_vector_buf(&inverted(&["alpha", "beta"]));
        buf.pop();
        let mut doc_vec = DocVector::new();
        doc_vec.add_field_buf("body", buf.clone());
        assert!(doc_vec.term_vectors("body").is_err());

        buf.push(0);
        buf.push(0);
        doc_vec.add_field_buf("body", buf);
        assert!(doc_vec.term_vectors("body").is_err(), "trailing bytes");
    }
}
