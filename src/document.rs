//! Documents and the values stored in their fields.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::store::{InStream, OutStream};

/// Primitive type ids, shared by field types and the doc store encoding.
pub mod primitive {
    pub const TEXT: u8 = 1;
    pub const BLOB: u8 = 2;
    pub const INT32: u8 = 3;
    pub const INT64: u8 = 4;
    pub const FLOAT32: u8 = 5;
    pub const FLOAT64: u8 = 6;
}

/// The value of one document field.
///
/// Values have a total order: first by variant, then by content, with
/// floats compared through `total_cmp`. This lets them serve directly as
/// sort keys and range bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Blob(Vec<u8>),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl FieldValue {
    pub fn primitive_id(&self) -> u8 {
        match self {
            FieldValue::Text(_) => primitive::TEXT,
            FieldValue::Blob(_) => primitive::BLOB,
            FieldValue::I32(_) => primitive::INT32,
            FieldValue::I64(_) => primitive::INT64,
            FieldValue::F32(_) => primitive::FLOAT32,
            FieldValue::F64(_) => primitive::FLOAT64,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::I32(v) => Some(*v as i64),
            FieldValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::F32(v) => Some(*v as f64),
            FieldValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Serialize as a primitive tag followed by the payload.
    pub fn write_to(&self, out: &mut OutStream) -> Result<()> {
        out.write_u8(self.primitive_id())?;
        match self {
            FieldValue::Text(s) => out.write_string(s),
            FieldValue::Blob(b) => out.write_blob(b),
            FieldValue::I32(v) => out.write_i32(*v),
            FieldValue::I64(v) => out.write_i64(*v),
            FieldValue::F32(v) => out.write_f32(*v),
            FieldValue::F64(v) => out.write_f64(*v),
        }
    }

    /// Inverse of [`FieldValue::write_to`].
    pub fn read_from(input: &mut InStream) -> Result<FieldValue> {
        let tag = input.read_u8()?;
        Ok(match tag {
            primitive::TEXT => FieldValue::Text(input.read_string()?),
            primitive::BLOB => FieldValue::Blob(input.read_blob()?),
            primitive::INT32 => FieldValue::I32(input.read_i32()?),
            primitive::INT64 => FieldValue::I64(input.read_i64()?),
            primitive::FLOAT32 => FieldValue::F32(input.read_f32()?),
            primitive::FLOAT64 => FieldValue::F64(input.read_f64()?),
            other => {
                return Err(IndexError::format(format!(
                    "Unknown value tag {other} in '{}'",
                    input.filename()
                )));
            }
        })
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use FieldValue::*;
        match (self, other) {
            (Text(a), Text(b)) => a.cmp(b),
            (Blob(a), Blob(b)) => a.cmp(b),
            (I32(a), I32(b)) => a.cmp(b),
            (I64(a), I64(b)) => a.cmp(b),
            (F32(a), F32(b)) => a.total_cmp(b),
            (F64(a), F64(b)) => a.total_cmp(b),
            _ => self.primitive_id().cmp(&other.primitive_id()),
        }
    }
}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.primitive_id().hash(state);
        match self {
            FieldValue::Text(s) => s.hash(state),
            FieldValue::Blob(b) => b.hash(state),
            FieldValue::I32(v) => v.hash(state),
            FieldValue::I64(v) => v.hash(state),
            FieldValue::F32(v) => v.to_bits().hash(state),
            FieldValue::F64(v) => v.to_bits().hash(state),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Blob(b)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::I32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::I64(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::F32(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::F64(v)
    }
}

/// A document: field names mapped to values, kept in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    fields: BTreeMap<String, FieldValue>,
}

impl Doc {
    pub fn new() -> Self {
        Doc::default()
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn store(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A stored document as returned by a reader, tagged with its doc id.
#[derive(Debug, Clone, PartialEq)]
pub struct HitDoc {
    pub doc_id: i32,
    pub score: f32,
    pub doc: Doc,
}

impl HitDoc {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.doc.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_ordering() {
        assert!(FieldValue::from("a") < FieldValue::from("b"));
        assert!(FieldValue::from(-1.5f64) < FieldValue::from(0.0f64));
        assert!(FieldValue::from("zzz") < FieldValue::from(vec![0u8]), "text sorts before blob");
        assert_eq!(FieldValue::from(f32::NAN), FieldValue::from(f32::NAN));
        assert_ne!(FieldValue::I32(1), FieldValue::I64(1));
    }

    #[test]
    fn test_doc_builder() {
        let doc = Doc::new()
            .with_field("title", "Lorem ipsum")
            .with_field("year", 2009i32);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.field_names(), vec!["title", "year"]);
        assert_eq!(doc.get("year").and_then(FieldValue::as_i64), Some(2009));
        assert!(doc.get("missing").is_none());
    }
}
