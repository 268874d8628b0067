//! Per-segment metadata: document count, field numbers and the metadata
//! blocks written by each component, persisted as `segmeta.json`.

use std::cmp::Ordering;

use ahash::AHashMap;
use serde_json::{Map, Value, json};

use crate::error::{IndexError, Result};
use crate::index::file_names::SEGMENT_PREFIX;
use crate::store::Folder;
use crate::store::compound::json_to_i64;
use crate::util::base36::{from_base36, to_base36};

pub const SEGMETA_FILE: &str = "segmeta.json";

#[derive(Debug, Clone)]
pub struct Segment {
    number: u64,
    name: String,
    count: i64,
    by_num: Vec<String>,
    by_name: AHashMap<String, i32>,
    metadata: Map<String, Value>,
}

impl Segment {
    pub fn new(number: u64) -> Self {
        Segment {
            number,
            name: Segment::num_to_name(number),
            count: 0,
            // Field numbers start at 1.
            by_num: vec![String::new()],
            by_name: AHashMap::new(),
            metadata: Map::new(),
        }
    }

    pub fn num_to_name(number: u64) -> String {
        format!("{SEGMENT_PREFIX}{}", to_base36(number))
    }

    /// True for names of the form `seg_<alphanumerics>`.
    pub fn valid_seg_name(name: &str) -> bool {
        name.strip_prefix(SEGMENT_PREFIX)
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()))
    }

    /// Number encoded in a segment name.
    pub fn name_to_num(name: &str) -> Option<u64> {
        name.strip_prefix(SEGMENT_PREFIX).and_then(from_base36)
    }

    /// Load `<name>/segmeta.json`.
    pub fn read(folder: &dyn Folder, name: &str) -> Result<Segment> {
        let number = Segment::name_to_num(name)
            .ok_or_else(|| IndexError::invalid_argument(format!("Invalid segment name '{name}'")))?;
        let mut segment = Segment::new(number);
        segment.read_file(folder)?;
        Ok(segment)
    }

    pub fn read_file(&mut self, folder: &dyn Folder) -> Result<()> {
        let path = format!("{}/{SEGMETA_FILE}", self.name);
        let metadata: Value = folder.read_json(&path)?;
        let Value::Object(metadata) = metadata else {
            return Err(IndexError::format(format!("'{path}' is not a JSON object")));
        };
        let my_meta = metadata
            .get("segmeta")
            .and_then(Value::as_object)
            .ok_or_else(|| IndexError::format(format!("Missing 'segmeta' in '{path}'")))?;

        let count = my_meta
            .get("count")
            .or_else(|| my_meta.get("doc_count"))
            .and_then(json_to_i64)
            .ok_or_else(|| IndexError::format("Missing 'count'"))?;
        let field_names = my_meta
            .get("field_names")
            .and_then(Value::as_array)
            .ok_or_else(|| IndexError::format("Failed to extract 'field_names' from metadata"))?;

        self.count = count;
        self.by_num = Vec::with_capacity(field_names.len());
        self.by_name = AHashMap::with_capacity(field_names.len());
        for name in field_names {
            let name = name
                .as_str()
                .ok_or_else(|| IndexError::format("Non-string entry in 'field_names'"))?;
            if self.by_num.is_empty() {
                self.by_num.push(name.to_string());
            } else {
                self.add_field(name);
            }
        }
        if self.by_num.is_empty() {
            self.by_num.push(String::new());
        }
        self.metadata = metadata;
        Ok(())
    }

    /// Write `<name>/segmeta.json`.
    pub fn write_file(&mut self, folder: &dyn Folder) -> Result<()> {
        let my_meta = json!({
            "count": self.count,
            "name": self.name,
            "field_names": self.by_num,
            "format": 1,
        });
        self.metadata.insert("segmeta".to_string(), my_meta);
        let path = format!("{}/{SEGMETA_FILE}", self.name);
        folder.write_json(&path, &self.metadata)
    }

    /// Field number for `field`, assigning the next one if necessary.
    pub fn add_field(&mut self, field: &str) -> i32 {
        if let Some(num) = self.by_name.get(field) {
            return *num;
        }
        let num = self.by_num.len() as i32;
        self.by_name.insert(field.to_string(), num);
        self.by_num.push(field.to_string());
        num
    }

    /// Field number for `field`, or 0 if the segment doesn't know it.
    pub fn field_num(&self, field: &str) -> i32 {
        self.by_name.get(field).copied().unwrap_or(0)
    }

    pub fn field_name(&self, field_num: i32) -> Option<&str> {
        if field_num <= 0 {
            return None;
        }
        self.by_num.get(field_num as usize).map(String::as_str)
    }

    /// Field names in field number order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.by_num.iter().skip(1).map(String::as_str)
    }

    pub fn num_fields(&self) -> usize {
        self.by_num.len() - 1
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn set_count(&mut self, count: i64) {
        self.count = count;
    }

    pub fn increment_count(&mut self, increment: i64) -> i64 {
        self.count += increment;
        self.count
    }

    /// Register a component metadata block. Each key may be stored once.
    pub fn store_metadata(&mut self, key: &str, value: Value) -> Result<()> {
        if self.metadata.contains_key(key) {
            return Err(IndexError::contract(format!(
                "Metadata key '{key}' already registered"
            )));
        }
        self.metadata.insert(key.to_string(), value);
        Ok(())
    }

    pub fn fetch_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Order by segment number.
    pub fn compare(&self, other: &Segment) -> Ordering {
        self.number.cmp(&other.number)
    }
}
