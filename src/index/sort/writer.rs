use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use serde_json::{Map, Value, json};

use crate::document::FieldValue;
use crate::error::{IndexError, Result};
use crate::index::data_writer::DataWriter;
use crate::index::inverter::Inverter;
use crate::index::seg_reader::SegReader;
use crate::index::segment::Segment;
use crate::index::sort::{CURRENT_FILE_FORMAT, dat_file, ix_file, ord_file};
use crate::plan::Schema;
use crate::store::Folder;

/// Buffers the values of sortable fields and writes the sort files when the
/// segment is finished.
#[derive(Debug)]
pub struct SortWriter {
    folder: Arc<dyn Folder>,
    schema: Arc<Schema>,
    seg_name: String,
    // Field name to per-doc values, indexed by doc id.
    fields: AHashMap<String, Vec<Option<FieldValue>>>,
    counts: Map<String, Value>,
}

impl SortWriter {
    pub const API: &'static str = "SortWriter";

    pub fn new<S: Into<String>>(folder: Arc<dyn Folder>, schema: Arc<Schema>, seg_name: S) -> Self {
        SortWriter {
            folder,
            schema,
            seg_name: seg_name.into(),
            fields: AHashMap::new(),
            counts: Map::new(),
        }
    }

    fn set_value(&mut self, field: &str, doc_id: i32, value: FieldValue) {
        let values = self.fields.entry(field.to_string()).or_default();
        let doc_id = doc_id as usize;
        if values.len() <= doc_id {
            values.resize(doc_id + 1, None);
        }
        values[doc_id] = Some(value);
    }

    fn write_field(&mut self, field: &str, field_num: i32, doc_max: i32) -> Result<()> {
        let Some(doc_values) = self.fields.get(field) else {
            return Ok(());
        };
        let mut unique: Vec<&FieldValue> = doc_values.iter().flatten().collect();
        unique.sort();
        unique.dedup();

        let mut ord_out = self.folder.open_out(&ord_file(&self.seg_name, field_num))?;
        for doc_id in 0..=doc_max.max(0) as usize {
            let ord = match doc_values.get(doc_id).and_then(Option::as_ref) {
                Some(value) => unique
                    .binary_search(&value)
                    .map(|idx| idx as i32 + 1)
                    .map_err(|_| IndexError::internal(format!("Lost sort value for '{field}'")))?,
                None => 0,
            };
            ord_out.write_i32(ord)?;
        }
        ord_out.close()?;

        let mut ix_out = self.folder.open_out(&ix_file(&self.seg_name, field_num))?;
        let mut dat_out = self.folder.open_out(&dat_file(&self.seg_name, field_num))?;
        for value in &unique {
            ix_out.write_i64(dat_out.tell() as i64)?;
            value.write_to(&mut dat_out)?;
        }
        ix_out.write_i64(dat_out.tell() as i64)?;
        ix_out.close()?;
        dat_out.close()?;

        self.counts.insert(field.to_string(), json!(unique.len()));
        Ok(())
    }
}

impl DataWriter for SortWriter {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn add_inverted_doc(&mut self, inverter: &Inverter, doc_id: i32) -> Result<()> {
        for entry in inverter.entries() {
            if entry.field_type.is_sortable() {
                self.set_value(&entry.field, doc_id, entry.value.clone());
            }
        }
        Ok(())
    }

    fn add_segment(&mut self, reader: &SegReader, doc_map: &[i32]) -> Result<()> {
        let Some(sort_reader) = reader.sort_reader() else {
            return Ok(());
        };
        for cache in sort_reader.caches() {
            let sortable = self
                .schema
                .fetch_type(cache.field())
                .or_else(|| reader.schema().fetch_type(cache.field()))
                .is_some_and(|field_type| field_type.is_sortable());
            if !sortable {
                continue;
            }
            for (old_id, &new_id) in doc_map.iter().enumerate().skip(1) {
                if new_id == 0 {
                    continue;
                }
                if let Some(value) = cache.doc_value(old_id as i32) {
                    self.set_value(cache.field(), new_id, value.clone());
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self, segment: &mut Segment) -> Result<()> {
        let doc_max = segment.count() as i32;
        let mut fields: Vec<(i32, String)> = Vec::with_capacity(self.fields.len());
        for field in self.fields.keys() {
            let field_num = segment.field_num(field);
            if field_num == 0 {
                return Err(IndexError::internal(format!(
                    "Field '{field}' has sort values but no number in {}",
                    self.seg_name
                )));
            }
            fields.push((field_num, field.clone()));
        }
        fields.sort();
        for (field_num, field) in fields {
            self.write_field(&field, field_num, doc_max)?;
        }
        self.fields.clear();
        segment.store_metadata("sort", self.metadata())
    }

    fn format(&self) -> i32 {
        CURRENT_FILE_FORMAT
    }

    fn metadata(&self) -> Value {
        json!({ "format": CURRENT_FILE_FORMAT, "counts": self.counts })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
