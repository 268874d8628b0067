use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use serde_json::Value;

use crate::document::FieldValue;
use crate::error::{IndexError, Result};
use crate::index::data_reader::DataReader;
use crate::index::segment::Segment;
use crate::index::sort::{CURRENT_FILE_FORMAT, SortCache, dat_file, ix_file, ord_file};
use crate::plan::Schema;
use crate::store::Folder;
use crate::store::compound::json_to_i64;

/// Sort caches for every sortable field of one segment, loaded eagerly.
#[derive(Debug)]
pub struct SortReader {
    caches: AHashMap<String, Arc<SortCache>>,
}

impl SortReader {
    pub const API: &'static str = "SortReader";

    pub fn open(folder: &dyn Folder, schema: &Schema, segment: &Segment) -> Result<Self> {
        let mut caches = AHashMap::new();
        let Some(metadata) = segment.fetch_metadata("sort") else {
            return Ok(SortReader { caches });
        };
        let format = metadata
            .get("format")
            .and_then(json_to_i64)
            .ok_or_else(|| IndexError::format("Missing 'format' in sort metadata"))?;
        if format > CURRENT_FILE_FORMAT as i64 {
            return Err(IndexError::format(format!(
                "Unsupported sort format: {format} (current = {CURRENT_FILE_FORMAT})"
            )));
        }
        let counts = metadata
            .get("counts")
            .and_then(Value::as_object)
            .ok_or_else(|| IndexError::format("Missing 'counts' in sort metadata"))?;

        let seg_name = segment.name();
        let doc_max = segment.count().max(0) as usize;
        for (field, count) in counts {
            let cardinality = json_to_i64(count)
                .ok_or_else(|| IndexError::format(format!("Bad sort count for '{field}'")))?
                as usize;
            let field_num = segment.field_num(field);
            if field_num == 0 {
                continue;
            }
            if schema.fetch_type(field).is_some_and(|t| !t.is_sortable()) {
                log::warn!("Field '{field}' of {seg_name} is no longer sortable");
                continue;
            }

            let mut ord_in = folder.open_in(&ord_file(seg_name, field_num))?;
            let mut ords = Vec::with_capacity(doc_max + 1);
            for _ in 0..=doc_max {
                let ord = ord_in.read_i32()?;
                if ord < 0 || ord as usize > cardinality {
                    return Err(IndexError::format(format!(
                        "Sort ordinal {ord} out of range in '{}'",
                        ord_in.filename()
                    )));
                }
                ords.push(ord);
            }

            let mut ix_in = folder.open_in(&ix_file(seg_name, field_num))?;
            let mut dat_in = folder.open_in(&dat_file(seg_name, field_num))?;
            let mut values = Vec::with_capacity(cardinality);
            for _ in 0..cardinality {
                let offset = ix_in.read_i64()?;
                dat_in.seek(offset as u64)?;
                values.push(FieldValue::read_from(&mut dat_in)?);
            }

            caches.insert(field.clone(), Arc::new(SortCache::new(field.clone(), ords, values)));
        }
        Ok(SortReader { caches })
    }

    pub fn fetch_sort_cache(&self, field: &str) -> Option<&Arc<SortCache>> {
        self.caches.get(field)
    }

    pub fn caches(&self) -> impl Iterator<Item = &Arc<SortCache>> {
        self.caches.values()
    }
}

impl DataReader for SortReader {
    fn api(&self) -> &'static str {
        Self::API
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
