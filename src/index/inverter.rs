//! Breaks a document into per-field entries, analyzing indexed text into
//! inversions ready for posting construction.

use std::sync::Arc;

use crate::analysis::{Analyzer, Inversion};
use crate::document::{Doc, FieldValue};
use crate::error::{IndexError, Result};
use crate::index::segment::Segment;
use crate::plan::{FieldType, Schema};

/// One field of the document being inverted.
#[derive(Debug, Clone)]
pub struct InverterEntry {
    pub field: String,
    pub field_num: i32,
    pub field_type: FieldType,
    pub value: FieldValue,
    /// Sorted and clustered tokens, present for indexed fields only.
    pub inversion: Option<Inversion>,
}

impl InverterEntry {
    fn new(
        schema: &Schema,
        field: &str,
        field_num: i32,
        value: &FieldValue,
    ) -> Result<InverterEntry> {
        let field_type = schema
            .fetch_type(field)
            .ok_or_else(|| IndexError::contract(format!("Unknown field: '{field}'")))?
            .clone();
        if !field_type.accepts(value) {
            return Err(IndexError::contract(format!(
                "Value for field '{field}' has primitive type {} but the field expects {}",
                value.primitive_id(),
                field_type.primitive_id()
            )));
        }

        let inversion = if field_type.is_indexed() {
            let text = value.as_text().ok_or_else(|| {
                IndexError::contract(format!("Indexed field '{field}' requires a text value"))
            })?;
            let analyzer: Option<Arc<dyn Analyzer>> = schema.fetch_analyzer(field);
            let mut inversion = match analyzer {
                Some(analyzer) => analyzer.transform_text(text)?,
                None => Inversion::from_text(text),
            };
            inversion.invert()?;
            Some(inversion)
        } else {
            None
        };

        Ok(InverterEntry {
            field: field.to_string(),
            field_num,
            field_type,
            value: value.clone(),
            inversion,
        })
    }
}

#[derive(Debug)]
pub struct Inverter {
    schema: Arc<Schema>,
    doc: Option<Doc>,
    entries: Vec<InverterEntry>,
}

impl Inverter {
    pub fn new(schema: Arc<Schema>) -> Self {
        Inverter {
            schema,
            doc: None,
            entries: Vec::new(),
        }
    }

    /// Invert every field of `doc`, assigning field numbers in `segment`.
    pub fn invert_doc(&mut self, doc: &Doc, segment: &mut Segment) -> Result<()> {
        self.clear();
        for (field, value) in doc.iter() {
            let field_num = segment.add_field(field);
            let entry = InverterEntry::new(&self.schema, field, field_num, value)?;
            self.entries.push(entry);
        }
        self.entries.sort_by_key(|entry| entry.field_num);
        self.doc = Some(doc.clone());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.doc = None;
    }

    pub fn doc(&self) -> Option<&Doc> {
        self.doc.as_ref()
    }

    /// Entries in field number order.
    pub fn entries(&self) -> &[InverterEntry] {
        &self.entries
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
