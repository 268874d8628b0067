//! The schema: every field of an index and its type.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::{Analyzer, analyzer_by_name};
use crate::error::{IndexError, Result};
use crate::plan::architecture::Architecture;
use crate::plan::field_type::FieldType;
use crate::store::Folder;

#[derive(Debug, Serialize, Deserialize)]
struct FieldSpec {
    name: String,
    #[serde(flatten)]
    field_type: FieldType,
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaDump {
    #[serde(default)]
    architecture: Architecture,
    fields: Vec<FieldSpec>,
}

/// Field definitions for an index, in the order they were declared.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    architecture: Architecture,
    names: Vec<String>,
    types: AHashMap<String, FieldType>,
    analyzers: AHashMap<String, Arc<dyn Analyzer>>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub fn with_architecture(architecture: Architecture) -> Self {
        Schema {
            architecture,
            ..Schema::default()
        }
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    /// Declare a field. Re-declaring a field with the same type is a no-op;
    /// a different type is a contract violation.
    pub fn spec_field(&mut self, name: &str, field_type: FieldType) -> Result<()> {
        let analyzer = match field_type.analyzer_name() {
            Some(analyzer_name) => Some(analyzer_by_name(analyzer_name)?),
            None => None,
        };
        self.spec_field_inner(name, field_type, analyzer)
    }

    /// Declare a full text field with a custom analyzer instance.
    pub fn spec_field_with_analyzer(
        &mut self,
        name: &str,
        field_type: FieldType,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<()> {
        self.spec_field_inner(name, field_type, Some(analyzer))
    }

    fn spec_field_inner(
        &mut self,
        name: &str,
        field_type: FieldType,
        analyzer: Option<Arc<dyn Analyzer>>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(IndexError::invalid_argument("Field name must not be empty"));
        }
        if let Some(existing) = self.types.get(name) {
            if *existing == field_type {
                return Ok(());
            }
            return Err(IndexError::contract(format!(
                "'{name}' assigned conflicting FieldType"
            )));
        }
        if field_type.is_numeric() && field_type.is_indexed() {
            return Err(IndexError::contract(format!(
                "Numeric field '{name}' can't be indexed"
            )));
        }
        if let Some(analyzer) = analyzer {
            self.analyzers.insert(name.to_string(), analyzer);
        }
        self.names.push(name.to_string());
        self.types.insert(name.to_string(), field_type);
        Ok(())
    }

    pub fn fetch_type(&self, field: &str) -> Option<&FieldType> {
        self.types.get(field)
    }

    pub fn fetch_analyzer(&self, field: &str) -> Option<Arc<dyn Analyzer>> {
        self.analyzers.get(field).cloned()
    }

    pub fn num_fields(&self) -> usize {
        self.names.len()
    }

    /// Field names in declaration order.
    pub fn all_fields(&self) -> &[String] {
        &self.names
    }

    /// Absorb every field of `other`.
    pub fn eat(&mut self, other: &Schema) -> Result<()> {
        for name in &other.names {
            let field_type = other.types[name].clone();
            let analyzer = other.analyzers.get(name).cloned();
            self.spec_field_inner(name, field_type, analyzer)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        let dump = SchemaDump {
            architecture: self.architecture,
            fields: self
                .names
                .iter()
                .map(|name| FieldSpec {
                    name: name.clone(),
                    field_type: self.types[name].clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&dump)?)
    }

    pub fn from_json(json: &[u8]) -> Result<Schema> {
        let dump: SchemaDump = serde_json::from_slice(json)
            .map_err(|e| IndexError::format(format!("Malformed schema: {e}")))?;
        let mut schema = Schema::with_architecture(dump.architecture);
        for spec in dump.fields {
            schema.spec_field(&spec.name, spec.field_type)?;
        }
        Ok(schema)
    }

    /// Write the schema as a new JSON file.
    pub fn write(&self, folder: &dyn Folder, path: &str) -> Result<()> {
        let json = self.to_json()?;
        let mut out = folder.open_out(path)?;
        out.write_bytes(json.as_bytes())?;
        out.close()
    }

    pub fn read(folder: &dyn Folder, path: &str) -> Result<Schema> {
        let bytes = folder.slurp(path)?;
        Schema::from_json(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RamFolder;

    fn sample() -> Schema {
        let mut schema = Schema::new();
        schema
            .spec_field("title", FieldType::full_text("standard"))
            .unwrap();
        schema.spec_field("url", FieldType::string()).unwrap();
        schema
            .spec_field("price", FieldType::float64().with_sortable(true))
            .unwrap();
        schema
    }

    #[test]
    fn test_spec_field_rules() {
        let mut schema = sample();
        schema.spec_field("url", FieldType::string()).unwrap();
        assert!(
            schema
                .spec_field("url", FieldType::blob(true))
                .unwrap_err()
                .is_contract_violation()
        );
        assert!(
            schema
                .spec_field("count", FieldType::int32().with_indexed(true))
                .unwrap_err()
                .is_contract_violation()
        );
        assert_eq!(schema.all_fields(), &["title", "url", "price"]);
        assert!(schema.fetch_analyzer("title").is_some());
        assert!(schema.fetch_analyzer("url").is_none());
    }

    #[test]
    fn test_write_and_read() {
        let folder = RamFolder::new();
        let schema = sample();
        schema.write(&folder, "schema_1.json").unwrap();
        let loaded = Schema::read(&folder, "schema_1.json").unwrap();
        assert_eq!(loaded.all_fields(), schema.all_fields());
        assert_eq!(loaded.fetch_type("price"), schema.fetch_type("price"));
        assert_eq!(loaded.architecture(), schema.architecture());
    }

    #[test]
    fn test_eat() {
        let mut schema = Schema::new();
        schema.spec_field("body", FieldType::full_text("whitespace")).unwrap();
        schema.eat(&sample()).unwrap();
        assert_eq!(schema.num_fields(), 4);

        let mut conflicting = Schema::new();
        conflicting.spec_field("title", FieldType::string()).unwrap();
        assert!(schema.eat(&conflicting).is_err());
    }
}
