//! Field types: how a field's values are indexed, stored and sorted.

use serde::{Deserialize, Serialize};

use crate::document::{FieldValue, primitive};

fn default_true() -> bool {
    true
}

fn default_boost() -> f32 {
    1.0
}

/// The type of a schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Analyzed text.
    FullText {
        analyzer: String,
        #[serde(default = "default_true")]
        indexed: bool,
        #[serde(default = "default_true")]
        stored: bool,
        #[serde(default)]
        sortable: bool,
        #[serde(default = "default_boost")]
        boost: f32,
        /// Keep per-document term vectors for highlighting.
        #[serde(default)]
        highlightable: bool,
    },
    /// Text indexed as a single term.
    String {
        #[serde(default = "default_true")]
        indexed: bool,
        #[serde(default = "default_true")]
        stored: bool,
        #[serde(default)]
        sortable: bool,
        #[serde(default = "default_boost")]
        boost: f32,
    },
    /// Opaque bytes, never indexed.
    Blob {
        #[serde(default)]
        stored: bool,
    },
    Int32 {
        #[serde(default = "default_true")]
        stored: bool,
        #[serde(default)]
        sortable: bool,
        #[serde(default)]
        indexed: bool,
    },
    Int64 {
        #[serde(default = "default_true")]
        stored: bool,
        #[serde(default)]
        sortable: bool,
        #[serde(default)]
        indexed: bool,
    },
    Float32 {
        #[serde(default = "default_true")]
        stored: bool,
        #[serde(default)]
        sortable: bool,
        #[serde(default)]
        indexed: bool,
    },
    Float64 {
        #[serde(default = "default_true")]
        stored: bool,
        #[serde(default)]
        sortable: bool,
        #[serde(default)]
        indexed: bool,
    },
}

impl FieldType {
    /// Indexed and stored full text using the named analyzer.
    pub fn full_text<S: Into<String>>(analyzer: S) -> Self {
        FieldType::FullText {
            analyzer: analyzer.into(),
            indexed: true,
            stored: true,
            sortable: false,
            boost: 1.0,
            highlightable: false,
        }
    }

    /// Indexed and stored single-term text.
    pub fn string() -> Self {
        FieldType::String {
            indexed: true,
            stored: true,
            sortable: false,
            boost: 1.0,
        }
    }

    pub fn blob(stored: bool) -> Self {
        FieldType::Blob { stored }
    }

    pub fn int32() -> Self {
        FieldType::Int32 {
            stored: true,
            sortable: false,
            indexed: false,
        }
    }

    pub fn int64() -> Self {
        FieldType::Int64 {
            stored: true,
            sortable: false,
            indexed: false,
        }
    }

    pub fn float32() -> Self {
        FieldType::Float32 {
            stored: true,
            sortable: false,
            indexed: false,
        }
    }

    pub fn float64() -> Self {
        FieldType::Float64 {
            stored: true,
            sortable: false,
            indexed: false,
        }
    }

    pub fn with_stored(mut self, value: bool) -> Self {
        match &mut self {
            FieldType::FullText { stored, .. }
            | FieldType::String { stored, .. }
            | FieldType::Blob { stored }
            | FieldType::Int32 { stored, .. }
            | FieldType::Int64 { stored, .. }
            | FieldType::Float32 { stored, .. }
            | FieldType::Float64 { stored, .. } => *stored = value,
        }
        self
    }

    pub fn with_indexed(mut self, value: bool) -> Self {
        match &mut self {
            FieldType::FullText { indexed, .. }
            | FieldType::String { indexed, .. }
            | FieldType::Int32 { indexed, .. }
            | FieldType::Int64 { indexed, .. }
            | FieldType::Float32 { indexed, .. }
            | FieldType::Float64 { indexed, .. } => *indexed = value,
            FieldType::Blob { .. } => {}
        }
        self
    }

    pub fn with_sortable(mut self, value: bool) -> Self {
        match &mut self {
            FieldType::FullText { sortable, .. }
            | FieldType::String { sortable, .. }
            | FieldType::Int32 { sortable, .. }
            | FieldType::Int64 { sortable, .. }
            | FieldType::Float32 { sortable, .. }
            | FieldType::Float64 { sortable, .. } => *sortable = value,
            FieldType::Blob { .. } => {}
        }
        self
    }

    pub fn with_boost(mut self, value: f32) -> Self {
        if let FieldType::FullText { boost, .. } | FieldType::String { boost, .. } = &mut self {
            *boost = value;
        }
        self
    }

    /// Only full text fields can be highlightable.
    pub fn with_highlightable(mut self, value: bool) -> Self {
        if let FieldType::FullText { highlightable, .. } = &mut self {
            *highlightable = value;
        }
        self
    }

    pub fn is_highlightable(&self) -> bool {
        matches!(self, FieldType::FullText { highlightable: true, .. })
    }

    pub fn is_indexed(&self) -> bool {
        match self {
            FieldType::FullText { indexed, .. }
            | FieldType::String { indexed, .. }
            | FieldType::Int32 { indexed, .. }
            | FieldType::Int64 { indexed, .. }
            | FieldType::Float32 { indexed, .. }
            | FieldType::Float64 { indexed, .. } => *indexed,
            FieldType::Blob { .. } => false,
        }
    }

    pub fn is_stored(&self) -> bool {
        match self {
            FieldType::FullText { stored, .. }
            | FieldType::String { stored, .. }
            | FieldType::Blob { stored }
            | FieldType::Int32 { stored, .. }
            | FieldType::Int64 { stored, .. }
            | FieldType::Float32 { stored, .. }
            | FieldType::Float64 { stored, .. } => *stored,
        }
    }

    pub fn is_sortable(&self) -> bool {
        match self {
            FieldType::FullText { sortable, .. }
            | FieldType::String { sortable, .. }
            | FieldType::Int32 { sortable, .. }
            | FieldType::Int64 { sortable, .. }
            | FieldType::Float32 { sortable, .. }
            | FieldType::Float64 { sortable, .. } => *sortable,
            FieldType::Blob { .. } => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Int32 { .. }
                | FieldType::Int64 { .. }
                | FieldType::Float32 { .. }
                | FieldType::Float64 { .. }
        )
    }

    pub fn boost(&self) -> f32 {
        match self {
            FieldType::FullText { boost, .. } | FieldType::String { boost, .. } => *boost,
            _ => 1.0,
        }
    }

    /// Name of the analyzer for full text fields.
    pub fn analyzer_name(&self) -> Option<&str> {
        match self {
            FieldType::FullText { analyzer, .. } => Some(analyzer),
            _ => None,
        }
    }

    pub fn primitive_id(&self) -> u8 {
        match self {
            FieldType::FullText { .. } | FieldType::String { .. } => primitive::TEXT,
            FieldType::Blob { .. } => primitive::BLOB,
            FieldType::Int32 { .. } => primitive::INT32,
            FieldType::Int64 { .. } => primitive::INT64,
            FieldType::Float32 { .. } => primitive::FLOAT32,
            FieldType::Float64 { .. } => primitive::FLOAT64,
        }
    }

    /// True if `value` can be stored in a field of this type.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        value.primitive_id() == self.primitive_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let text = FieldType::full_text("standard").with_stored(false);
        assert!(text.is_indexed());
        assert!(!text.is_stored());
        assert_eq!(text.analyzer_name(), Some("standard"));

        let num = FieldType::int64().with_sortable(true);
        assert!(num.is_sortable());
        assert!(!num.is_indexed());
        assert!(num.accepts(&FieldValue::I64(3)));
        assert!(!num.accepts(&FieldValue::I32(3)));
        assert!(!FieldType::blob(true).is_indexed());

        assert!(FieldType::full_text("standard").with_highlightable(true).is_highlightable());
        assert!(!FieldType::string().with_highlightable(true).is_highlightable());
    }

    #[test]
    fn test_serde_defaults() {
        let parsed: FieldType = serde_json::from_str(r#"{"type":"string"}"#).unwrap();
        assert_eq!(parsed, FieldType::string());
        let json = serde_json::to_string(&FieldType::float32()).unwrap();
        assert!(json.contains("\"type\":\"float32\""));
    }
}
