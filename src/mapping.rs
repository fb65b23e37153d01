//! Schema mapping: logical roles resolved to physical table/column names.
//!
//! Loaded once from `mapping.json`. Every name is checked against a strict
//! identifier grammar at load time and kept as an [`Ident`]; SQL text is only
//! ever assembled from `Ident`s and bound parameters.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Cannot read mapping file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid mapping document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid identifier for {role}: {value:?}")]
    InvalidIdentifier { role: String, value: String },

    #[error("No order-timestamp candidate columns configured")]
    EmptyCandidates,
}

/// A validated SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(role: &str, value: &str) -> Result<Self, MappingError> {
        let mut chars = value.chars();
        let valid = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if !valid {
            return Err(MappingError::InvalidIdentifier {
                role: role.into(),
                value: value.into(),
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════
// Wire document
// ═══════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct MappingDocument {
    header_table: String,
    line_table: String,
    join_key: String,
    order_timestamp_columns: Vec<String>,
    analyte_column: String,
    result_column: String,
    #[serde(default)]
    header_fields: HeaderFieldsDocument,
}

#[derive(Debug, Default, Deserialize)]
struct HeaderFieldsDocument {
    name: Option<String>,
    first_name: Option<String>,
    birth_date: Option<String>,
    patient_id: Option<String>,
    order_number: Option<String>,
    #[serde(default)]
    submitter: Vec<String>,
}

// ═══════════════════════════════════════════
// Resolved mapping
// ═══════════════════════════════════════════

/// Patient/order metadata columns used for audit snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderFields {
    pub name: Option<Ident>,
    pub first_name: Option<Ident>,
    pub birth_date: Option<Ident>,
    pub patient_id: Option<Ident>,
    pub order_number: Option<Ident>,
    /// First non-blank column wins.
    pub submitter: Vec<Ident>,
}

/// Immutable, validated schema mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMapping {
    pub header_table: Ident,
    pub line_table: Ident,
    pub join_key: Ident,
    /// Priority order: the first column that normalizes wins.
    pub order_timestamp_columns: Vec<Ident>,
    pub analyte_column: Ident,
    pub result_column: Ident,
    pub header_fields: HeaderFields,
}

impl SchemaMapping {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let text = std::fs::read_to_string(path)?;
        let mapping = Self::from_json(&text)?;
        tracing::info!(path = %path.display(), header = %mapping.header_table, lines = %mapping.line_table, "Schema mapping loaded");
        Ok(mapping)
    }

    pub fn from_json(text: &str) -> Result<Self, MappingError> {
        let doc: MappingDocument = serde_json::from_str(text)?;
        Self::resolve(doc)
    }

    fn resolve(doc: MappingDocument) -> Result<Self, MappingError> {
        if doc.order_timestamp_columns.is_empty() {
            return Err(MappingError::EmptyCandidates);
        }
        let order_timestamp_columns = doc
            .order_timestamp_columns
            .iter()
            .map(|c| Ident::new("order_timestamp_columns", c))
            .collect::<Result<Vec<_>, _>>()?;

        let optional = |role: &str, value: &Option<String>| -> Result<Option<Ident>, MappingError> {
            value.as_deref().map(|v| Ident::new(role, v)).transpose()
        };
        let fields = &doc.header_fields;
        let header_fields = HeaderFields {
            name: optional("header_fields.name", &fields.name)?,
            first_name: optional("header_fields.first_name", &fields.first_name)?,
            birth_date: optional("header_fields.birth_date", &fields.birth_date)?,
            patient_id: optional("header_fields.patient_id", &fields.patient_id)?,
            order_number: optional("header_fields.order_number", &fields.order_number)?,
            submitter: fields
                .submitter
                .iter()
                .map(|c| Ident::new("header_fields.submitter", c))
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Self {
            header_table: Ident::new("header_table", &doc.header_table)?,
            line_table: Ident::new("line_table", &doc.line_table)?,
            join_key: Ident::new("join_key", &doc.join_key)?,
            order_timestamp_columns,
            analyte_column: Ident::new("analyte_column", &doc.analyte_column)?,
            result_column: Ident::new("result_column", &doc.result_column)?,
            header_fields,
        })
    }

    /// The mapping of the lab system this tool was first written for.
    pub fn lab_default() -> Self {
        let ident = |s: &str| Ident(s.to_string());
        Self {
            header_table: ident("Befund"),
            line_table: ident("BefTag"),
            join_key: ident("ProbenNr"),
            order_timestamp_columns: vec![ident("AbnahmeDatum"), ident("TimeStamp")],
            analyte_column: ident("TestKB"),
            result_column: ident("Ergebnis"),
            header_fields: HeaderFields {
                name: Some(ident("Name")),
                first_name: Some(ident("Vname")),
                birth_date: Some(ident("GebDat")),
                patient_id: Some(ident("PatID")),
                order_number: Some(ident("AuftragsNr")),
                submitter: vec![ident("EinsenderInfo"), ident("EinsenderKennung")],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "header_table": "Befund",
        "line_table": "BefTag",
        "join_key": "ProbenNr",
        "order_timestamp_columns": ["AbnahmeDatum", "TimeStamp"],
        "analyte_column": "TestKB",
        "result_column": "Ergebnis",
        "header_fields": {
            "name": "Name", "first_name": "Vname", "birth_date": "GebDat",
            "patient_id": "PatID", "order_number": "AuftragsNr",
            "submitter": ["EinsenderInfo", "EinsenderKennung"]
        }
    }"#;

    #[test]
    fn full_document_matches_lab_default() {
        let mapping = SchemaMapping::from_json(FULL).unwrap();
        assert_eq!(mapping, SchemaMapping::lab_default());
    }

    #[test]
    fn header_fields_are_optional() {
        let json = r#"{
            "header_table": "H", "line_table": "L", "join_key": "id",
            "order_timestamp_columns": ["ts"], "analyte_column": "code",
            "result_column": "value"
        }"#;
        let mapping = SchemaMapping::from_json(json).unwrap();
        assert_eq!(mapping.header_fields, HeaderFields::default());
    }

    #[test]
    fn missing_required_key_fails_fast() {
        let json = r#"{
            "header_table": "H", "line_table": "L",
            "order_timestamp_columns": ["ts"], "analyte_column": "code",
            "result_column": "value"
        }"#;
        let err = SchemaMapping::from_json(json).unwrap_err();
        assert!(matches!(err, MappingError::Parse(_)));
        assert!(err.to_string().contains("join_key"));
    }

    #[test]
    fn empty_candidate_list_rejected() {
        let json = r#"{
            "header_table": "H", "line_table": "L", "join_key": "id",
            "order_timestamp_columns": [], "analyte_column": "code",
            "result_column": "value"
        }"#;
        assert!(matches!(
            SchemaMapping::from_json(json),
            Err(MappingError::EmptyCandidates)
        ));
    }

    #[test]
    fn injection_attempt_rejected() {
        let json = r#"{
            "header_table": "H; DROP TABLE H", "line_table": "L", "join_key": "id",
            "order_timestamp_columns": ["ts"], "analyte_column": "code",
            "result_column": "value"
        }"#;
        match SchemaMapping::from_json(json) {
            Err(MappingError::InvalidIdentifier { role, .. }) => assert_eq!(role, "header_table"),
            other => panic!("expected InvalidIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn ident_grammar() {
        assert!(Ident::new("t", "_col1").is_ok());
        assert!(Ident::new("t", "1col").is_err());
        assert!(Ident::new("t", "").is_err());
        assert!(Ident::new("t", "a\"b").is_err());
        assert_eq!(Ident::new("t", "TestKB").unwrap().quoted(), "\"TestKB\"");
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        std::fs::write(&path, FULL).unwrap();
        let mapping = SchemaMapping::load(&path).unwrap();
        assert_eq!(mapping.join_key.as_str(), "ProbenNr");

        let missing = SchemaMapping::load(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(MappingError::Io(_))));
    }
}
