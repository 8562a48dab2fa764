//! Core data model: dictionary rows, field specs and synthetic records

use serde::{Deserialize, Serialize};

/// Cell value used when the generator answered with no content
pub const GENERATION_ERROR: &str = "GENERATION_ERROR";

/// Cell value used when the generator call itself failed
pub const API_ERROR: &str = "API_ERROR";

/// One field of the formatted dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name, unique within a dictionary
    pub field_name: String,

    /// Free-text business rules for the column
    pub rule_description: String,

    /// Valid/invalid example values, as produced by the description step
    pub example_input: Option<String>,
}

impl FieldSpec {
    pub fn new(field_name: impl Into<String>, rule_description: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            rule_description: rule_description.into(),
            example_input: None,
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example_input = Some(example.into());
        self
    }
}

/// Raw data dictionary as uploaded: arbitrary headers, first column names the field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DictionaryTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DictionaryTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Field name of a row (its first cell)
    pub fn field_name(&self, row: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.first()).map(String::as_str)
    }

    /// `(header, value)` pairs of a row, padding short rows with empty values
    pub fn entries(&self, row: usize) -> Vec<(&str, &str)> {
        let Some(cells) = self.rows.get(row) else {
            return Vec::new();
        };
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = cells.get(i).map(String::as_str).unwrap_or("");
                (header.as_str(), value)
            })
            .collect()
    }
}

/// One generated row: field name to value, in dictionary order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyntheticRecord {
    values: Vec<(String, String)>,
}

impl SyntheticRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Generated table: one record per plan row, ordered by generation order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyntheticDataset {
    pub columns: Vec<String>,
    pub records: Vec<SyntheticRecord>,
}

impl SyntheticDataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: SyntheticRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cell(&self, row: usize, field: &str) -> Option<&str> {
        self.records.get(row).and_then(|r| r.get(field))
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c == field)
    }

    /// Number of cells in a column equal to `value`
    pub fn count_in_column(&self, field: &str, value: &str) -> usize {
        self.records
            .iter()
            .filter(|r| r.get(field) == Some(value))
            .count()
    }
}
