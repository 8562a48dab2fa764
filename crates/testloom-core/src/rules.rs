//! Structured validation rules derived from a free-text rule description
//!
//! A `RuleSet` is sparse: only the keys the description mentioned are set.
//! Rule sets arrive as model output, so decoding is lenient about casing and
//! scalar types but strict about the overall shape (must be a JSON object).

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Default date pattern when a Date rule carries no format
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared data type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Float,
    Date,
}

impl DataType {
    /// Case-insensitive parse accepting the common synonyms models emit
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" | "varchar" => Some(Self::String),
            "integer" | "int" | "whole number" => Some(Self::Integer),
            "float" | "decimal" | "double" | "number" => Some(Self::Float),
            "date" => Some(Self::Date),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Sparse rule set for one field
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    /// Date pattern, strftime or `YYYY-MM-DD` style
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_unique: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_null: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_numeric: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_alphanumeric: Option<bool>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// No rule key is set. An empty set cannot validate anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_not_null(mut self, not_null: bool) -> Self {
        self.not_null = Some(not_null);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn requires_value(&self) -> bool {
        self.not_null.unwrap_or(false)
    }

    /// Effective date pattern in strftime syntax
    pub fn date_format(&self) -> String {
        match self.format.as_deref() {
            Some(format) if !format.trim().is_empty() => to_strftime(format.trim()),
            _ => DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Decode a JSON object, skipping keys whose values cannot be interpreted
    pub fn from_value(value: &Value) -> Result<Self, ExtractionError> {
        let object = value.as_object().ok_or(ExtractionError::NotAnObject)?;
        Ok(Self::from_object(object))
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let mut rules = Self::default();
        for (key, value) in object {
            match key.trim().to_ascii_lowercase().as_str() {
                "data_type" => rules.data_type = value.as_str().and_then(DataType::parse),
                "length" => rules.length = as_usize(value),
                "format" => rules.format = scalar_string(value),
                "allowed_values" => rules.allowed_values = as_string_list(value),
                "is_unique" => rules.is_unique = as_bool(value),
                "not_null" => rules.not_null = as_bool(value),
                "is_numeric" => rules.is_numeric = as_bool(value),
                "is_alphanumeric" => rules.is_alphanumeric = as_bool(value),
                other => tracing::debug!(key = other, "ignoring unknown rule key"),
            }
        }
        rules
    }

    /// Parse raw model output: the text between the first `{` and the last `}`
    pub fn from_model_output(text: &str) -> Result<Self, ExtractionError> {
        let start = text.find('{').ok_or(ExtractionError::NoJsonObject)?;
        let end = text.rfind('}').ok_or(ExtractionError::NoJsonObject)?;
        if end < start {
            return Err(ExtractionError::NoJsonObject);
        }
        let value: Value =
            serde_json::from_str(&text[start..=end]).map_err(ExtractionError::InvalidJson)?;
        Self::from_value(&value)
    }
}

/// Translate `YYYY-MM-DD` style tokens to strftime; strftime input is kept as-is
pub fn to_strftime(format: &str) -> String {
    if format.contains('%') {
        return format.to_string();
    }
    const TOKENS: [(&str, &str); 8] = [
        ("YYYY", "%Y"),
        ("yyyy", "%Y"),
        ("YY", "%y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
    ];
    let mut out = String::with_capacity(format.len() + 4);
    let mut rest = format;
    'scan: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'scan;
            }
        }
        if let Some(tail) = rest.strip_prefix("ss") {
            out.push_str("%S");
            rest = tail;
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_u64().map(|n| n != 0),
        _ => None,
    }
}

fn as_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(scalar_string).collect()),
        Value::String(s) => Some(
            s.split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
        ),
        _ => None,
    }
}
