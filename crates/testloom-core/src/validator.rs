//! Rule-Based Validator
//!
//! Deterministic checks of one cell value against one field's `RuleSet`.
//! All applicable checks run and their reasons accumulate; only the null
//! check short-circuits the type, format and allowed-value checks.

use crate::rules::{DataType, RuleSet};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason recorded when a field has no usable rules
pub const UNPARSEABLE_RULES_REASON: &str = "could not parse validation rules";

/// Reason recorded for a missing value on a `not_null` field
pub const NULL_VALUE_REASON: &str = "value is null, but it must not be";

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationStatus {
    Passed,
    Failed,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Status plus the ordered list of violated-rule explanations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellVerdict {
    pub status: ValidationStatus,
    pub reasons: Vec<String>,
}

impl CellVerdict {
    fn from_reasons(reasons: Vec<String>) -> Self {
        let status = if reasons.is_empty() {
            ValidationStatus::Passed
        } else {
            ValidationStatus::Failed
        };
        Self { status, reasons }
    }

    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Passed
    }
}

/// Validator with an optional strict mode
///
/// The default mode checks `not_null`, `data_type`, `format` and
/// `allowed_values`. Strict mode also enforces `length`, `is_numeric` and
/// `is_alphanumeric`. `is_unique` spans records and is never checked here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Validator {
    strict: bool,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Check one value. `None` and blank strings both count as null.
    pub fn validate(&self, rules: &RuleSet, value: Option<&str>) -> CellVerdict {
        if rules.is_empty() {
            return CellVerdict::from_reasons(vec![UNPARSEABLE_RULES_REASON.to_string()]);
        }

        let value = value.filter(|v| !v.trim().is_empty());
        let mut reasons = Vec::new();

        match value {
            None => {
                if rules.requires_value() {
                    reasons.push(NULL_VALUE_REASON.to_string());
                }
            }
            Some(value) => {
                check_data_type(rules, value, &mut reasons);
                check_allowed_values(rules, value, &mut reasons);
                if self.strict {
                    check_strict(rules, value, &mut reasons);
                }
            }
        }

        CellVerdict::from_reasons(reasons)
    }
}

/// Validate with the default (non-strict) checks
pub fn validate(rules: &RuleSet, value: Option<&str>) -> CellVerdict {
    Validator::new().validate(rules, value)
}

fn check_data_type(rules: &RuleSet, value: &str, reasons: &mut Vec<String>) {
    match rules.data_type {
        Some(DataType::Integer) if !is_integer(value) => {
            reasons.push(format!("expected an integer, got '{}'", value));
        }
        Some(DataType::Float) if !is_float(value) => {
            reasons.push(format!("expected a float, got '{}'", value));
        }
        Some(DataType::Date) => {
            let format = rules.date_format();
            if !is_date(value, &format) {
                reasons.push(format!(
                    "expected date in {} format, got '{}'",
                    format, value
                ));
            }
        }
        _ => {}
    }
}

fn check_allowed_values(rules: &RuleSet, value: &str, reasons: &mut Vec<String>) {
    let Some(allowed) = rules.allowed_values.as_ref().filter(|a| !a.is_empty()) else {
        return;
    };
    if !allowed.iter().any(|a| a == value) {
        reasons.push(format!(
            "value '{}' is not in the allowed list: [{}]",
            value,
            allowed.join(", ")
        ));
    }
}

fn check_strict(rules: &RuleSet, value: &str, reasons: &mut Vec<String>) {
    if let Some(length) = rules.length {
        let actual = value.chars().count();
        if actual != length {
            reasons.push(format!(
                "expected length {}, got {} for '{}'",
                length, actual, value
            ));
        }
    }
    if rules.is_numeric == Some(true) && !is_float(value) {
        reasons.push(format!("expected a numeric value, got '{}'", value));
    }
    if rules.is_alphanumeric == Some(true) && !value.chars().all(char::is_alphanumeric) {
        reasons.push(format!("expected an alphanumeric value, got '{}'", value));
    }
}

fn is_integer(value: &str) -> bool {
    value.trim().parse::<i128>().is_ok()
}

fn is_float(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .map(f64::is_finite)
        .unwrap_or(false)
}

fn is_date(value: &str, format: &str) -> bool {
    let value = value.trim();
    NaiveDate::parse_from_str(value, format).is_ok()
        || NaiveDateTime::parse_from_str(value, format).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_null_with_empty_value() {
        let rules = RuleSet::new().with_not_null(true);
        for value in [None, Some(""), Some("   ")] {
            let verdict = validate(&rules, value);
            assert_eq!(verdict.status, ValidationStatus::Failed);
            assert!(verdict.reasons[0].contains("null"));
        }
    }

    #[test]
    fn test_null_short_circuits_other_checks() {
        let rules = RuleSet::new()
            .with_not_null(true)
            .with_data_type(DataType::Integer)
            .with_allowed_values(["1", "2"]);
        let verdict = validate(&rules, Some(""));
        assert_eq!(verdict.reasons, vec![NULL_VALUE_REASON.to_string()]);
    }

    #[test]
    fn test_rules_with_only_unknown_keys_fail_every_cell() {
        let rules = RuleSet::from_value(&serde_json::json!({
            "data_type": "Blob",
            "max_length": 10
        }))
        .unwrap();
        for value in [Some("anything"), None] {
            let verdict = Validator::strict().validate(&rules, value);
            assert_eq!(verdict.status, ValidationStatus::Failed);
            assert_eq!(verdict.reasons, vec![UNPARSEABLE_RULES_REASON.to_string()]);
        }
    }

    #[test]
    fn test_absent_value_without_not_null_passes() {
        let rules = RuleSet::new().with_data_type(DataType::Integer);
        assert!(validate(&rules, None).passed());
    }

    #[test]
    fn test_invalid_date() {
        let rules = RuleSet::new()
            .with_data_type(DataType::Date)
            .with_format("%Y-%m-%d");
        let verdict = validate(&rules, Some("2024-13-40"));
        assert_eq!(verdict.status, ValidationStatus::Failed);
        assert!(verdict.reasons[0].contains("%Y-%m-%d"));
    }

    #[test]
    fn test_date_default_and_token_formats() {
        let rules = RuleSet::new().with_data_type(DataType::Date);
        assert!(validate(&rules, Some("2024-02-29")).passed());
        assert!(!validate(&rules, Some("2023-02-29")).passed());

        let rules = rules.with_format("DD/MM/YYYY");
        assert!(validate(&rules, Some("31/12/2024")).passed());
        assert!(!validate(&rules, Some("2024-12-31")).passed());
    }

    #[test]
    fn test_datetime_format() {
        let rules = RuleSet::new()
            .with_data_type(DataType::Date)
            .with_format("%Y-%m-%d %H:%M");
        assert!(validate(&rules, Some("2024-05-01 13:45")).passed());
    }

    #[test]
    fn test_allowed_values() {
        let rules = RuleSet::new().with_allowed_values(["North", "South"]);
        assert!(validate(&rules, Some("North")).passed());

        let verdict = validate(&rules, Some("Northeast"));
        assert_eq!(verdict.status, ValidationStatus::Failed);
        assert!(verdict.reasons[0].contains("North, South"));
        assert!(verdict.reasons[0].contains("Northeast"));
    }

    #[test]
    fn test_empty_rules() {
        for value in [None, Some("anything"), Some("")] {
            let verdict = validate(&RuleSet::new(), value);
            assert_eq!(verdict.status, ValidationStatus::Failed);
            assert_eq!(verdict.reasons, vec!["could not parse validation rules"]);
        }
    }

    #[test]
    fn test_numeric_types() {
        let int_rules = RuleSet::new().with_data_type(DataType::Integer);
        assert!(validate(&int_rules, Some("42")).passed());
        assert!(validate(&int_rules, Some("-7")).passed());
        let verdict = validate(&int_rules, Some("4.2"));
        assert_eq!(verdict.reasons, vec!["expected an integer, got '4.2'"]);

        let float_rules = RuleSet::new().with_data_type(DataType::Float);
        assert!(validate(&float_rules, Some("4.2")).passed());
        assert!(validate(&float_rules, Some("42")).passed());
        assert!(!validate(&float_rules, Some("inf")).passed());
        assert!(!validate(&float_rules, Some("forty")).passed());
    }

    #[test]
    fn test_reasons_accumulate() {
        let rules = RuleSet::new()
            .with_data_type(DataType::Integer)
            .with_allowed_values(["1", "2"]);
        let verdict = validate(&rules, Some("abc"));
        assert_eq!(verdict.reasons.len(), 2);
        assert!(verdict.reasons[0].starts_with("expected an integer"));
        assert!(verdict.reasons[1].contains("allowed list"));
    }

    #[test]
    fn test_string_type_accepts_anything() {
        let rules = RuleSet::new().with_data_type(DataType::String);
        assert!(validate(&rules, Some("12!@")).passed());
    }

    #[test]
    fn test_strict_mode_checks() {
        let mut rules = RuleSet::new().with_length(5);
        rules.is_alphanumeric = Some(true);

        assert!(validate(&rules, Some("ab-1")).passed());

        let verdict = Validator::strict().validate(&rules, Some("ab-1"));
        assert_eq!(verdict.reasons.len(), 2);
        assert!(verdict.reasons[0].contains("expected length 5"));
        assert!(verdict.reasons[1].contains("alphanumeric"));

        assert!(Validator::strict().validate(&rules, Some("ab123")).passed());
    }

    #[test]
    fn test_strict_numeric() {
        let mut rules = RuleSet::new();
        rules.is_numeric = Some(true);
        assert!(Validator::strict().validate(&rules, Some("3.14")).passed());
        assert!(!Validator::strict().validate(&rules, Some("pi")).passed());
    }
}
