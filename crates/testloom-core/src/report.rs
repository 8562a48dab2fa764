//! Validation report: every (record, field) pair scored against its rules

use crate::error::{LoomError, Result};
use crate::model::{FieldSpec, SyntheticDataset};
use crate::ports::RuleExtractor;
use crate::rules::RuleSet;
use crate::validator::{ValidationStatus, Validator};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason text for a cell that passed every check
pub const PASSED_REASON: &str = "Passed all checks.";

/// One row of the validation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// `T` plus a 4-digit, 1-based sequence number
    pub test_id: String,
    pub test_value: String,
    pub test_column: String,
    pub description: String,
    pub status: ValidationStatus,
    pub reason: String,
}

/// Ordered results: record-major, then dictionary column order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
}

/// Pass/fail counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl ReportSummary {
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checks: {} passed, {} failed ({:.1}% pass rate)",
            self.total,
            self.passed,
            self.failed,
            self.pass_rate() * 100.0
        )
    }
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn passed(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|r| r.status == ValidationStatus::Passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|r| r.status == ValidationStatus::Failed)
    }

    pub fn summary(&self) -> ReportSummary {
        let passed = self.passed().count();
        ReportSummary {
            total: self.results.len(),
            passed,
            failed: self.results.len() - passed,
        }
    }
}

pub fn format_test_id(sequence: usize) -> String {
    format!("T{:04}", sequence)
}

/// Extract rules once per field, in dictionary order.
///
/// Extraction failures are logged and recorded as empty rule sets, which
/// makes every cell of that field fail with the unparseable-rules reason.
pub async fn extract_all_rules<E>(field_specs: &[FieldSpec], extractor: &E) -> Vec<RuleSet>
where
    E: RuleExtractor + ?Sized,
{
    let mut all = Vec::with_capacity(field_specs.len());
    for spec in field_specs {
        let rules = match extractor.extract_rules(&spec.rule_description).await {
            Ok(rules) => rules,
            Err(error) => {
                tracing::warn!(
                    field = %spec.field_name,
                    %error,
                    "rule extraction failed, treating rules as empty"
                );
                RuleSet::default()
            }
        };
        all.push(rules);
    }
    all
}

/// Score a dataset against already-extracted rules (one per field spec)
pub fn score_dataset(
    field_specs: &[FieldSpec],
    rules: &[RuleSet],
    dataset: &SyntheticDataset,
    validator: &Validator,
) -> Result<ValidationReport> {
    if rules.len() != field_specs.len() {
        return Err(LoomError::InvalidConfiguration(format!(
            "{} rule sets for {} fields",
            rules.len(),
            field_specs.len()
        )));
    }
    check_columns(field_specs, dataset)?;

    let mut results = Vec::with_capacity(dataset.len() * field_specs.len());
    for (row, record) in dataset.records.iter().enumerate() {
        for (spec, rules) in field_specs.iter().zip(rules) {
            let value = record.get(&spec.field_name);
            let verdict = validator.validate(rules, value);
            let reason = if verdict.reasons.is_empty() {
                PASSED_REASON.to_string()
            } else {
                verdict.reasons.join("; ")
            };
            results.push(ValidationResult {
                test_id: format_test_id(results.len() + 1),
                test_value: value.unwrap_or_default().to_string(),
                test_column: spec.field_name.clone(),
                description: format!("{} (Row {}) - Validation Check", spec.field_name, row + 1),
                status: verdict.status,
                reason,
            });
        }
    }

    Ok(ValidationReport { results })
}

/// Extract rules for every field, then score every cell of the dataset
pub async fn validate_dataset<E>(
    field_specs: &[FieldSpec],
    dataset: &SyntheticDataset,
    extractor: &E,
    validator: &Validator,
) -> Result<ValidationReport>
where
    E: RuleExtractor + ?Sized,
{
    check_columns(field_specs, dataset)?;
    let rules = extract_all_rules(field_specs, extractor).await;
    let report = score_dataset(field_specs, &rules, dataset, validator)?;
    tracing::info!(summary = %report.summary(), "validation finished");
    Ok(report)
}

fn check_columns(field_specs: &[FieldSpec], dataset: &SyntheticDataset) -> Result<()> {
    let missing: Vec<&str> = field_specs
        .iter()
        .map(|f| f.field_name.as_str())
        .filter(|name| !dataset.has_column(name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoomError::MalformedInput(format!(
            "dataset is missing dictionary columns: {}",
            missing.join(", ")
        )))
    }
}
