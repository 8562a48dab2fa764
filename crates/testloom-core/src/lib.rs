//! Testloom Core - constrained synthetic test data from data dictionaries
//!
//! Testloom turns a data dictionary into a table of synthetic records with a
//! controlled pattern of invalid cells, then scores every cell against rules
//! extracted from the dictionary.
//!
//! # Architecture
//!
//! The pipeline is built from three engines plus the glue around them:
//!
//! 1. **Invalidation planner** (`plan`): decides which cells must be invalid
//! 2. **Cell synthesizer** (`synth`): fills the plan through a `TextGenerator`
//! 3. **Rule validator** (`rules`, `validator`, `report`): checks values
//!    against structured rules and builds the report
//!
//! External capabilities are injected through the traits in [`ports`], and
//! the [`workflow`] module sequences the steps as an explicit state machine.
//!
//! # Quick Start
//!
//! ```
//! use testloom_core::plan::{compute_plan, PlanRequest};
//!
//! // 10 records, 4 fields, at least 2 invalid per row and 3 per column
//! let plan = compute_plan(&PlanRequest::new(10, 4, 2, 3)).unwrap();
//!
//! assert!(plan.satisfies(2, 3));
//! println!("{}", plan);
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod config;
pub mod describe;
pub mod error;
pub mod model;
pub mod parser;
pub mod plan;
pub mod ports;
pub mod prompts;
pub mod report;
pub mod rules;
pub mod synth;
pub mod table;
pub mod validator;
pub mod workflow;

// Re-export commonly used types for convenience
pub use config::{PipelineConfig, ProviderKind, ProviderSettings};
pub use error::{ExtractionError, GenerationError, LoomError, Result};
pub use model::{DictionaryTable, FieldSpec, SyntheticDataset, SyntheticRecord};
pub use plan::{compute_plan, InvalidationPlan, PlanRequest};
pub use ports::{ModelRuleExtractor, RuleExtractor, TextGenerator};
pub use report::{ValidationReport, ValidationResult};
pub use rules::{DataType, RuleSet};
pub use validator::{CellVerdict, ValidationStatus, Validator};
pub use workflow::{WorkflowController, WorkflowEvent, WorkflowState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers rule prompts with an integer rule and cell prompts with a
    /// value that passes or fails it
    struct IntegerModel;

    #[async_trait]
    impl TextGenerator for IntegerModel {
        async fn generate(&self, prompt: &str) -> std::result::Result<Vec<String>, GenerationError> {
            let reply = if prompt.contains("JSON") {
                r#"{"data_type": "integer", "not_null": true}"#
            } else if prompt.contains("logically invalid") {
                "not-a-number"
            } else {
                "42"
            };
            Ok(vec![reply.to_string()])
        }
    }

    #[tokio::test]
    async fn test_plan_synthesize_validate() {
        let specs = vec![
            FieldSpec::new("age", "1. Integer"),
            FieldSpec::new("count", "1. Integer"),
            FieldSpec::new("score", "1. Integer"),
        ];
        let plan = compute_plan(&PlanRequest::new(6, 3, 1, 2)).unwrap();

        let dataset = synth::synthesize(&specs, &plan, &IntegerModel).await.unwrap();
        let extractor = ModelRuleExtractor::new(IntegerModel);
        let report = report::validate_dataset(&specs, &dataset, &extractor, &Validator::new())
            .await
            .unwrap();

        assert_eq!(report.len(), 18);
        for (i, result) in report.results.iter().enumerate() {
            let (row, col) = (i / 3, i % 3);
            let expected = if plan.is_invalid(row, col) {
                ValidationStatus::Failed
            } else {
                ValidationStatus::Passed
            };
            assert_eq!(result.status, expected, "cell ({}, {})", row, col);
        }
        assert_eq!(report.summary().failed, plan.total_invalid());
    }
}
