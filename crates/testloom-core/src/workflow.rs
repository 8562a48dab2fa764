//! Workflow state machine and controller
//!
//! The workflow is an explicit value: a `WorkflowState` moved forward by
//! `WorkflowEvent`s through the pure [`transition`] function. The
//! `WorkflowController` owns the state together with the artifacts each step
//! produces, and checks the transition before doing any work so a rejected
//! step never touches the artifacts.
//!
//! ```text
//! UploadDictionary ──TestCasesGenerated──▶ ReviewDictionary ◀─┐ FeedbackApplied
//!                                             │ ReviewAccepted ─┘
//!                                             ▼
//!                  GenerateSynthetic ──SyntheticDataGenerated──▶ Validate
//!                                                                  │ ValidationCompleted
//!                                                                  ▼
//!                                                                 Done
//! ```
//!
//! `Reset` returns to `UploadDictionary` from any state.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::config::PipelineConfig;
use crate::describe::{describe_dictionary, refine_field_specs};
use crate::error::{LoomError, Result};
use crate::model::{DictionaryTable, FieldSpec, SyntheticDataset};
use crate::plan::{compute_plan, compute_plan_with_rng};
use crate::ports::{RuleExtractor, TextGenerator};
use crate::report::{validate_dataset, ValidationReport};
use crate::synth::synthesize_with_progress;
use crate::validator::Validator;
use uuid::Uuid;

/// Workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    UploadDictionary,
    ReviewDictionary,
    GenerateSynthetic,
    Validate,
    Done,
}

/// Something that happened in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    TestCasesGenerated,
    FeedbackApplied,
    ReviewAccepted,
    SyntheticDataGenerated,
    ValidationCompleted,
    Reset,
}

impl WorkflowState {
    /// 1-based step number as shown to users
    pub fn step_number(self) -> u8 {
        match self {
            Self::UploadDictionary => 1,
            Self::ReviewDictionary => 2,
            Self::GenerateSynthetic => 3,
            Self::Validate => 4,
            Self::Done => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Next state for `(state, event)`, or `InvalidTransition`
pub fn transition(state: WorkflowState, event: WorkflowEvent) -> Result<WorkflowState> {
    use WorkflowEvent::*;
    use WorkflowState::*;

    match (state, event) {
        (_, Reset) => Ok(UploadDictionary),
        (UploadDictionary, TestCasesGenerated) => Ok(ReviewDictionary),
        (ReviewDictionary, FeedbackApplied) => Ok(ReviewDictionary),
        (ReviewDictionary, ReviewAccepted) => Ok(GenerateSynthetic),
        (GenerateSynthetic, SyntheticDataGenerated) => Ok(Validate),
        (Validate, ValidationCompleted) => Ok(Done),
        (from, event) => Err(LoomError::InvalidTransition {
            from: from.to_string(),
            event: event.to_string(),
        }),
    }
}

/// Drives one run of the workflow with injected collaborators
pub struct WorkflowController<G, E> {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    state: WorkflowState,
    config: PipelineConfig,
    generator: G,
    extractor: E,
    seed: Option<u64>,
    dictionary: Option<DictionaryTable>,
    field_specs: Vec<FieldSpec>,
    dataset: Option<SyntheticDataset>,
    report: Option<ValidationReport>,
}

impl<G, E> fmt::Debug for WorkflowController<G, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowController")
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("fields", &self.field_specs.len())
            .field("records", &self.dataset.as_ref().map(SyntheticDataset::len))
            .finish()
    }
}

impl<G: TextGenerator, E: RuleExtractor> WorkflowController<G, E> {
    pub fn new(config: PipelineConfig, generator: G, extractor: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            state: WorkflowState::UploadDictionary,
            config,
            generator,
            extractor,
            seed: None,
            dictionary: None,
            field_specs: Vec::new(),
            dataset: None,
            report: None,
        })
    }

    /// Make plan computation reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn dictionary(&self) -> Option<&DictionaryTable> {
        self.dictionary.as_ref()
    }

    pub fn field_specs(&self) -> &[FieldSpec] {
        &self.field_specs
    }

    pub fn dataset(&self) -> Option<&SyntheticDataset> {
        self.dataset.as_ref()
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    fn commit(&mut self, event: WorkflowEvent, next: WorkflowState) {
        tracing::info!(
            run_id = %self.run_id,
            from = %self.state,
            to = %next,
            %event,
            "workflow transition"
        );
        self.state = next;
    }

    /// Step 1: describe every dictionary row
    pub async fn generate_test_cases(&mut self, table: DictionaryTable) -> Result<&[FieldSpec]> {
        let next = transition(self.state, WorkflowEvent::TestCasesGenerated)?;
        // Everything the model cannot change is checked before the first call.
        check_field_names((0..table.len()).map(|row| table.field_name(row).unwrap_or_default()))?;
        self.config.plan_request(table.len()).validate()?;
        let specs = describe_dictionary(&table, &self.generator).await?;
        self.dictionary = Some(table);
        self.field_specs = specs;
        self.commit(WorkflowEvent::TestCasesGenerated, next);
        Ok(&self.field_specs)
    }

    /// Step 1, alternative: start from an already formatted dictionary
    pub fn load_field_specs(&mut self, specs: Vec<FieldSpec>) -> Result<&[FieldSpec]> {
        let next = transition(self.state, WorkflowEvent::TestCasesGenerated)?;
        check_field_specs(&specs)?;
        self.config.plan_request(specs.len()).validate()?;
        self.field_specs = specs;
        self.commit(WorkflowEvent::TestCasesGenerated, next);
        Ok(&self.field_specs)
    }

    /// Step 2: refine every field with reviewer feedback
    pub async fn apply_feedback(&mut self, feedback: &str) -> Result<&[FieldSpec]> {
        let next = transition(self.state, WorkflowEvent::FeedbackApplied)?;
        if !feedback.trim().is_empty() {
            self.field_specs = refine_field_specs(&self.field_specs, feedback, &self.generator).await;
        }
        self.commit(WorkflowEvent::FeedbackApplied, next);
        Ok(&self.field_specs)
    }

    /// Step 2: replace the field specs with a manually edited version
    pub fn replace_field_specs(&mut self, specs: Vec<FieldSpec>) -> Result<&[FieldSpec]> {
        let next = transition(self.state, WorkflowEvent::FeedbackApplied)?;
        check_field_specs(&specs)?;
        self.config.plan_request(specs.len()).validate()?;
        self.field_specs = specs;
        self.commit(WorkflowEvent::FeedbackApplied, next);
        Ok(&self.field_specs)
    }

    /// Step 2 → 3
    pub fn accept_review(&mut self) -> Result<()> {
        let next = transition(self.state, WorkflowEvent::ReviewAccepted)?;
        self.commit(WorkflowEvent::ReviewAccepted, next);
        Ok(())
    }

    /// Step 3: plan and synthesize the dataset
    pub async fn generate_synthetic(&mut self) -> Result<&SyntheticDataset> {
        self.generate_synthetic_with_progress(|done, total| {
            tracing::info!("Generated row {}/{}", done, total);
        })
        .await
    }

    /// Step 3, reporting progress after every row
    pub async fn generate_synthetic_with_progress<F>(&mut self, on_row: F) -> Result<&SyntheticDataset>
    where
        F: FnMut(usize, usize),
    {
        let next = transition(self.state, WorkflowEvent::SyntheticDataGenerated)?;
        let request = self.config.plan_request(self.field_specs.len());
        let plan = match self.seed {
            Some(seed) => compute_plan_with_rng(&request, &mut StdRng::seed_from_u64(seed))?,
            None => compute_plan(&request)?,
        };

        let dataset =
            synthesize_with_progress(&self.field_specs, &plan, &self.generator, on_row).await?;
        self.commit(WorkflowEvent::SyntheticDataGenerated, next);
        Ok(self.dataset.insert(dataset))
    }

    /// Step 4: extract rules and validate every cell
    pub async fn validate(&mut self) -> Result<&ValidationReport> {
        let next = transition(self.state, WorkflowEvent::ValidationCompleted)?;
        let dataset = self.dataset.as_ref().ok_or_else(|| {
            LoomError::MalformedInput("no synthetic dataset to validate".into())
        })?;

        let validator = if self.config.validation.strict {
            Validator::strict()
        } else {
            Validator::new()
        };
        let report = validate_dataset(&self.field_specs, dataset, &self.extractor, &validator).await?;
        self.commit(WorkflowEvent::ValidationCompleted, next);
        Ok(self.report.insert(report))
    }

    /// Discard every artifact and return to step 1
    pub fn reset(&mut self) {
        let next = WorkflowState::UploadDictionary;
        self.commit(WorkflowEvent::Reset, next);
        self.run_id = Uuid::new_v4();
        self.started_at = Utc::now();
        self.dictionary = None;
        self.field_specs.clear();
        self.dataset = None;
        self.report = None;
    }
}

fn check_field_specs(specs: &[FieldSpec]) -> Result<()> {
    check_field_names(specs.iter().map(|spec| spec.field_name.as_str()))
}

fn check_field_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(LoomError::MalformedInput("field with an empty name".into()));
        }
        if !seen.insert(name) {
            return Err(LoomError::MalformedInput(format!(
                "duplicate field name '{}'",
                name
            )));
        }
    }
    if seen.is_empty() {
        return Err(LoomError::MalformedInput("dictionary has no fields".into()));
    }
    Ok(())
}
