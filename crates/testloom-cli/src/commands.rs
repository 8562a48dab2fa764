//! `testloom` subcommands
//!
//! Each command loads its inputs, runs one part of the pipeline and writes
//! its artifact. `run` drives the workflow controller through every step.

use anyhow::{Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use testloom_core::describe::{describe_dictionary, refine_field_specs};
use testloom_core::model::{API_ERROR, GENERATION_ERROR};
use testloom_core::plan::compute_plan_with_rng;
use testloom_core::report::validate_dataset;
use testloom_core::synth::synthesize_with_progress;
use testloom_core::table;
use testloom_core::{
    compute_plan, InvalidationPlan, ModelRuleExtractor, PipelineConfig, PlanRequest,
    SyntheticDataset, TextGenerator, Validator, WorkflowController,
};
use testloom_providers::build_generator;

use crate::console::Console;

/// Flags shared by `synthesize` and `run`
#[derive(Args, Debug, Clone, Default)]
pub struct GenerationArgs {
    /// Number of synthetic records
    #[arg(long)]
    pub records: Option<usize>,

    /// Minimum invalid values per record
    #[arg(long)]
    pub min_row: Option<usize>,

    /// Minimum invalid values per column
    #[arg(long)]
    pub min_col: Option<usize>,

    /// Probability of an invalid cell before repair
    #[arg(long)]
    pub fraction: Option<f64>,

    /// Seed for a reproducible invalidation plan
    #[arg(long)]
    pub seed: Option<u64>,
}

impl GenerationArgs {
    /// Overlay the flags that were given on top of the loaded configuration
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        let generation = &mut config.generation;
        if let Some(records) = self.records {
            generation.record_count = records;
        }
        if let Some(min_row) = self.min_row {
            generation.min_invalid_per_row = min_row;
        }
        if let Some(min_col) = self.min_col {
            generation.min_invalid_per_col = min_col;
        }
        if let Some(fraction) = self.fraction {
            generation.target_invalid_fraction = fraction;
        }
        config
    }
}

fn plan_with_seed(request: &PlanRequest, seed: Option<u64>) -> Result<InvalidationPlan> {
    let plan = match seed {
        Some(seed) => compute_plan_with_rng(request, &mut StdRng::seed_from_u64(seed))?,
        None => compute_plan(request)?,
    };
    Ok(plan)
}

fn text_generator(config: &PipelineConfig) -> Result<Box<dyn TextGenerator>> {
    build_generator(&config.provider).context("configuring the text generator")
}

/// Cells the generator could not fill
pub fn unfilled_cells(dataset: &SyntheticDataset) -> usize {
    dataset
        .columns
        .iter()
        .map(|c| dataset.count_in_column(c, API_ERROR) + dataset.count_in_column(c, GENERATION_ERROR))
        .sum()
}

pub async fn describe(
    config: &PipelineConfig,
    console: Console,
    dictionary: &Path,
    output: &Path,
) -> Result<()> {
    let table = table::read_dictionary_path(dictionary)?;
    console.info(&format!("{} fields in {}", table.len(), dictionary.display()));

    let generator = text_generator(config)?;
    let specs = describe_dictionary(&table, &generator).await?;
    table::write_field_specs_path(output, &specs)?;

    let failed = specs
        .iter()
        .filter(|s| s.rule_description.starts_with("Error:"))
        .count();
    if failed > 0 {
        console.warn(&format!("{} fields could not be described", failed));
    }
    console.success(&format!(
        "Described {} fields → {}",
        specs.len(),
        output.display()
    ));
    Ok(())
}

pub async fn refine(
    config: &PipelineConfig,
    console: Console,
    formatted: &Path,
    feedback: &str,
    output: Option<&Path>,
) -> Result<()> {
    let specs = table::read_field_specs_path(formatted)?;
    let generator = text_generator(config)?;
    let refined = refine_field_specs(&specs, feedback, &generator).await;

    let changed = specs.iter().zip(&refined).filter(|(a, b)| a != b).count();
    let output = output.unwrap_or(formatted);
    table::write_field_specs_path(output, &refined)?;
    console.success(&format!(
        "Refined {}/{} fields → {}",
        changed,
        refined.len(),
        output.display()
    ));
    Ok(())
}

pub fn plan(console: Console, request: &PlanRequest, seed: Option<u64>) -> Result<()> {
    let plan = plan_with_seed(request, seed)?;

    console.header(&format!("Invalidation plan {}×{}", plan.rows(), plan.cols()));
    println!("{}", plan);
    println!();
    for row in 0..plan.rows() {
        console.info(&format!("row {}: {} invalid", row + 1, plan.row_invalid_count(row)));
    }
    let per_column: Vec<String> = (0..plan.cols())
        .map(|col| plan.col_invalid_count(col).to_string())
        .collect();
    println!("  invalid per column: [{}]", per_column.join(", "));
    println!(
        "  {} of {} cells invalid",
        plan.total_invalid(),
        plan.rows() * plan.cols()
    );
    Ok(())
}

pub async fn synthesize(
    config: &PipelineConfig,
    console: Console,
    formatted: &Path,
    seed: Option<u64>,
    output: &Path,
) -> Result<()> {
    let specs = table::read_field_specs_path(formatted)?;
    let plan = plan_with_seed(&config.plan_request(specs.len()), seed)?;
    console.info(&format!(
        "Plan: {} of {} cells invalid",
        plan.total_invalid(),
        plan.rows() * plan.cols()
    ));

    let generator = text_generator(config)?;
    let bar = console.progress(plan.rows(), "Generating");
    let dataset = synthesize_with_progress(&specs, &plan, &generator, |done, total| {
        bar.set_position(done as u64);
        tracing::info!("Generated row {}/{}", done, total);
    })
    .await?;
    bar.finish_and_clear();

    table::write_dataset_path(output, &dataset)?;
    let failed = unfilled_cells(&dataset);
    if failed > 0 {
        console.warn(&format!("{} cells could not be generated", failed));
    }
    console.success(&format!(
        "Generated {} records × {} fields → {}",
        dataset.len(),
        specs.len(),
        output.display()
    ));
    Ok(())
}

pub async fn validate(
    config: &PipelineConfig,
    console: Console,
    formatted: &Path,
    dataset_path: &Path,
    output: &Path,
    json: bool,
) -> Result<()> {
    let specs = table::read_field_specs_path(formatted)?;
    let dataset = table::read_dataset_path(dataset_path)?;

    let extractor = ModelRuleExtractor::new(text_generator(config)?);
    let validator = if config.validation.strict {
        Validator::strict()
    } else {
        Validator::new()
    };
    let report = validate_dataset(&specs, &dataset, &extractor, &validator).await?;
    table::write_report_path(output, &report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    console.header("Validation report");
    console.summary(&report.summary());
    console.success(&format!("Report → {}", output.display()));
    Ok(())
}

/// Options for `testloom run`
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dictionary: PathBuf,
    pub feedback: Option<String>,
    pub seed: Option<u64>,
    pub out_dir: PathBuf,
}

pub async fn run(config: PipelineConfig, console: Console, opts: RunOptions) -> Result<()> {
    std::fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("creating {}", opts.out_dir.display()))?;
    let paths = config.paths.clone();
    let formatted_path = opts.out_dir.join(&paths.formatted_dictionary);
    let dataset_path = opts.out_dir.join(&paths.synthetic_data);
    let report_path = opts.out_dir.join(&paths.validation_report);

    let generator: Arc<dyn TextGenerator> = Arc::from(text_generator(&config)?);
    let extractor = ModelRuleExtractor::new(Arc::clone(&generator));
    let mut controller = WorkflowController::new(config, generator, extractor)?;
    if let Some(seed) = opts.seed {
        controller = controller.with_seed(seed);
    }
    console.header(&format!("Testloom run {}", controller.run_id()));

    let table = table::read_dictionary_path(&opts.dictionary)?;
    let step = controller.state().step_number();
    let specs = controller.generate_test_cases(table).await?;
    table::write_field_specs_path(&formatted_path, specs)?;
    console.success(&format!(
        "[{}] Described {} fields → {}",
        step,
        specs.len(),
        formatted_path.display()
    ));

    let step = controller.state().step_number();
    if let Some(feedback) = opts.feedback.as_deref() {
        let specs = controller.apply_feedback(feedback).await?;
        table::write_field_specs_path(&formatted_path, specs)?;
        console.success(&format!("[{}] Applied feedback to {} fields", step, specs.len()));
    }
    controller.accept_review()?;

    let step = controller.state().step_number();
    let bar = console.progress(controller.config().generation.record_count, "Generating");
    let dataset = controller
        .generate_synthetic_with_progress(|done, total| {
            bar.set_position(done as u64);
            tracing::info!("Generated row {}/{}", done, total);
        })
        .await?;
    bar.finish_and_clear();
    table::write_dataset_path(&dataset_path, dataset)?;
    let unfilled = unfilled_cells(dataset);
    if unfilled > 0 {
        console.warn(&format!("{} cells could not be generated", unfilled));
    }
    console.success(&format!(
        "[{}] Generated {} records → {}",
        step,
        dataset.len(),
        dataset_path.display()
    ));

    let step = controller.state().step_number();
    let report = controller.validate().await?;
    table::write_report_path(&report_path, report)?;
    console.success(&format!(
        "[{}] Validated {} cells → {}",
        step,
        report.len(),
        report_path.display()
    ));
    console.summary(&report.summary());
    Ok(())
}
