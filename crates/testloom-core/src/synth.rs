//! Cell Value Synthesizer
//!
//! Fills a dataset cell by cell, in plan row order and FieldSpec column
//! order, asking the generator for a rule-conforming value where the plan
//! says valid and a rule-violating value where it says invalid.
//!
//! Generator failures are contained to their cell: an error becomes
//! [`API_ERROR`], an empty answer becomes [`GENERATION_ERROR`], and the run
//! always yields a full table.

use crate::error::{LoomError, Result};
use crate::model::{FieldSpec, SyntheticDataset, SyntheticRecord, API_ERROR, GENERATION_ERROR};
use crate::plan::InvalidationPlan;
use crate::ports::{join_fragments, TextGenerator};
use crate::prompts::{cell_value_prompt, CellIntent};

/// Generate one cell value, substituting sentinels on failure
pub async fn synthesize_cell<G>(generator: &G, spec: &FieldSpec, intent: CellIntent) -> String
where
    G: TextGenerator + ?Sized,
{
    let prompt = cell_value_prompt(&spec.rule_description, intent);
    match generator.generate(&prompt).await {
        Ok(fragments) => join_fragments(&fragments).unwrap_or_else(|| GENERATION_ERROR.to_string()),
        Err(error) => {
            tracing::warn!(
                field = %spec.field_name,
                %error,
                "generation failed, substituting sentinel"
            );
            API_ERROR.to_string()
        }
    }
}

/// Fill every cell of `plan`; progress is logged after each row
pub async fn synthesize<G>(
    field_specs: &[FieldSpec],
    plan: &InvalidationPlan,
    generator: &G,
) -> Result<SyntheticDataset>
where
    G: TextGenerator + ?Sized,
{
    synthesize_with_progress(field_specs, plan, generator, |done, total| {
        tracing::info!("Generated row {}/{}", done, total);
    })
    .await
}

/// Fill every cell of `plan`, calling `on_row(done, total)` after each row
pub async fn synthesize_with_progress<G, F>(
    field_specs: &[FieldSpec],
    plan: &InvalidationPlan,
    generator: &G,
    mut on_row: F,
) -> Result<SyntheticDataset>
where
    G: TextGenerator + ?Sized,
    F: FnMut(usize, usize),
{
    if plan.cols() != field_specs.len() {
        return Err(LoomError::InvalidConfiguration(format!(
            "plan has {} columns but the dictionary has {} fields",
            plan.cols(),
            field_specs.len()
        )));
    }

    let columns = field_specs.iter().map(|f| f.field_name.clone()).collect();
    let mut dataset = SyntheticDataset::new(columns);
    let total = plan.rows();

    for row in 0..total {
        let mut record = SyntheticRecord::new();
        for (col, spec) in field_specs.iter().enumerate() {
            let intent = CellIntent::from_invalid(plan.is_invalid(row, col));
            let value = synthesize_cell(generator, spec, intent).await;
            record.insert(spec.field_name.clone(), value);
        }
        dataset.push(record);
        on_row(row + 1, total);
    }

    Ok(dataset)
}
