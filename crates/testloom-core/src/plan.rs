//! Invalidation Plan Generator
//!
//! Decides, before any value is generated, which cells of the synthetic
//! table must hold a rule-violating value.
//!
//! # How it works
//!
//! 1. Seed every cell independently: invalid with probability `target_fraction`
//! 2. Row repair: any row below `min_invalid_per_row` gets that many distinct
//!    columns, sampled uniformly without replacement, forced invalid
//! 3. Column repair: any column below `min_invalid_per_col` (counted after row
//!    repair) gets that many distinct rows forced invalid
//!
//! Both constraints are floors. Column repair may push a row well above its
//! minimum and nothing caps the invalid density.
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use testloom_core::plan::{compute_plan_with_rng, PlanRequest};
//!
//! let request = PlanRequest::new(10, 4, 2, 3);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let plan = compute_plan_with_rng(&request, &mut rng).unwrap();
//!
//! assert!(plan.satisfies(2, 3));
//! ```

use crate::error::{LoomError, Result};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default probability of a cell being invalid before repair
pub const DEFAULT_TARGET_FRACTION: f64 = 0.5;

/// Parameters of a plan computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Number of synthetic records
    pub rows: usize,

    /// Number of fields (one column per FieldSpec)
    pub cols: usize,

    /// Every row needs at least this many invalid cells
    pub min_invalid_per_row: usize,

    /// Every column needs at least this many invalid cells
    pub min_invalid_per_col: usize,

    /// Bernoulli probability used for the unconstrained seed
    pub target_fraction: f64,
}

impl PlanRequest {
    pub fn new(
        rows: usize,
        cols: usize,
        min_invalid_per_row: usize,
        min_invalid_per_col: usize,
    ) -> Self {
        Self {
            rows,
            cols,
            min_invalid_per_row,
            min_invalid_per_col,
            target_fraction: DEFAULT_TARGET_FRACTION,
        }
    }

    pub fn with_target_fraction(mut self, target_fraction: f64) -> Self {
        self.target_fraction = target_fraction;
        self
    }

    /// Reject impossible requests before any sampling happens.
    ///
    /// Minimums larger than the axis they sample from cannot be met with
    /// distinct indices; they are refused rather than clamped.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 {
            return Err(LoomError::InvalidConfiguration(
                "plan needs at least one row".into(),
            ));
        }
        if self.cols == 0 {
            return Err(LoomError::InvalidConfiguration(
                "plan needs at least one column".into(),
            ));
        }
        if self.min_invalid_per_row > self.cols {
            return Err(LoomError::InvalidConfiguration(format!(
                "min invalid per row ({}) exceeds column count ({})",
                self.min_invalid_per_row, self.cols
            )));
        }
        if self.min_invalid_per_col > self.rows {
            return Err(LoomError::InvalidConfiguration(format!(
                "min invalid per column ({}) exceeds row count ({})",
                self.min_invalid_per_col, self.rows
            )));
        }
        if !self.target_fraction.is_finite() || !(0.0..=1.0).contains(&self.target_fraction) {
            return Err(LoomError::InvalidConfiguration(format!(
                "target invalid fraction must be in [0, 1], got {}",
                self.target_fraction
            )));
        }
        Ok(())
    }
}

/// Boolean grid: `true` marks a cell that must receive an invalid value
///
/// Immutable once computed; the only constructor is the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationPlan {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl InvalidationPlan {
    fn all_valid(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
        }
    }

    fn set_invalid(&mut self, row: usize, col: usize) {
        self.cells[row * self.cols + col] = true;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the cell must be invalid. Out-of-range cells are never invalid.
    pub fn is_invalid(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col]
    }

    /// One row of the grid, `None` past the last row
    pub fn row(&self, row: usize) -> Option<&[bool]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.cells.get(start..start + self.cols)
    }

    pub fn row_invalid_count(&self, row: usize) -> usize {
        self.row(row).map_or(0, |cells| cells.iter().filter(|&&c| c).count())
    }

    pub fn col_invalid_count(&self, col: usize) -> usize {
        (0..self.rows).filter(|&r| self.is_invalid(r, col)).count()
    }

    pub fn total_invalid(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Check both floors
    pub fn satisfies(&self, min_invalid_per_row: usize, min_invalid_per_col: usize) -> bool {
        (0..self.rows).all(|r| self.row_invalid_count(r) >= min_invalid_per_row)
            && (0..self.cols).all(|c| self.col_invalid_count(c) >= min_invalid_per_col)
    }
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            let line: String = (0..self.cols)
                .map(|c| if self.is_invalid(r, c) { 'X' } else { '.' })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Compute a plan with the thread-local RNG
pub fn compute_plan(request: &PlanRequest) -> Result<InvalidationPlan> {
    compute_plan_with_rng(request, &mut rand::thread_rng())
}

/// Compute a plan with a caller-supplied RNG
pub fn compute_plan_with_rng<R: Rng>(
    request: &PlanRequest,
    rng: &mut R,
) -> Result<InvalidationPlan> {
    request.validate()?;

    let PlanRequest {
        rows,
        cols,
        min_invalid_per_row,
        min_invalid_per_col,
        target_fraction,
    } = *request;

    let mut plan = InvalidationPlan::all_valid(rows, cols);

    for r in 0..rows {
        for c in 0..cols {
            if rng.gen::<f64>() < target_fraction {
                plan.set_invalid(r, c);
            }
        }
    }

    let mut repaired_rows = 0;
    for r in 0..rows {
        if plan.row_invalid_count(r) < min_invalid_per_row {
            for c in index::sample(rng, cols, min_invalid_per_row) {
                plan.set_invalid(r, c);
            }
            repaired_rows += 1;
        }
    }

    let mut repaired_cols = 0;
    for c in 0..cols {
        if plan.col_invalid_count(c) < min_invalid_per_col {
            for r in index::sample(rng, rows, min_invalid_per_col) {
                plan.set_invalid(r, c);
            }
            repaired_cols += 1;
        }
    }

    tracing::debug!(
        rows,
        cols,
        repaired_rows,
        repaired_cols,
        invalid = plan.total_invalid(),
        "computed invalidation plan"
    );

    Ok(plan)
}
