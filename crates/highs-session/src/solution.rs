//! Solution vectors, warm-start hints and primal assessment.

use crate::error::SessionError;
use crate::ffi::LpSnapshot;
use crate::marshal::optional_dense;
use crate::model::ColumnType;
use serde::Serialize;

/// Solution read back from the engine.
///
/// Vectors always have the model's column and row counts; they are
/// zero-filled when the matching validity flag is false.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Solution {
    pub is_value_valid: bool,
    pub is_dual_valid: bool,
    pub column_values: Vec<f64>,
    pub column_dual_values: Vec<f64>,
    pub row_values: Vec<f64>,
    pub row_dual_values: Vec<f64>,
}

impl Solution {
    /// An invalid, zero-filled solution of the given shape.
    pub fn empty(num_col: usize, num_row: usize) -> Self {
        Self {
            is_value_valid: false,
            is_dual_valid: false,
            column_values: vec![0.0; num_col],
            column_dual_values: vec![0.0; num_col],
            row_values: vec![0.0; num_row],
            row_dual_values: vec![0.0; num_row],
        }
    }

    pub fn get_primal(&self, column: usize) -> Option<f64> {
        self.is_value_valid
            .then(|| self.column_values.get(column).copied())
            .flatten()
    }

    pub fn get_row_dual(&self, row: usize) -> Option<f64> {
        self.is_dual_valid
            .then(|| self.row_dual_values.get(row).copied())
            .flatten()
    }

    pub(crate) fn clear_invalid(&mut self) {
        if !self.is_value_valid {
            self.column_values.fill(0.0);
            self.row_values.fill(0.0);
        }
        if !self.is_dual_valid {
            self.column_dual_values.fill(0.0);
            self.row_dual_values.fill(0.0);
        }
    }
}

/// A warm-start hint; any vector may be left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialSolution {
    pub column_values: Option<Vec<f64>>,
    pub row_values: Option<Vec<f64>>,
    pub column_dual_values: Option<Vec<f64>>,
    pub row_dual_values: Option<Vec<f64>>,
}

impl PartialSolution {
    pub fn primal(column_values: Vec<f64>) -> Self {
        Self {
            column_values: Some(column_values),
            ..Self::default()
        }
    }

    pub fn with_row_values(mut self, values: Vec<f64>) -> Self {
        self.row_values = Some(values);
        self
    }

    pub fn with_column_duals(mut self, values: Vec<f64>) -> Self {
        self.column_dual_values = Some(values);
        self
    }

    pub fn with_row_duals(mut self, values: Vec<f64>) -> Self {
        self.row_dual_values = Some(values);
        self
    }

    /// Whether the engine takes this hint as primal values for a model with
    /// `num_col` columns. Row values alone are ignored.
    pub fn installs_primal(&self, num_col: usize) -> bool {
        self.column_values.is_some() && num_col > 0
    }

    /// Whether the engine takes this hint as dual values for a model with
    /// `num_row` rows. Column duals are only derived from row duals, never
    /// installed on their own.
    pub fn installs_dual(&self, num_row: usize) -> bool {
        self.row_dual_values.is_some() && num_row > 0
    }

    /// Check every supplied vector against the model shape.
    pub(crate) fn validate(&self, num_col: usize, num_row: usize) -> Result<(), SessionError> {
        optional_dense("column_values", self.column_values.as_deref(), num_col)?;
        optional_dense("row_values", self.row_values.as_deref(), num_row)?;
        optional_dense("column_dual_values", self.column_dual_values.as_deref(), num_col)?;
        optional_dense("row_dual_values", self.row_dual_values.as_deref(), num_row)?;
        Ok(())
    }
}

/// Outcome of checking the current primal values against the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PrimalAssessment {
    pub is_valid: bool,
    pub is_integral: bool,
    pub is_feasible: bool,
}

/// How the engine formats a written solution file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolutionStyle {
    /// Machine readable, suitable for reading back.
    #[default]
    Raw,
    /// Human readable table.
    Pretty,
}

impl SolutionStyle {
    pub fn code(self) -> i32 {
        match self {
            SolutionStyle::Raw => 0,
            SolutionStyle::Pretty => 1,
        }
    }
}

impl TryFrom<i32> for SolutionStyle {
    type Error = SessionError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SolutionStyle::Raw),
            1 => Ok(SolutionStyle::Pretty),
            _ => Err(SessionError::argument(format!("Unexpected style {code}"))),
        }
    }
}

impl std::str::FromStr for SolutionStyle {
    type Err = SessionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "raw" => Ok(SolutionStyle::Raw),
            "pretty" => Ok(SolutionStyle::Pretty),
            other => Err(SessionError::argument(format!("Unexpected style '{other}'"))),
        }
    }
}

fn within(value: f64, lower: f64, upper: f64, tolerance: f64) -> bool {
    value >= lower - tolerance && value <= upper + tolerance
}

/// Assess `column_values` against a copy of the engine's LP.
///
/// Row activities are recomputed from the column-wise matrix. Semi-variables
/// may sit at zero outside their bounds.
pub(crate) fn assess_primal(
    lp: &LpSnapshot,
    column_values: &[f64],
    primal_tolerance: f64,
    integrality_tolerance: f64,
) -> PrimalAssessment {
    if column_values.len() != lp.num_col || column_values.iter().any(|value| !value.is_finite()) {
        return PrimalAssessment::default();
    }

    let mut activity = vec![0.0; lp.num_row];
    for (col, &value) in column_values.iter().enumerate() {
        let (Some(&start), Some(&end)) = (lp.a_start.get(col), lp.a_start.get(col + 1)) else {
            return PrimalAssessment::default();
        };
        let (Ok(start), Ok(end)) = (usize::try_from(start), usize::try_from(end)) else {
            return PrimalAssessment::default();
        };
        for pos in start..end {
            let (Some(&row), Some(&coefficient)) = (lp.a_index.get(pos), lp.a_value.get(pos)) else {
                return PrimalAssessment::default();
            };
            match usize::try_from(row).ok().and_then(|row| activity.get_mut(row)) {
                Some(slot) => *slot += coefficient * value,
                None => return PrimalAssessment::default(),
            }
        }
    }

    let mut is_integral = true;
    let mut bounds_ok = true;
    for (col, &value) in column_values.iter().enumerate() {
        let column_type = lp
            .integrality
            .get(col)
            .copied()
            .and_then(ColumnType::from_code)
            .unwrap_or_default();
        if column_type.is_integral() && (value - value.round()).abs() > integrality_tolerance {
            is_integral = false;
        }
        let at_zero = column_type.is_semi() && value.abs() <= primal_tolerance;
        if !at_zero && !within(value, lp.col_lower[col], lp.col_upper[col], primal_tolerance) {
            bounds_ok = false;
        }
    }
    let rows_ok = activity
        .iter()
        .enumerate()
        .all(|(row, &value)| within(value, lp.row_lower[row], lp.row_upper[row], primal_tolerance));

    PrimalAssessment {
        is_valid: true,
        is_integral,
        is_feasible: bounds_ok && rows_ok && is_integral,
    }
}
