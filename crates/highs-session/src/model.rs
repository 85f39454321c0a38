//! Owned model descriptor handed to [`crate::Session::pass_model`].

use crate::error::SessionError;
use crate::matrix::SparseMatrix;
use highs_sys::HighsInt;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveSense {
    #[default]
    Minimize,
    Maximize,
}

/// Per-column variable type, in the engine's integrality encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[default]
    Continuous,
    Integer,
    SemiContinuous,
    SemiInteger,
    ImplicitInteger,
}

impl ColumnType {
    pub fn code(self) -> HighsInt {
        match self {
            ColumnType::Continuous => 0,
            ColumnType::Integer => 1,
            ColumnType::SemiContinuous => 2,
            ColumnType::SemiInteger => 3,
            ColumnType::ImplicitInteger => 4,
        }
    }

    pub fn from_code(code: HighsInt) -> Option<Self> {
        match code {
            0 => Some(ColumnType::Continuous),
            1 => Some(ColumnType::Integer),
            2 => Some(ColumnType::SemiContinuous),
            3 => Some(ColumnType::SemiInteger),
            4 => Some(ColumnType::ImplicitInteger),
            _ => None,
        }
    }

    /// Whether a value in this column must be integral.
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::SemiInteger | ColumnType::ImplicitInteger
        )
    }

    /// Semi-variables may also sit at zero outside their bounds.
    pub fn is_semi(self) -> bool {
        matches!(self, ColumnType::SemiContinuous | ColumnType::SemiInteger)
    }
}

/// A complete optimization model:
///
/// ```text
/// min/max  offset + linear_weights·x + ½ x'Hx
/// s.t.     row_lower <= A x <= row_upper
///          column_lower <= x <= column_upper
/// ```
///
/// Infinite bounds are `f64::INFINITY`; the engine also treats any magnitude
/// of at least `1e20` as infinite, which is how JSON models spell them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub column_count: usize,
    pub row_count: usize,
    #[serde(default)]
    pub sense: ObjectiveSense,
    #[serde(default)]
    pub offset: f64,
    pub linear_weights: Vec<f64>,
    pub column_lower: Vec<f64>,
    pub column_upper: Vec<f64>,
    pub row_lower: Vec<f64>,
    pub row_upper: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrality: Option<Vec<ColumnType>>,
    pub matrix: SparseMatrix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hessian: Option<SparseMatrix>,
}

impl ModelDescriptor {
    /// A model with zero weights and free columns and rows.
    pub fn new(column_count: usize, row_count: usize, matrix: SparseMatrix) -> Self {
        Self {
            column_count,
            row_count,
            sense: ObjectiveSense::Minimize,
            offset: 0.0,
            linear_weights: vec![0.0; column_count],
            column_lower: vec![f64::NEG_INFINITY; column_count],
            column_upper: vec![f64::INFINITY; column_count],
            row_lower: vec![f64::NEG_INFINITY; row_count],
            row_upper: vec![f64::INFINITY; row_count],
            integrality: None,
            matrix,
            hessian: None,
        }
    }

    pub fn with_sense(mut self, sense: ObjectiveSense) -> Self {
        self.sense = sense;
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_linear_weights(mut self, weights: Vec<f64>) -> Self {
        self.linear_weights = weights;
        self
    }

    pub fn with_column_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.column_lower = lower;
        self.column_upper = upper;
        self
    }

    pub fn with_row_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.row_lower = lower;
        self.row_upper = upper;
        self
    }

    pub fn with_integrality(mut self, integrality: Vec<ColumnType>) -> Self {
        self.integrality = Some(integrality);
        self
    }

    pub fn with_hessian(mut self, hessian: SparseMatrix) -> Self {
        self.hessian = Some(hessian);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json)
            .map_err(|err| SessionError::argument(format!("invalid model JSON: {err}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            SessionError::argument(format!("cannot read model '{}': {}", path.display(), err))
        })?;
        Self::from_json_str(&text)
    }

    /// Check every per-column and per-row array against the declared counts
    /// and the sparse structure of the matrix and Hessian.
    pub fn validate(&self) -> Result<(), SessionError> {
        let cols = self.column_count;
        let rows = self.row_count;
        let columns = [
            ("linear_weights", self.linear_weights.len()),
            ("column_lower", self.column_lower.len()),
            ("column_upper", self.column_upper.len()),
        ];
        for (name, len) in columns {
            if len != cols {
                return Err(SessionError::buffer(
                    name,
                    format!("expected {cols} entries (one per column), got {len}"),
                ));
            }
        }
        for (name, len) in [
            ("row_lower", self.row_lower.len()),
            ("row_upper", self.row_upper.len()),
        ] {
            if len != rows {
                return Err(SessionError::buffer(
                    name,
                    format!("expected {rows} entries (one per row), got {len}"),
                ));
            }
        }
        if let Some(integrality) = &self.integrality {
            if integrality.len() != cols {
                return Err(SessionError::buffer(
                    "integrality",
                    format!("expected {} entries (one per column), got {}", cols, integrality.len()),
                ));
            }
        }

        let (major, minor) = self.matrix.orientation.major_minor(rows, cols);
        self.matrix.validate("matrix", major, minor)?;
        if let Some(hessian) = &self.hessian {
            hessian.validate("hessian", cols, cols)?;
            hessian.validate_lower_triangular("hessian")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::matrix::MatrixOrientation;

    #[test]
    fn test_new_defaults() {
        let model = ModelDescriptor::new(3, 2, SparseMatrix::empty(MatrixOrientation::RowWise, 2));
        assert_eq!(model.linear_weights, vec![0.0; 3]);
        assert!(model.column_lower.iter().all(|v| v.is_infinite() && *v < 0.0));
        assert!(model.row_upper.iter().all(|v| v.is_infinite() && *v > 0.0));
        assert_eq!(model.sense, ObjectiveSense::Minimize);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_count_mismatch() {
        let model = ModelDescriptor::new(2, 1, SparseMatrix::empty(MatrixOrientation::RowWise, 1))
            .with_linear_weights(vec![1.0]);
        let err = model.validate().unwrap_err();
        assert_eq!(err.code(), "BUFFER_INVALID");
        assert!(err.to_string().contains("linear_weights"));

        let model = ModelDescriptor::new(2, 1, SparseMatrix::empty(MatrixOrientation::RowWise, 1))
            .with_row_bounds(vec![0.0, 0.0], vec![1.0]);
        assert!(model.validate().unwrap_err().to_string().contains("row_lower"));
    }

    #[test]
    fn test_validate_checks_matrix_orientation_dimensions() {
        // Column-wise matrix for 1 row x 2 columns needs 3 offsets.
        let model = ModelDescriptor::new(
            2,
            1,
            SparseMatrix::column_wise(vec![0, 1], vec![0], vec![1.0]),
        );
        assert!(model.validate().is_err());

        let model = ModelDescriptor::new(
            2,
            1,
            SparseMatrix::column_wise(vec![0, 1, 2], vec![0, 0], vec![1.0, 1.0]),
        );
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_validate_integrality_length() {
        let model = ModelDescriptor::new(2, 0, SparseMatrix::empty(MatrixOrientation::RowWise, 0))
            .with_integrality(vec![ColumnType::Integer]);
        assert!(model.validate().unwrap_err().to_string().contains("integrality"));
    }

    #[test]
    fn test_column_type_codes() {
        for code in 0..=4 {
            let column_type = ColumnType::from_code(code).unwrap();
            assert_eq!(column_type.code(), code);
        }
        assert_eq!(ColumnType::from_code(9), None);
        assert!(ColumnType::SemiInteger.is_integral());
        assert!(ColumnType::SemiInteger.is_semi());
        assert!(!ColumnType::Continuous.is_integral());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "column_count": 2,
            "row_count": 1,
            "sense": "maximize",
            "linear_weights": [1.0, 2.0],
            "column_lower": [0.0, 0.0],
            "column_upper": [4.0, 1e30],
            "row_lower": [-1e30],
            "row_upper": [3.0],
            "integrality": ["integer", "continuous"],
            "matrix": {"orientation": "row_wise", "offsets": [0, 2], "indices": [0, 1], "values": [1.0, 1.0]}
        }"#;
        let model = ModelDescriptor::from_json_str(json).unwrap();
        assert_eq!(model.sense, ObjectiveSense::Maximize);
        assert_eq!(model.offset, 0.0);
        assert_eq!(model.integrality, Some(vec![ColumnType::Integer, ColumnType::Continuous]));
        assert!(model.hessian.is_none());
        assert!(model.validate().is_ok());

        let err = ModelDescriptor::from_json_str("{").unwrap_err();
        assert_eq!(err.code(), "ARGUMENT_INVALID");
    }
}
