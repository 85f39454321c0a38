//! Conversion of caller buffers into the engine's native array layout.
//!
//! Everything here is pure: buffers are checked and converted, the engine is
//! never touched. Doubles are passed through as borrowed views; index data is
//! copied into the engine's fixed-width [`HighsInt`].

use crate::error::SessionError;
use crate::ffi::{MATRIX_FORMAT_COLUMN_WISE, MATRIX_FORMAT_ROW_WISE, OBJECTIVE_SENSE_MAXIMIZE, OBJECTIVE_SENSE_MINIMIZE};
use crate::matrix::{MatrixOrientation, SparseMatrix};
use crate::model::{ModelDescriptor, ObjectiveSense};
use highs_sys::HighsInt;

#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// A borrowed numeric buffer whose element type is only known at runtime.
#[derive(Debug, Clone, Copy)]
pub enum HostBuffer<'a> {
    F64(&'a [f64]),
    F32(&'a [f32]),
    I32(&'a [i32]),
    I64(&'a [i64]),
    Usize(&'a [usize]),
}

impl<'a> HostBuffer<'a> {
    pub fn len(&self) -> usize {
        match self {
            HostBuffer::F64(values) => values.len(),
            HostBuffer::F32(values) => values.len(),
            HostBuffer::I32(values) => values.len(),
            HostBuffer::I64(values) => values.len(),
            HostBuffer::Usize(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_kind(&self) -> &'static str {
        match self {
            HostBuffer::F64(_) => "f64",
            HostBuffer::F32(_) => "f32",
            HostBuffer::I32(_) => "i32",
            HostBuffer::I64(_) => "i64",
            HostBuffer::Usize(_) => "usize",
        }
    }

    /// View as doubles. Only `F64` buffers qualify; there is no narrowing or
    /// widening of other element kinds.
    pub fn as_f64(&self, name: &str) -> Result<&'a [f64], SessionError> {
        match *self {
            HostBuffer::F64(values) => Ok(values),
            other => Err(SessionError::buffer(
                name,
                format!("expected a f64 buffer, got {}", other.element_kind()),
            )),
        }
    }

    /// Copy integer data as non-negative indices.
    pub fn to_indices(&self, name: &str) -> Result<Vec<usize>, SessionError> {
        fn convert<T: Copy + std::fmt::Display>(
            name: &str,
            values: &[T],
            cast: impl Fn(T) -> Option<usize>,
        ) -> Result<Vec<usize>, SessionError> {
            values
                .iter()
                .enumerate()
                .map(|(position, &value)| {
                    cast(value).ok_or_else(|| {
                        SessionError::buffer(
                            name,
                            format!("value {value} at position {position} is not a valid index"),
                        )
                    })
                })
                .collect()
        }

        match *self {
            HostBuffer::Usize(values) => Ok(values.to_vec()),
            HostBuffer::I32(values) => convert(name, values, |v| usize::try_from(v).ok()),
            HostBuffer::I64(values) => convert(name, values, |v| usize::try_from(v).ok()),
            other => Err(SessionError::buffer(
                name,
                format!("expected an integer buffer, got {}", other.element_kind()),
            )),
        }
    }
}

impl<'a> From<&'a [f64]> for HostBuffer<'a> {
    fn from(values: &'a [f64]) -> Self {
        HostBuffer::F64(values)
    }
}

impl<'a> From<&'a [f32]> for HostBuffer<'a> {
    fn from(values: &'a [f32]) -> Self {
        HostBuffer::F32(values)
    }
}

impl<'a> From<&'a [i32]> for HostBuffer<'a> {
    fn from(values: &'a [i32]) -> Self {
        HostBuffer::I32(values)
    }
}

impl<'a> From<&'a [i64]> for HostBuffer<'a> {
    fn from(values: &'a [i64]) -> Self {
        HostBuffer::I64(values)
    }
}

impl<'a> From<&'a [usize]> for HostBuffer<'a> {
    fn from(values: &'a [usize]) -> Self {
        HostBuffer::Usize(values)
    }
}

/// Compressed matrix ready for the engine: converted offsets and indices,
/// borrowed values.
#[derive(Debug, Clone)]
pub(crate) struct RawMatrix<'a> {
    pub format: HighsInt,
    pub start: Vec<HighsInt>,
    pub index: Vec<HighsInt>,
    pub value: &'a [f64],
    pub num_nz: HighsInt,
}

/// A whole model in the argument layout of `Highs_passModel`.
#[derive(Debug, Clone)]
pub(crate) struct RawModel<'a> {
    pub num_col: HighsInt,
    pub num_row: HighsInt,
    pub sense: HighsInt,
    pub offset: f64,
    pub col_cost: &'a [f64],
    pub col_lower: &'a [f64],
    pub col_upper: &'a [f64],
    pub row_lower: &'a [f64],
    pub row_upper: &'a [f64],
    pub matrix: RawMatrix<'a>,
    pub hessian: Option<RawMatrix<'a>>,
    pub integrality: Option<Vec<HighsInt>>,
}

/// Check a dense double buffer against its expected length.
pub fn dense<'a>(name: &str, buffer: &'a [f64], expected: usize) -> Result<&'a [f64], SessionError> {
    if buffer.len() != expected {
        return Err(SessionError::buffer(
            name,
            format!("expected {} entries, got {}", expected, buffer.len()),
        ));
    }
    Ok(buffer)
}

/// Like [`dense`], for buffers the caller may leave out.
pub fn optional_dense<'a>(
    name: &str,
    buffer: Option<&'a [f64]>,
    expected: usize,
) -> Result<Option<&'a [f64]>, SessionError> {
    buffer.map(|values| dense(name, values, expected)).transpose()
}

/// Unwrap a buffer that must be present.
pub fn required<T>(name: &str, buffer: Option<T>) -> Result<T, SessionError> {
    buffer.ok_or_else(|| SessionError::buffer(name, "missing"))
}

/// Convert a count into the engine integer width.
pub(crate) fn count(name: &str, value: usize) -> Result<HighsInt, SessionError> {
    HighsInt::try_from(value).map_err(|_| {
        SessionError::buffer(name, format!("{value} exceeds the engine integer range"))
    })
}

/// Copy index data into the engine integer width.
pub fn indices(name: &str, values: &[usize]) -> Result<Vec<HighsInt>, SessionError> {
    let convert = |(position, &value): (usize, &usize)| {
        HighsInt::try_from(value).map_err(|_| {
            SessionError::buffer(
                name,
                format!("value {value} at position {position} exceeds the engine integer range"),
            )
        })
    };

    #[cfg(feature = "parallel")]
    if values.len() >= PARALLEL_THRESHOLD {
        use rayon::prelude::*;
        return values.par_iter().enumerate().map(convert).collect();
    }

    values.iter().enumerate().map(convert).collect()
}

/// Validate `matrix` as a `major × minor` compressed matrix and convert it.
pub(crate) fn marshal_matrix<'a>(
    name: &str,
    matrix: &'a SparseMatrix,
    major: usize,
    minor: usize,
) -> Result<RawMatrix<'a>, SessionError> {
    matrix.validate(name, major, minor)?;
    let format = match matrix.orientation {
        MatrixOrientation::RowWise => MATRIX_FORMAT_ROW_WISE,
        MatrixOrientation::ColumnWise => MATRIX_FORMAT_COLUMN_WISE,
    };
    Ok(RawMatrix {
        format,
        // The engine reads one start per major slice; the trailing offset is
        // carried separately as the non-zero count.
        start: indices(&format!("{name}.offsets"), &matrix.offsets[..major])?,
        index: indices(&format!("{name}.indices"), &matrix.indices)?,
        value: &matrix.values,
        num_nz: count(&format!("{name}.values"), matrix.values.len())?,
    })
}

/// Validate a descriptor and lay it out for `Highs_passModel`.
pub(crate) fn marshal_model(model: &ModelDescriptor) -> Result<RawModel<'_>, SessionError> {
    model.validate()?;
    let cols = model.column_count;
    let rows = model.row_count;

    let (major, minor) = model.matrix.orientation.major_minor(rows, cols);
    let matrix = marshal_matrix("matrix", &model.matrix, major, minor)?;
    let hessian = model
        .hessian
        .as_ref()
        .map(|hessian| {
            hessian.validate_lower_triangular("hessian")?;
            marshal_matrix("hessian", hessian, cols, cols)
        })
        .transpose()?;
    let integrality = model
        .integrality
        .as_ref()
        .map(|types| types.iter().map(|column_type| column_type.code()).collect());

    Ok(RawModel {
        num_col: count("column_count", cols)?,
        num_row: count("row_count", rows)?,
        sense: match model.sense {
            ObjectiveSense::Minimize => OBJECTIVE_SENSE_MINIMIZE,
            ObjectiveSense::Maximize => OBJECTIVE_SENSE_MAXIMIZE,
        },
        offset: model.offset,
        col_cost: dense("linear_weights", &model.linear_weights, cols)?,
        col_lower: dense("column_lower", &model.column_lower, cols)?,
        col_upper: dense("column_upper", &model.column_upper, cols)?,
        row_lower: dense("row_lower", &model.row_lower, rows)?,
        row_upper: dense("row_upper", &model.row_upper, rows)?,
        matrix,
        hessian,
        integrality,
    })
}

/// Validate a block of new rows against the current column count.
pub(crate) fn marshal_rows<'a>(
    row_count: usize,
    column_count: usize,
    matrix: &'a SparseMatrix,
) -> Result<RawMatrix<'a>, SessionError> {
    if matrix.orientation != MatrixOrientation::RowWise {
        return Err(SessionError::buffer(
            "matrix",
            "new rows must be given row-wise",
        ));
    }
    marshal_matrix("matrix", matrix, row_count, column_count)
}
