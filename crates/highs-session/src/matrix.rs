//! Compressed sparse matrices in the engine's offsets/indices/values layout.

use crate::error::SessionError;
use crate::marshal::HostBuffer;
use serde::{Deserialize, Serialize};

/// Storage orientation of a [`SparseMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixOrientation {
    /// Compressed sparse row: one slice per row, indices are columns.
    #[default]
    RowWise,
    /// Compressed sparse column: one slice per column, indices are rows.
    ColumnWise,
}

impl MatrixOrientation {
    /// Split `(rows, cols)` into `(major, minor)` dimensions.
    pub fn major_minor(self, rows: usize, cols: usize) -> (usize, usize) {
        match self {
            MatrixOrientation::RowWise => (rows, cols),
            MatrixOrientation::ColumnWise => (cols, rows),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatrixOrientation::RowWise => "row-wise",
            MatrixOrientation::ColumnWise => "column-wise",
        }
    }
}

/// Sparse matrix as `offsets` (major + 1 entries), minor `indices` and `values`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseMatrix {
    #[serde(default)]
    pub orientation: MatrixOrientation,
    pub offsets: Vec<usize>,
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseMatrix {
    pub fn new(
        orientation: MatrixOrientation,
        offsets: Vec<usize>,
        indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            orientation,
            offsets,
            indices,
            values,
        }
    }

    pub fn row_wise(offsets: Vec<usize>, indices: Vec<usize>, values: Vec<f64>) -> Self {
        Self::new(MatrixOrientation::RowWise, offsets, indices, values)
    }

    pub fn column_wise(offsets: Vec<usize>, indices: Vec<usize>, values: Vec<f64>) -> Self {
        Self::new(MatrixOrientation::ColumnWise, offsets, indices, values)
    }

    /// An empty matrix with `major` empty slices.
    pub fn empty(orientation: MatrixOrientation, major: usize) -> Self {
        Self::new(orientation, vec![0; major + 1], Vec::new(), Vec::new())
    }

    /// Build from dynamically typed host buffers. Offsets and indices must be
    /// integer buffers, values must be a 64-bit float buffer.
    pub fn from_host(
        orientation: MatrixOrientation,
        offsets: HostBuffer<'_>,
        indices: HostBuffer<'_>,
        values: HostBuffer<'_>,
    ) -> Result<Self, SessionError> {
        Ok(Self::new(
            orientation,
            offsets.to_indices("offsets")?,
            indices.to_indices("indices")?,
            values.as_f64("values")?.to_vec(),
        ))
    }

    /// Number of major slices described by `offsets`.
    pub fn major_len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterate `(major, minor, value)` entries.
    ///
    /// Positions past the end of `indices` or `values` are skipped; call
    /// [`SparseMatrix::validate`] first to reject such matrices.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.offsets.windows(2).enumerate().flat_map(move |(major, bounds)| {
            (bounds[0]..bounds[1].max(bounds[0])).filter_map(move |pos| {
                Some((major, *self.indices.get(pos)?, *self.values.get(pos)?))
            })
        })
    }

    /// Check the structural invariants against the expected dimensions.
    ///
    /// `offsets` must hold `major + 1` non-decreasing entries starting at 0,
    /// `indices` and `values` must have `offsets[major]` entries and every
    /// index must be below `minor`.
    pub fn validate(&self, name: &str, major: usize, minor: usize) -> Result<(), SessionError> {
        if self.offsets.len() != major + 1 {
            return Err(SessionError::buffer(
                format!("{name}.offsets"),
                format!(
                    "expected {} entries for {} {} slices, got {}",
                    major + 1,
                    major,
                    self.orientation.as_str(),
                    self.offsets.len()
                ),
            ));
        }
        if self.offsets.first().copied().unwrap_or(0) != 0 {
            return Err(SessionError::buffer(
                format!("{name}.offsets"),
                "first offset must be 0",
            ));
        }
        if let Some(position) = self.offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(SessionError::buffer(
                format!("{name}.offsets"),
                format!("offsets must be non-decreasing (slice {position})"),
            ));
        }
        if self.indices.len() != self.values.len() {
            return Err(SessionError::buffer(
                format!("{name}.indices"),
                format!(
                    "indices length ({}) must match values length ({})",
                    self.indices.len(),
                    self.values.len()
                ),
            ));
        }
        let nnz = self.offsets.last().copied().unwrap_or(0);
        if nnz != self.values.len() {
            return Err(SessionError::buffer(
                format!("{name}.values"),
                format!(
                    "last offset ({}) must equal values length ({})",
                    nnz,
                    self.values.len()
                ),
            ));
        }
        if let Some(position) = self.indices.iter().position(|&index| index >= minor) {
            return Err(SessionError::buffer(
                format!("{name}.indices"),
                format!(
                    "index {} at position {} out of bounds (dimension = {})",
                    self.indices[position], position, minor
                ),
            ));
        }
        Ok(())
    }

    /// Check that a column-wise square matrix only stores its lower triangle.
    pub fn validate_lower_triangular(&self, name: &str) -> Result<(), SessionError> {
        if self.orientation != MatrixOrientation::ColumnWise {
            return Err(SessionError::buffer(name, "Hessian must be column-oriented"));
        }
        let dim = self.major_len();
        self.validate(name, dim, dim)?;
        if let Some((col, row, _)) = self.entries().find(|&(col, row, _)| row < col) {
            return Err(SessionError::buffer(
                name,
                format!("entry ({row}, {col}) lies above the diagonal; store the lower triangle only"),
            ));
        }
        Ok(())
    }

    /// Assemble a compressed matrix from `(row, col, value)` triplets.
    ///
    /// Entries are sorted within each slice; duplicate coordinates are summed.
    pub fn from_triplets(
        orientation: MatrixOrientation,
        rows: usize,
        cols: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Result<Self, SessionError> {
        let (major_dim, minor_dim) = orientation.major_minor(rows, cols);
        let mut keyed: Vec<(usize, usize, f64)> = Vec::with_capacity(triplets.len());
        for (position, &(row, col, value)) in triplets.iter().enumerate() {
            if row >= rows || col >= cols {
                return Err(SessionError::buffer(
                    "triplets",
                    format!("entry ({row}, {col}) at position {position} outside {rows}x{cols}"),
                ));
            }
            let (major, minor) = orientation.major_minor(row, col);
            keyed.push((major, minor, value));
        }
        keyed.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut offsets = vec![0usize; major_dim + 1];
        let mut indices = Vec::with_capacity(keyed.len());
        let mut values: Vec<f64> = Vec::with_capacity(keyed.len());
        let mut previous: Option<(usize, usize)> = None;
        for (major, minor, value) in keyed {
            if previous == Some((major, minor)) {
                if let Some(last) = values.last_mut() {
                    *last += value;
                }
                continue;
            }
            previous = Some((major, minor));
            indices.push(minor);
            values.push(value);
            offsets[major + 1] += 1;
        }
        for slice in 0..major_dim {
            offsets[slice + 1] += offsets[slice];
        }
        debug_assert!(indices.iter().all(|&i| i < minor_dim));
        Ok(Self::new(orientation, offsets, indices, values))
    }

    /// Turn row-wise upper-triangle quadratic objective weights into the
    /// engine's column-wise lower-triangle Hessian.
    ///
    /// The engine minimizes `c'x + ½ x'Qx`, so diagonal entries are doubled to
    /// keep the effective weight of `x_i²` equal to the input weight. Entries
    /// below the diagonal are ignored.
    pub fn hessian_from_quadratic_weights(
        weights: &SparseMatrix,
        dimension: usize,
    ) -> Result<Self, SessionError> {
        if weights.orientation != MatrixOrientation::RowWise {
            return Err(SessionError::buffer(
                "quadratic_weights",
                "quadratic weights must be row-oriented",
            ));
        }
        weights.validate("quadratic_weights", dimension, dimension)?;

        // The upper triangle stored by rows has the same layout as the lower
        // triangle stored by columns.
        let mut offsets = Vec::with_capacity(dimension + 1);
        let mut indices = Vec::with_capacity(weights.nnz());
        let mut values = Vec::with_capacity(weights.nnz());
        offsets.push(0);
        for (row, bounds) in weights.offsets.windows(2).enumerate() {
            for pos in bounds[0]..bounds[1] {
                let col = weights.indices[pos];
                if col < row {
                    continue;
                }
                let value = weights.values[pos];
                indices.push(col);
                values.push(if col == row { value * 2.0 } else { value });
            }
            offsets.push(indices.len());
        }
        Ok(Self::column_wise(offsets, indices, values))
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn sample() -> SparseMatrix {
        // [[1, 0, 2],
        //  [0, 3, 0]]
        SparseMatrix::row_wise(vec![0, 2, 3], vec![0, 2, 1], vec![1.0, 2.0, 3.0])
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        assert!(sample().validate("matrix", 2, 3).is_ok());
        assert!(SparseMatrix::empty(MatrixOrientation::RowWise, 4).validate("m", 4, 0).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_offsets_length() {
        let err = sample().validate("matrix", 3, 3).unwrap_err();
        assert_eq!(err.code(), "BUFFER_INVALID");
        assert!(err.to_string().contains("matrix.offsets"));
    }

    #[test]
    fn test_validate_rejects_decreasing_offsets() {
        let matrix = SparseMatrix::row_wise(vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0]);
        let err = matrix.validate("matrix", 2, 3).unwrap_err();
        assert!(err.to_string().contains("non-decreasing"));
    }

    #[test]
    fn test_validate_rejects_nonzero_first_offset() {
        let matrix = SparseMatrix::row_wise(vec![1, 2], vec![0, 1], vec![1.0, 1.0]);
        assert!(matrix.validate("matrix", 1, 3).is_err());
    }

    #[test]
    fn test_validate_rejects_length_mismatches() {
        let short_values = SparseMatrix::row_wise(vec![0, 2], vec![0, 1], vec![1.0]);
        assert!(short_values.validate("matrix", 1, 3).is_err());

        let last_offset = SparseMatrix::row_wise(vec![0, 3], vec![0, 1], vec![1.0, 1.0]);
        let err = last_offset.validate("matrix", 1, 3).unwrap_err();
        assert!(err.to_string().contains("last offset"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let matrix = SparseMatrix::row_wise(vec![0, 1], vec![3], vec![1.0]);
        let err = matrix.validate("matrix", 1, 3).unwrap_err();
        assert!(err.to_string().contains("out of bounds"));
    }

    #[test]
    fn test_entries_iterates_in_order() {
        let entries: Vec<_> = sample().entries().collect();
        assert_eq!(entries, vec![(0, 0, 1.0), (0, 2, 2.0), (1, 1, 3.0)]);
    }

    #[test]
    fn test_from_triplets_sorts_and_merges() {
        let matrix = SparseMatrix::from_triplets(
            MatrixOrientation::RowWise,
            2,
            3,
            &[(1, 1, 3.0), (0, 2, 2.0), (0, 0, 0.5), (0, 0, 0.5)],
        )
        .unwrap();
        assert_eq!(matrix, sample());
    }

    #[test]
    fn test_from_triplets_column_wise() {
        let matrix = SparseMatrix::from_triplets(
            MatrixOrientation::ColumnWise,
            2,
            3,
            &[(0, 0, 1.0), (0, 2, 2.0), (1, 1, 3.0)],
        )
        .unwrap();
        assert_eq!(matrix.offsets, vec![0, 1, 2, 3]);
        assert_eq!(matrix.indices, vec![0, 1, 0]);
        assert_eq!(matrix.values, vec![1.0, 3.0, 2.0]);
        assert!(matrix.validate("matrix", 3, 2).is_ok());
    }

    #[test]
    fn test_from_triplets_rejects_out_of_range() {
        let err =
            SparseMatrix::from_triplets(MatrixOrientation::RowWise, 1, 1, &[(0, 1, 1.0)]).unwrap_err();
        assert_eq!(err.code(), "BUFFER_INVALID");
    }

    #[test]
    fn test_lower_triangular_check() {
        let lower = SparseMatrix::column_wise(vec![0, 2, 3], vec![0, 1, 1], vec![2.0, 1.0, 2.0]);
        assert!(lower.validate_lower_triangular("hessian").is_ok());

        let upper = SparseMatrix::column_wise(vec![0, 1, 3], vec![0, 0, 1], vec![2.0, 1.0, 2.0]);
        assert!(upper.validate_lower_triangular("hessian").is_err());

        let row_wise = SparseMatrix::row_wise(vec![0, 1], vec![0], vec![1.0]);
        assert!(row_wise.validate_lower_triangular("hessian").is_err());
    }

    #[test]
    fn test_lower_triangular_check_rejects_malformed_structure() {
        // Offsets point past the stored entries.
        let short = SparseMatrix::column_wise(vec![0, 3], vec![0], vec![1.0]);
        let err = short.validate_lower_triangular("hessian").unwrap_err();
        assert_eq!(err.code(), "BUFFER_INVALID");
        assert!(err.to_string().contains("hessian"));

        // Fewer values than indices.
        let ragged = SparseMatrix::column_wise(vec![0, 1, 2], vec![0, 1], vec![1.0]);
        assert!(ragged.validate_lower_triangular("hessian").is_err());

        // Row index outside the square.
        let outside = SparseMatrix::column_wise(vec![0, 1], vec![4], vec![1.0]);
        assert!(outside.validate_lower_triangular("hessian").is_err());

        assert_eq!(short.entries().count(), 1);
        assert_eq!(ragged.entries().count(), 1);
    }

    #[test]
    fn test_hessian_from_quadratic_weights_doubles_diagonal() {
        // x0^2 + 3 x0 x1 + 4 x1^2, with a stray lower entry that is ignored.
        let weights = SparseMatrix::row_wise(vec![0, 2, 4], vec![0, 1, 0, 1], vec![1.0, 3.0, 9.0, 4.0]);
        let hessian = SparseMatrix::hessian_from_quadratic_weights(&weights, 2).unwrap();
        assert_eq!(hessian.orientation, MatrixOrientation::ColumnWise);
        assert_eq!(hessian.offsets, vec![0, 2, 3]);
        assert_eq!(hessian.indices, vec![0, 1, 1]);
        assert_eq!(hessian.values, vec![2.0, 3.0, 8.0]);
        assert!(hessian.validate_lower_triangular("hessian").is_ok());
    }

    #[test]
    fn test_from_host_rejects_float_indices() {
        let offsets = [0usize, 1];
        let indices = [0.0f64];
        let values = [1.0f64];
        let err = SparseMatrix::from_host(
            MatrixOrientation::RowWise,
            HostBuffer::from(&offsets[..]),
            HostBuffer::from(&indices[..]),
            HostBuffer::from(&values[..]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("indices"));
    }
}
