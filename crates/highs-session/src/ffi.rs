//! FFI bindings to the HiGHS C API.
//!
//! This module contains unsafe code for interacting with the C library. Every
//! other module talks to the engine through the safe [`Highs`] handle.
#![allow(unsafe_code)]

use crate::error::SessionError;
use crate::marshal::{RawMatrix, RawModel};
use crate::solution::SolutionStyle;
use highs_sys::HighsInt;
use std::ffi::{CStr, CString, c_char, c_void};
use std::fmt;
use std::ptr::{self, NonNull};
use tracing::{debug, trace, warn};

pub(crate) const MATRIX_FORMAT_COLUMN_WISE: HighsInt = 1;
pub(crate) const MATRIX_FORMAT_ROW_WISE: HighsInt = 2;
pub(crate) const HESSIAN_FORMAT_TRIANGULAR: HighsInt = 1;
pub(crate) const OBJECTIVE_SENSE_MINIMIZE: HighsInt = 1;
pub(crate) const OBJECTIVE_SENSE_MAXIMIZE: HighsInt = -1;

/// `kHighsMaximumStringLength`; string option reads need a buffer this large.
const MAXIMUM_STRING_LENGTH: usize = 512;

/// Status returned by a single engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// The call succeeded.
    Ok,
    /// The call completed, but the engine flagged a problem with its input
    /// or result.
    Warning,
    /// The call failed; engine state is unchanged or unusable.
    Error,
}

impl CallStatus {
    fn from_raw(raw: HighsInt) -> Self {
        match raw {
            0 => CallStatus::Ok,
            1 => CallStatus::Warning,
            _ => CallStatus::Error,
        }
    }

    /// Whether the call fully succeeded. Warnings do not count.
    pub fn is_ok(self) -> bool {
        matches!(self, CallStatus::Ok)
    }

    /// Treat anything other than `Ok` as a failure of `operation`.
    pub(crate) fn into_result(self, operation: &'static str) -> Result<(), SessionError> {
        if self.is_ok() {
            Ok(())
        } else {
            warn!(
                component = "engine",
                operation,
                status = "error",
                call_status = ?self,
                "Engine call failed"
            );
            Err(SessionError::OperationFailed { operation })
        }
    }

    /// Like [`CallStatus::into_result`], for calls that hand the engine a model
    /// or a model edit.
    pub(crate) fn into_model_result(self, operation: &'static str) -> Result<(), SessionError> {
        self.into_result(operation)
            .map_err(|_| SessionError::ModelRejected { operation })
    }
}

/// Column-wise copy of the engine's current LP, used for solution assessment.
#[derive(Debug, Clone, Default)]
pub(crate) struct LpSnapshot {
    pub num_col: usize,
    pub num_row: usize,
    pub col_lower: Vec<f64>,
    pub col_upper: Vec<f64>,
    pub row_lower: Vec<f64>,
    pub row_upper: Vec<f64>,
    pub a_start: Vec<HighsInt>,
    pub a_index: Vec<HighsInt>,
    pub a_value: Vec<f64>,
    pub integrality: Vec<HighsInt>,
}

/// Owned HiGHS instance.
///
/// The handle is not reentrant; callers serialize access (see
/// [`crate::executor::Coordinator`]).
pub struct Highs {
    ptr: NonNull<c_void>,
}

// SAFETY: a HiGHS instance has no thread affinity. Exclusive access is enforced
// by `&mut self` on every mutating method and by the session's resource lock.
unsafe impl Send for Highs {}

impl Highs {
    /// Create a fresh engine instance with default options.
    pub fn new() -> Result<Self, SessionError> {
        let raw = unsafe { highs_sys::Highs_create() };
        let ptr = NonNull::new(raw).ok_or(SessionError::EngineUnavailable)?;
        debug!(
            component = "engine",
            operation = "create",
            status = "success",
            "Created HiGHS instance"
        );
        Ok(Highs { ptr })
    }

    fn raw(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    // Options

    /// Declared type code of an option, `None` if the name is unknown.
    pub(crate) fn option_type(&self, name: &CStr) -> Option<HighsInt> {
        let mut kind: HighsInt = -1;
        let status = unsafe { highs_sys::Highs_getOptionType(self.raw(), name.as_ptr(), &raw mut kind) };
        (CallStatus::from_raw(status).is_ok()).then_some(kind)
    }

    pub(crate) fn set_bool_option(&mut self, name: &CStr, value: bool) -> CallStatus {
        let raw = HighsInt::from(value);
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_setBoolOptionValue(self.raw(), name.as_ptr(), raw)
        })
    }

    pub(crate) fn set_int_option(&mut self, name: &CStr, value: i32) -> CallStatus {
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_setIntOptionValue(self.raw(), name.as_ptr(), HighsInt::from(value))
        })
    }

    pub(crate) fn set_double_option(&mut self, name: &CStr, value: f64) -> CallStatus {
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_setDoubleOptionValue(self.raw(), name.as_ptr(), value)
        })
    }

    pub(crate) fn set_string_option(&mut self, name: &CStr, value: &CStr) -> CallStatus {
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_setStringOptionValue(self.raw(), name.as_ptr(), value.as_ptr())
        })
    }

    pub(crate) fn bool_option(&self, name: &CStr) -> Option<bool> {
        let mut value: HighsInt = 0;
        let status = unsafe {
            highs_sys::Highs_getBoolOptionValue(self.raw(), name.as_ptr(), &raw mut value)
        };
        CallStatus::from_raw(status).is_ok().then_some(value != 0)
    }

    pub(crate) fn int_option(&self, name: &CStr) -> Option<i32> {
        let mut value: HighsInt = 0;
        let status = unsafe {
            highs_sys::Highs_getIntOptionValue(self.raw(), name.as_ptr(), &raw mut value)
        };
        if !CallStatus::from_raw(status).is_ok() {
            return None;
        }
        i32::try_from(value).ok()
    }

    pub(crate) fn double_option(&self, name: &CStr) -> Option<f64> {
        let mut value: f64 = 0.0;
        let status = unsafe {
            highs_sys::Highs_getDoubleOptionValue(self.raw(), name.as_ptr(), &raw mut value)
        };
        CallStatus::from_raw(status).is_ok().then_some(value)
    }

    pub(crate) fn string_option(&self, name: &CStr) -> Option<String> {
        let mut buffer: Vec<c_char> = vec![0; MAXIMUM_STRING_LENGTH];
        let status = unsafe {
            highs_sys::Highs_getStringOptionValue(self.raw(), name.as_ptr(), buffer.as_mut_ptr())
        };
        if !CallStatus::from_raw(status).is_ok() {
            return None;
        }
        // The engine writes at most MAXIMUM_STRING_LENGTH - 1 bytes plus a terminator.
        if let Some(last) = buffer.last_mut() {
            *last = 0;
        }
        let value = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        Some(value.to_string_lossy().into_owned())
    }

    // Model

    pub(crate) fn pass_model(&mut self, model: &RawModel<'_>) -> CallStatus {
        let (q_start, q_index, q_value, q_num_nz) = match model.hessian.as_ref() {
            Some(q) => (q.start.as_ptr(), q.index.as_ptr(), q.value.as_ptr(), q.num_nz),
            None => (ptr::null(), ptr::null(), ptr::null(), 0),
        };
        let integrality = model
            .integrality
            .as_ref()
            .map_or(ptr::null(), |codes| codes.as_ptr());
        trace!(
            component = "engine",
            operation = "pass_model",
            num_col = model.num_col,
            num_row = model.num_row,
            num_nz = model.matrix.num_nz,
            q_num_nz,
            "Passing model"
        );
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_passModel(
                self.raw(),
                model.num_col,
                model.num_row,
                model.matrix.num_nz,
                q_num_nz,
                model.matrix.format,
                HESSIAN_FORMAT_TRIANGULAR,
                model.sense,
                model.offset,
                model.col_cost.as_ptr(),
                model.col_lower.as_ptr(),
                model.col_upper.as_ptr(),
                model.row_lower.as_ptr(),
                model.row_upper.as_ptr(),
                model.matrix.start.as_ptr(),
                model.matrix.index.as_ptr(),
                model.matrix.value.as_ptr(),
                q_start,
                q_index,
                q_value,
                integrality,
            )
        })
    }

    pub(crate) fn change_objective_sense(&mut self, sense: HighsInt) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_changeObjectiveSense(self.raw(), sense) })
    }

    pub(crate) fn change_objective_offset(&mut self, offset: f64) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_changeObjectiveOffset(self.raw(), offset) })
    }

    /// Replace the cost of columns `0..costs.len()`.
    pub(crate) fn change_cols_cost(&mut self, last_col: HighsInt, costs: &[f64]) -> CallStatus {
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_changeColsCostByRange(self.raw(), 0, last_col, costs.as_ptr())
        })
    }

    pub(crate) fn add_rows(
        &mut self,
        num_new_row: HighsInt,
        lower: &[f64],
        upper: &[f64],
        block: &RawMatrix<'_>,
    ) -> CallStatus {
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_addRows(
                self.raw(),
                num_new_row,
                lower.as_ptr(),
                upper.as_ptr(),
                block.num_nz,
                block.start.as_ptr(),
                block.index.as_ptr(),
                block.value.as_ptr(),
            )
        })
    }

    pub(crate) fn read_model(&mut self, path: &CStr) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_readModel(self.raw(), path.as_ptr()) })
    }

    pub(crate) fn write_model(&mut self, path: &CStr) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_writeModel(self.raw(), path.as_ptr()) })
    }

    pub(crate) fn num_col(&self) -> usize {
        let raw = unsafe { highs_sys::Highs_getNumCol(self.raw()) };
        usize::try_from(raw).unwrap_or(0)
    }

    pub(crate) fn num_row(&self) -> usize {
        let raw = unsafe { highs_sys::Highs_getNumRow(self.raw()) };
        usize::try_from(raw).unwrap_or(0)
    }

    pub(crate) fn num_nz(&self) -> usize {
        let raw = unsafe { highs_sys::Highs_getNumNz(self.raw()) };
        usize::try_from(raw).unwrap_or(0)
    }

    /// Copy the current LP out of the engine in column-wise format.
    pub(crate) fn lp_snapshot(&self) -> Option<LpSnapshot> {
        let num_col = self.num_col();
        let num_row = self.num_row();
        let num_nz = self.num_nz();
        let mut snapshot = LpSnapshot {
            num_col,
            num_row,
            col_lower: vec![0.0; num_col],
            col_upper: vec![0.0; num_col],
            row_lower: vec![0.0; num_row],
            row_upper: vec![0.0; num_row],
            a_start: vec![0; num_col + 1],
            a_index: vec![0; num_nz],
            a_value: vec![0.0; num_nz],
            integrality: vec![0; num_col],
        };
        let mut col_cost = vec![0.0; num_col];
        let mut out_num_col: HighsInt = 0;
        let mut out_num_row: HighsInt = 0;
        let mut out_num_nz: HighsInt = 0;
        let mut sense: HighsInt = 0;
        let mut offset: f64 = 0.0;
        let status = unsafe {
            highs_sys::Highs_getLp(
                self.raw(),
                MATRIX_FORMAT_COLUMN_WISE,
                &raw mut out_num_col,
                &raw mut out_num_row,
                &raw mut out_num_nz,
                &raw mut sense,
                &raw mut offset,
                col_cost.as_mut_ptr(),
                snapshot.col_lower.as_mut_ptr(),
                snapshot.col_upper.as_mut_ptr(),
                snapshot.row_lower.as_mut_ptr(),
                snapshot.row_upper.as_mut_ptr(),
                snapshot.a_start.as_mut_ptr(),
                snapshot.a_index.as_mut_ptr(),
                snapshot.a_value.as_mut_ptr(),
                snapshot.integrality.as_mut_ptr(),
            )
        };
        if !CallStatus::from_raw(status).is_ok() {
            return None;
        }
        if let Some(last) = snapshot.a_start.last_mut() {
            *last = HighsInt::try_from(num_nz).ok()?;
        }
        Some(snapshot)
    }

    // Execution

    pub(crate) fn run(&mut self) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_run(self.raw()) })
    }

    pub(crate) fn model_status(&self) -> HighsInt {
        unsafe { highs_sys::Highs_getModelStatus(self.raw()) }
    }

    pub(crate) fn objective_value(&self) -> f64 {
        unsafe { highs_sys::Highs_getObjectiveValue(self.raw()) }
    }

    pub(crate) fn run_time(&self) -> f64 {
        unsafe { highs_sys::Highs_getRunTime(self.raw()) }
    }

    pub(crate) fn zero_all_clocks(&mut self) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_zeroAllClocks(self.raw()) })
    }

    pub(crate) fn int_info(&self, name: &CStr) -> Option<i32> {
        let mut value: HighsInt = 0;
        let status = unsafe {
            highs_sys::Highs_getIntInfoValue(self.raw(), name.as_ptr(), &raw mut value)
        };
        if !CallStatus::from_raw(status).is_ok() {
            return None;
        }
        i32::try_from(value).ok()
    }

    pub(crate) fn int64_info(&self, name: &CStr) -> Option<i64> {
        let mut value: i64 = 0;
        let status = unsafe {
            highs_sys::Highs_getInt64InfoValue(self.raw(), name.as_ptr(), &raw mut value)
        };
        CallStatus::from_raw(status).is_ok().then_some(value)
    }

    pub(crate) fn double_info(&self, name: &CStr) -> Option<f64> {
        let mut value: f64 = 0.0;
        let status = unsafe {
            highs_sys::Highs_getDoubleInfoValue(self.raw(), name.as_ptr(), &raw mut value)
        };
        CallStatus::from_raw(status).is_ok().then_some(value)
    }

    // Solution

    /// Copy the engine's solution vectors into caller-sized buffers. Vectors
    /// passed as `None` or empty are skipped.
    ///
    /// The engine writes as many entries as its own copy of each vector
    /// holds, not the model dimension. Callers must only pass a buffer for a
    /// vector the engine has sized to the current model: one produced by a
    /// solve, or one installed by `set_solution`.
    pub(crate) fn solution(
        &self,
        col_value: Option<&mut [f64]>,
        col_dual: Option<&mut [f64]>,
        row_value: Option<&mut [f64]>,
        row_dual: Option<&mut [f64]>,
    ) -> CallStatus {
        fn as_mut_ptr(values: Option<&mut [f64]>) -> *mut f64 {
            values
                .filter(|values| !values.is_empty())
                .map_or(ptr::null_mut(), <[f64]>::as_mut_ptr)
        }
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_getSolution(
                self.raw(),
                as_mut_ptr(col_value),
                as_mut_ptr(col_dual),
                as_mut_ptr(row_value),
                as_mut_ptr(row_dual),
            )
        })
    }

    /// Install a (possibly partial) solution; absent vectors are passed as null.
    pub(crate) fn set_solution(
        &mut self,
        col_value: Option<&[f64]>,
        row_value: Option<&[f64]>,
        col_dual: Option<&[f64]>,
        row_dual: Option<&[f64]>,
    ) -> CallStatus {
        fn as_ptr(values: Option<&[f64]>) -> *const f64 {
            values.map_or(ptr::null(), <[f64]>::as_ptr)
        }
        CallStatus::from_raw(unsafe {
            highs_sys::Highs_setSolution(
                self.raw(),
                as_ptr(col_value),
                as_ptr(row_value),
                as_ptr(col_dual),
                as_ptr(row_dual),
            )
        })
    }

    pub(crate) fn write_solution(&mut self, path: &CStr, style: SolutionStyle) -> CallStatus {
        let status = match style {
            SolutionStyle::Raw => unsafe {
                highs_sys::Highs_writeSolution(self.raw(), path.as_ptr())
            },
            SolutionStyle::Pretty => unsafe {
                highs_sys::Highs_writeSolutionPretty(self.raw(), path.as_ptr())
            },
        };
        CallStatus::from_raw(status)
    }

    // Reset

    pub(crate) fn clear(&mut self) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_clear(self.raw()) })
    }

    pub(crate) fn clear_model(&mut self) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_clearModel(self.raw()) })
    }

    pub(crate) fn clear_solver(&mut self) -> CallStatus {
        CallStatus::from_raw(unsafe { highs_sys::Highs_clearSolver(self.raw()) })
    }
}

impl Drop for Highs {
    fn drop(&mut self) {
        unsafe { highs_sys::Highs_destroy(self.raw()) };
        trace!(
            component = "engine",
            operation = "destroy",
            status = "success",
            "Destroyed HiGHS instance"
        );
    }
}

impl fmt::Debug for Highs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Highs")
            .field("num_columns", &self.num_col())
            .field("num_rows", &self.num_row())
            .field("model_status", &self.model_status())
            .finish_non_exhaustive()
    }
}

/// Convert a caller string into a C string for the engine.
pub(crate) fn c_string(what: &str, value: &str) -> Result<CString, SessionError> {
    CString::new(value)
        .map_err(|_| SessionError::argument(format!("{what} must not contain NUL bytes")))
}

/// Return the HiGHS engine version string.
pub fn highs_version() -> String {
    unsafe {
        let ptr = highs_sys::Highs_version();
        if ptr.is_null() {
            "unknown".to_string()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_status_mapping() {
        assert_eq!(CallStatus::from_raw(0), CallStatus::Ok);
        assert_eq!(CallStatus::from_raw(1), CallStatus::Warning);
        assert_eq!(CallStatus::from_raw(-1), CallStatus::Error);
        assert!(CallStatus::Ok.into_result("Run").is_ok());
        assert_eq!(
            CallStatus::Warning.into_result("Run"),
            Err(SessionError::OperationFailed { operation: "Run" })
        );
    }

    #[test]
    fn test_fresh_instance_is_empty() {
        let highs = Highs::new().expect("failed to create engine");
        assert_eq!(highs.num_col(), 0);
        assert_eq!(highs.num_row(), 0);
        assert_eq!(highs.model_status(), 0);
    }

    #[test]
    fn test_option_type_lookup() {
        let highs = Highs::new().expect("failed to create engine");
        let known = c_string("option", "presolve").unwrap();
        let unknown = c_string("option", "no_such_option").unwrap();
        assert_eq!(highs.option_type(&known), Some(3));
        assert_eq!(highs.option_type(&unknown), None);
    }

    #[test]
    fn test_c_string_rejects_nul() {
        assert!(c_string("path", "a\0b").is_err());
    }

    #[test]
    fn test_version_is_not_empty() {
        assert!(!highs_version().is_empty());
    }
}
