//! Session error types.

use crate::options::OptionKind;
use crate::status::ModelStatus;

/// Errors surfaced by session operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Wrong argument shape at the boundary; the engine was not touched.
    Argument { reason: String },
    /// A numeric buffer had the wrong length, element kind or structure.
    InvalidBuffer { name: String, reason: String },
    /// The engine refused a model or an incremental edit.
    ModelRejected { operation: &'static str },
    /// A named engine operation reported failure.
    OperationFailed { operation: &'static str },
    /// The option name is not known to the engine.
    UnknownOption { name: String },
    /// The value cannot be stored in the option's declared type.
    OptionTypeMismatch {
        name: String,
        expected: OptionKind,
        got: &'static str,
    },
    /// The engine rejected a well-typed option value (e.g. out of range).
    OptionRejected { name: String },
    /// An asynchronous operation is outstanding on this session.
    SolveInProgress { operation: &'static str },
    /// The warm-start solution did not assess as valid.
    InvalidWarmStart,
    /// A solve ended with a status that carries no usable result.
    SolveFailed { status: ModelStatus },
    /// A solve ended with a usable but non-optimal status.
    SolveNonOptimal { status: ModelStatus },
    /// The engine handle or the session worker is gone.
    EngineUnavailable,
}

impl SessionError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Argument { .. } => "ARGUMENT_INVALID",
            SessionError::InvalidBuffer { .. } => "BUFFER_INVALID",
            SessionError::ModelRejected { .. } => "MODEL_REJECTED",
            SessionError::OperationFailed { .. } => "OPERATION_FAILED",
            SessionError::UnknownOption { .. } => "OPTION_UNKNOWN",
            SessionError::OptionTypeMismatch { .. } => "OPTION_TYPE_MISMATCH",
            SessionError::OptionRejected { .. } => "OPTION_REJECTED",
            SessionError::SolveInProgress { .. } => "SOLVE_IN_PROGRESS",
            SessionError::InvalidWarmStart => "WARM_START_INVALID",
            SessionError::SolveFailed { .. } => "SOLVE_FAILED",
            SessionError::SolveNonOptimal { .. } => "SOLVE_NON_OPTIMAL",
            SessionError::EngineUnavailable => "ENGINE_UNAVAILABLE",
        }
    }

    pub(crate) fn buffer(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SessionError::InvalidBuffer {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn argument(reason: impl Into<String>) -> Self {
        SessionError::Argument {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Argument { reason } => {
                write!(f, "[{}] Invalid argument: {}", self.code(), reason)
            }
            SessionError::InvalidBuffer { name, reason } => {
                write!(f, "[{}] Invalid buffer '{}': {}", self.code(), name, reason)
            }
            SessionError::ModelRejected { operation } | SessionError::OperationFailed { operation } => {
                write!(f, "[{}] {} failed", self.code(), operation)
            }
            SessionError::UnknownOption { name } => {
                write!(f, "[{}] Unknown option '{}'", self.code(), name)
            }
            SessionError::OptionTypeMismatch {
                name,
                expected,
                got,
            } => write!(
                f,
                "[{}] Option '{}' expects a {} value (got {})",
                self.code(),
                name,
                expected,
                got
            ),
            SessionError::OptionRejected { name } => {
                write!(f, "[{}] Setting option '{}' failed", self.code(), name)
            }
            SessionError::SolveInProgress { operation } => write!(
                f,
                "[{}] {} is not allowed while an operation is running",
                self.code(),
                operation
            ),
            SessionError::InvalidWarmStart => write!(
                f,
                "[{}] The solution used to warm-start the model was invalid",
                self.code()
            ),
            SessionError::SolveFailed { status } => {
                write!(f, "[{}] Solve failed with status {}", self.code(), status)
            }
            SessionError::SolveNonOptimal { status } => write!(
                f,
                "[{}] Solve ended with non-optimal status {}",
                self.code(),
                status
            ),
            SessionError::EngineUnavailable => {
                write!(f, "[{}] Solver engine is unavailable", self.code())
            }
        }
    }
}

impl std::error::Error for SessionError {}
