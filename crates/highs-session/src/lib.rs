//! Non-blocking HiGHS solver sessions.
//!
//! A [`Session`] owns one HiGHS instance. Models are described with plain
//! Rust buffers ([`ModelDescriptor`], [`SparseMatrix`]) and checked before
//! they reach the engine; long-running operations run on the session's
//! worker thread and complete through a [`Ticket`] or a callback.
//!
//! ```no_run
//! use highs_session::{ModelDescriptor, Session, SparseMatrix};
//!
//! # fn main() -> Result<(), highs_session::SessionError> {
//! // min x + y  s.t. x + y >= 1,  x, y >= 0
//! let model = ModelDescriptor::new(2, 1, SparseMatrix::row_wise(vec![0, 2], vec![0, 1], vec![1.0, 1.0]))
//!     .with_linear_weights(vec![1.0, 1.0])
//!     .with_column_bounds(vec![0.0, 0.0], vec![f64::INFINITY, f64::INFINITY])
//!     .with_row_bounds(vec![1.0], vec![f64::INFINITY]);
//!
//! let session = Session::new()?;
//! session.pass_model(&model)?;
//! session.run()?.wait()?;
//! let solution = session.get_solution()?;
//! assert!(solution.is_value_valid);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
mod ffi;
pub mod info;
pub mod logging;
pub mod marshal;
pub mod matrix;
pub mod model;
pub mod options;
pub mod progress;
pub mod session;
pub mod solution;
mod status;

pub use config::SessionConfig;
pub use error::SessionError;
pub use executor::{Completion, Ticket};
pub use ffi::highs_version;
pub use info::{Info, InfoKind, InfoValue};
pub use logging::{LoggingError, init_logging};
pub use marshal::HostBuffer;
pub use matrix::{MatrixOrientation, SparseMatrix};
pub use model::{ColumnType, ModelDescriptor, ObjectiveSense};
pub use options::{OptionKind, OptionValue};
pub use progress::{ProgressTracker, SolveProgress, read_progress};
pub use session::{Session, SolveOptions};
pub use solution::{PartialSolution, PrimalAssessment, Solution, SolutionStyle};
pub use status::ModelStatus;
