//! The solver session: one engine instance, its worker and typed accessors.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::executor::{Coordinator, Ticket};
use crate::ffi::{Highs, OBJECTIVE_SENSE_MAXIMIZE, OBJECTIVE_SENSE_MINIMIZE, c_string};
use crate::info::Info;
use crate::marshal::{self, dense};
use crate::matrix::SparseMatrix;
use crate::model::{ModelDescriptor, ObjectiveSense};
use crate::options::{OptionKind, OptionValue};
use crate::solution::{PartialSolution, PrimalAssessment, Solution, SolutionStyle, assess_primal};
use crate::status::ModelStatus;
use std::ffi::{CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace, warn};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

const DEFAULT_PRIMAL_FEASIBILITY_TOLERANCE: f64 = 1e-7;
const DEFAULT_MIP_FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// The guarded engine plus warm-start bookkeeping.
///
/// The hint flags mirror the engine's internal validity of a solution
/// installed through `set_solution`; they are dropped whenever the model or
/// the solver state changes.
pub(crate) struct Engine {
    highs: Highs,
    primal_hint: bool,
    dual_hint: bool,
}

impl Engine {
    fn new() -> Result<Self, SessionError> {
        Ok(Self {
            highs: Highs::new()?,
            primal_hint: false,
            dual_hint: false,
        })
    }

    fn reset_hints(&mut self) {
        self.primal_hint = false;
        self.dual_hint = false;
    }

    fn option_kind(&self, c_name: &CStr, name: &str) -> Result<OptionKind, SessionError> {
        self.highs
            .option_type(c_name)
            .and_then(OptionKind::from_code)
            .ok_or_else(|| SessionError::UnknownOption {
                name: name.to_string(),
            })
    }

    fn set_option(&mut self, name: &str, value: OptionValue) -> Result<(), SessionError> {
        let c_name = c_string("option name", name)?;
        let kind = self.option_kind(&c_name, name)?;
        let value = value.coerce(name, kind)?;
        trace!(
            component = "session",
            operation = "set_option",
            option = name,
            value = %value,
            "Setting option"
        );
        let status = match &value {
            OptionValue::Bool(flag) => self.highs.set_bool_option(&c_name, *flag),
            OptionValue::Int(number) => self.highs.set_int_option(&c_name, *number),
            OptionValue::Double(number) => self.highs.set_double_option(&c_name, *number),
            OptionValue::Str(text) => {
                let c_value = c_string("option value", text)?;
                self.highs.set_string_option(&c_name, &c_value)
            }
        };
        if !status.is_ok() {
            warn!(
                component = "session",
                operation = "set_option",
                status = "error",
                option = name,
                value = %value,
                "Engine rejected option value"
            );
            return Err(SessionError::OptionRejected {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn option(&self, name: &str) -> Result<OptionValue, SessionError> {
        let c_name = c_string("option name", name)?;
        let kind = self.option_kind(&c_name, name)?;
        let value = match kind {
            OptionKind::Bool => self.highs.bool_option(&c_name).map(OptionValue::Bool),
            OptionKind::Int => self.highs.int_option(&c_name).map(OptionValue::Int),
            OptionKind::Double => self.highs.double_option(&c_name).map(OptionValue::Double),
            OptionKind::String => self.highs.string_option(&c_name).map(OptionValue::Str),
        };
        value.ok_or_else(|| SessionError::OptionTypeMismatch {
            name: name.to_string(),
            expected: kind,
            got: "no readable value",
        })
    }

    fn solution(&self) -> Solution {
        let num_col = self.highs.num_col();
        let num_row = self.highs.num_row();
        let mut solution = Solution::empty(num_col, num_row);

        let reported = |record: &str| {
            c_string("info", record)
                .ok()
                .and_then(|name| self.highs.int_info(&name))
                .is_some_and(|status| status != 0)
        };
        let value_valid = self.primal_hint || reported("primal_solution_status");
        let dual_valid = self.dual_hint || reported("dual_solution_status");
        if !value_valid && !dual_valid {
            return solution;
        }

        let Solution {
            column_values,
            column_dual_values,
            row_values,
            row_dual_values,
            ..
        } = &mut solution;
        // The engine copies its own vector lengths, which go stale when the
        // model shrinks; an empty dimension always gets a null pointer.
        let (columns, rows) = (num_col > 0, num_row > 0);
        let status = self.highs.solution(
            (value_valid && columns).then_some(column_values.as_mut_slice()),
            (dual_valid && columns).then_some(column_dual_values.as_mut_slice()),
            (value_valid && rows).then_some(row_values.as_mut_slice()),
            (dual_valid && rows).then_some(row_dual_values.as_mut_slice()),
        );
        if !status.is_ok() {
            warn!(
                component = "session",
                operation = "get_solution",
                status = "warn",
                "Engine did not return a solution"
            );
            return Solution::empty(num_col, num_row);
        }
        solution.is_value_valid = value_valid;
        solution.is_dual_valid = dual_valid;
        solution.clear_invalid();
        solution
    }

    fn set_solution(&mut self, hint: &PartialSolution) -> Result<(), SessionError> {
        let (num_col, num_row) = (self.highs.num_col(), self.highs.num_row());
        hint.validate(num_col, num_row)?;
        self.highs
            .set_solution(
                hint.column_values.as_deref(),
                hint.row_values.as_deref(),
                hint.column_dual_values.as_deref(),
                hint.row_dual_values.as_deref(),
            )
            .into_result("Set solution")?;
        if hint.installs_primal(num_col) {
            self.primal_hint = true;
        }
        if hint.installs_dual(num_row) {
            self.dual_hint = true;
        }
        Ok(())
    }

    fn tolerance(&self, name: &str, default: f64) -> f64 {
        c_string("option name", name)
            .ok()
            .and_then(|c_name| self.highs.double_option(&c_name))
            .unwrap_or(default)
    }

    fn assess_primal(&self) -> PrimalAssessment {
        let solution = self.solution();
        if !solution.is_value_valid {
            return PrimalAssessment::default();
        }
        let Some(lp) = self.highs.lp_snapshot() else {
            return PrimalAssessment::default();
        };
        assess_primal(
            &lp,
            &solution.column_values,
            self.tolerance("primal_feasibility_tolerance", DEFAULT_PRIMAL_FEASIBILITY_TOLERANCE),
            self.tolerance("mip_feasibility_tolerance", DEFAULT_MIP_FEASIBILITY_TOLERANCE),
        )
    }
}

/// Options for [`Session::solve_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveOptions {
    /// Accept any conclusive status rather than only `Optimal`.
    pub allow_non_optimal: bool,
    /// Keep the engine clocks running across solves.
    pub keep_clocks: bool,
}

impl SolveOptions {
    /// Accept any conclusive status.
    pub fn allow_non_optimal(mut self, allowed: bool) -> Self {
        self.allow_non_optimal = allowed;
        self
    }

    /// Keep the clocks from earlier solves.
    pub fn keep_clocks(mut self, keep: bool) -> Self {
        self.keep_clocks = keep;
        self
    }
}

/// A HiGHS solver session.
///
/// Long-running operations ([`Session::run`], model and solution file I/O)
/// execute on the session's own worker thread; everything else runs inline.
/// While a background operation is outstanding every other call fails with
/// [`SessionError::SolveInProgress`].
pub struct Session {
    coordinator: Coordinator<Engine>,
    log_file: Option<PathBuf>,
}

impl Session {
    /// Create a session with default engine options.
    pub fn new() -> Result<Self, SessionError> {
        Self::create(None)
    }

    /// Create a session that logs to `path` instead of the console.
    pub fn with_log_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let session = Self::create(Some(path.to_path_buf()))?;
        session.set_option("log_file", path_str(path)?)?;
        session.set_option("log_to_console", false)?;
        Ok(session)
    }

    /// Create a session and apply every setting in `config`.
    pub fn with_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let session = Self::create(config.log_file.clone())?;
        for (name, value) in config.to_options()? {
            session.set_option(&name, value)?;
        }
        debug!(
            component = "session",
            operation = "configure",
            status = "success",
            "Applied session configuration"
        );
        Ok(session)
    }

    fn create(log_file: Option<PathBuf>) -> Result<Self, SessionError> {
        let id = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        let coordinator = Coordinator::new(Engine::new()?, format!("highs-session-{id}"))?;
        debug!(
            component = "session",
            operation = "create",
            status = "success",
            session = id,
            log_file = ?log_file,
            "Created session"
        );
        Ok(Self {
            coordinator,
            log_file,
        })
    }

    /// Log destination chosen at construction.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Whether a background operation is outstanding.
    pub fn is_solving(&self) -> bool {
        self.coordinator.is_running()
    }

    // Options

    /// Set an engine option by name.
    ///
    /// Integral doubles are accepted for integer options and integers for
    /// double options; any other type mismatch, unknown name or value the
    /// engine refuses is an error.
    pub fn set_option(&self, name: &str, value: impl Into<OptionValue>) -> Result<(), SessionError> {
        let value = value.into();
        self.coordinator
            .with("Set option", |engine| engine.set_option(name, value))?
    }

    /// Read an engine option, typed by the engine's declared option kind.
    pub fn get_option(&self, name: &str) -> Result<OptionValue, SessionError> {
        self.coordinator.with("Get option", |engine| engine.option(name))?
    }

    // Model

    /// Replace the engine's model.
    ///
    /// Every buffer is checked before the engine is touched.
    pub fn pass_model(&self, model: &ModelDescriptor) -> Result<(), SessionError> {
        let raw = marshal::marshal_model(model)?;
        self.coordinator.with("Pass model", |engine| {
            engine.reset_hints();
            engine.highs.pass_model(&raw).into_model_result("Pass model")
        })??;
        debug!(
            component = "session",
            operation = "pass_model",
            status = "success",
            num_columns = model.column_count,
            num_rows = model.row_count,
            nnz = model.matrix.nnz(),
            quadratic = model.hessian.is_some(),
            "Passed model"
        );
        Ok(())
    }

    /// Switch between minimizing and maximizing the current objective.
    pub fn change_objective_sense(&self, sense: ObjectiveSense) -> Result<(), SessionError> {
        let code = match sense {
            ObjectiveSense::Minimize => OBJECTIVE_SENSE_MINIMIZE,
            ObjectiveSense::Maximize => OBJECTIVE_SENSE_MAXIMIZE,
        };
        self.coordinator.with("Change objective sense", |engine| {
            engine
                .highs
                .change_objective_sense(code)
                .into_model_result("Change objective sense")
        })?
    }

    /// Set the constant term added to the objective.
    pub fn change_objective_offset(&self, offset: f64) -> Result<(), SessionError> {
        self.coordinator.with("Change objective offset", |engine| {
            engine
                .highs
                .change_objective_offset(offset)
                .into_model_result("Change objective offset")
        })?
    }

    /// Replace every column's linear objective weight.
    pub fn change_cols_cost(&self, costs: &[f64]) -> Result<(), SessionError> {
        self.coordinator.with("Change columns cost", |engine| {
            let num_col = engine.highs.num_col();
            let costs = dense("costs", costs, num_col)?;
            if num_col == 0 {
                return Ok(());
            }
            let last_col = marshal::count("costs", num_col - 1)?;
            engine
                .highs
                .change_cols_cost(last_col, costs)
                .into_model_result("Change columns cost")
        })?
    }

    /// Append `count` rows with bounds `lower..=upper` and row-wise
    /// coefficients over the existing columns.
    pub fn add_rows(
        &self,
        count: usize,
        lower: &[f64],
        upper: &[f64],
        matrix: &SparseMatrix,
    ) -> Result<(), SessionError> {
        let lower = dense("lower", lower, count)?;
        let upper = dense("upper", upper, count)?;
        self.coordinator.with("Adding rows", |engine| {
            let block = marshal::marshal_rows(count, engine.highs.num_col(), matrix)?;
            let num_new_row = marshal::count("count", count)?;
            engine.reset_hints();
            engine
                .highs
                .add_rows(num_new_row, lower, upper, &block)
                .into_model_result("Adding rows")
        })??;
        debug!(
            component = "session",
            operation = "add_rows",
            status = "success",
            count,
            nnz = matrix.nnz(),
            "Added rows"
        );
        Ok(())
    }

    /// Column count of the engine's current model.
    pub fn num_columns(&self) -> Result<usize, SessionError> {
        self.coordinator.with("Get column count", |engine| engine.highs.num_col())
    }

    /// Row count of the engine's current model.
    pub fn num_rows(&self) -> Result<usize, SessionError> {
        self.coordinator.with("Get row count", |engine| engine.highs.num_row())
    }

    /// Load a model file on the worker thread. The format follows the
    /// file extension.
    pub fn read_model(&self, path: impl AsRef<Path>) -> Result<Ticket, SessionError> {
        let path = c_path(path.as_ref())?;
        self.coordinator
            .submit_ticket("Read model", move |engine| read_model_job(engine, &path))
    }

    /// Callback form of [`Session::read_model`]. The callback runs on the
    /// worker thread once the session is idle again.
    pub fn read_model_with(
        &self,
        path: impl AsRef<Path>,
        callback: impl FnOnce(Result<(), SessionError>) + Send + 'static,
    ) -> Result<(), SessionError> {
        let path = c_path(path.as_ref())?;
        self.coordinator.submit(
            "Read model",
            move |engine| read_model_job(engine, &path),
            Box::new(callback),
        )
    }

    /// Write the current model on the worker thread. The format follows the
    /// file extension.
    pub fn write_model(&self, path: impl AsRef<Path>) -> Result<Ticket, SessionError> {
        let path = c_path(path.as_ref())?;
        self.coordinator
            .submit_ticket("Write model", move |engine| write_model_job(engine, &path))
    }

    /// Callback form of [`Session::write_model`].
    pub fn write_model_with(
        &self,
        path: impl AsRef<Path>,
        callback: impl FnOnce(Result<(), SessionError>) + Send + 'static,
    ) -> Result<(), SessionError> {
        let path = c_path(path.as_ref())?;
        self.coordinator.submit(
            "Write model",
            move |engine| write_model_job(engine, &path),
            Box::new(callback),
        )
    }

    // Execution

    /// Start solving the current model on the worker thread.
    pub fn run(&self) -> Result<Ticket, SessionError> {
        self.coordinator.submit_ticket("Run", run_job)
    }

    /// Callback form of [`Session::run`]. A run that ends without an optimal
    /// model still reports `Ok` unless the engine itself failed.
    pub fn run_with(
        &self,
        callback: impl FnOnce(Result<(), SessionError>) + Send + 'static,
    ) -> Result<(), SessionError> {
        self.coordinator.submit("Run", run_job, Box::new(callback))
    }

    /// Run to completion and classify the outcome. Requires an optimal
    /// status; see [`Session::solve_with`].
    pub fn solve(&self) -> Result<ModelStatus, SessionError> {
        self.solve_with(SolveOptions::default())
    }

    /// Blocking solve.
    ///
    /// An engine-side run failure is not reported by itself: the resulting
    /// model status decides. Statuses that carry no usable outcome yield
    /// [`SessionError::SolveFailed`]; a usable non-optimal status yields
    /// [`SessionError::SolveNonOptimal`] unless allowed.
    ///
    /// Blocks the calling thread, so do not call it from async code.
    pub fn solve_with(&self, options: SolveOptions) -> Result<ModelStatus, SessionError> {
        if !options.keep_clocks {
            self.zero_all_clocks()?;
        }
        let outcome = self.run()?.wait();
        let status = self.model_status()?;
        if let Err(err) = &outcome {
            debug!(
                component = "session",
                operation = "solve",
                status = "warn",
                model_status = %status,
                error = %err,
                "Run reported a failure"
            );
        }
        if !status.is_conclusive() {
            warn!(
                component = "session",
                operation = "solve",
                status = "error",
                model_status = %status,
                "Solve failed"
            );
            return Err(SessionError::SolveFailed { status });
        }
        info!(
            component = "session",
            operation = "solve",
            status = "success",
            model_status = %status,
            "Solve ended"
        );
        if !status.is_optimal() && !options.allow_non_optimal {
            return Err(SessionError::SolveNonOptimal { status });
        }
        Ok(status)
    }

    /// Raw engine model status code.
    pub fn get_model_status(&self) -> Result<i32, SessionError> {
        self.coordinator
            .with("Get model status", |engine| engine.highs.model_status())
    }

    /// Model status of the last solve, or `NotSet` after a model change.
    pub fn model_status(&self) -> Result<ModelStatus, SessionError> {
        self.get_model_status().map(ModelStatus::from_code)
    }

    /// Snapshot of every info record the engine reports.
    pub fn get_info(&self) -> Result<Info, SessionError> {
        self.coordinator.with("Get info", |engine| Info::read(&engine.highs))
    }

    /// Objective value of the current solution, including the offset.
    pub fn objective_value(&self) -> Result<f64, SessionError> {
        self.coordinator
            .with("Get objective value", |engine| engine.highs.objective_value())
    }

    /// Wall-clock seconds accumulated by the engine clocks.
    pub fn run_time(&self) -> Result<f64, SessionError> {
        self.coordinator
            .with("Get run time", |engine| engine.highs.run_time())
    }

    /// Reset the engine clocks behind [`Session::run_time`].
    pub fn zero_all_clocks(&self) -> Result<(), SessionError> {
        self.coordinator.with("Zero clocks", |engine| {
            engine.highs.zero_all_clocks().into_result("Zero clocks")
        })?
    }

    // Solution

    /// Current solution values.
    ///
    /// Vectors always match the model's column and row counts. Values come
    /// from the last solve or from an installed hint; whatever is not valid
    /// is zero-filled and flagged as such.
    pub fn get_solution(&self) -> Result<Solution, SessionError> {
        self.coordinator.with("Get solution", |engine| engine.solution())
    }

    /// Install a warm-start hint; absent vectors are left to the engine.
    ///
    /// Column values count as a primal solution and row duals as a dual
    /// solution. Row values and column duals are derived by the engine and
    /// never make a hint valid by themselves.
    pub fn set_solution(&self, hint: &PartialSolution) -> Result<(), SessionError> {
        self.coordinator
            .with("Set solution", |engine| engine.set_solution(hint))?
    }

    /// Install primal column values (and optionally row duals) as a hint.
    ///
    /// Unless `allow_invalid`, the hint must assess as valid.
    pub fn warm_start(
        &self,
        column_values: &[f64],
        row_dual_values: Option<&[f64]>,
        allow_invalid: bool,
    ) -> Result<(), SessionError> {
        let mut hint = PartialSolution::primal(column_values.to_vec());
        if let Some(duals) = row_dual_values {
            hint = hint.with_row_duals(duals.to_vec());
        }
        debug!(
            component = "session",
            operation = "warm_start",
            status = "start",
            num_values = column_values.len(),
            "Adding warm-start solution"
        );
        self.set_solution(&hint)?;
        if !allow_invalid && !self.assess_primal_solution()?.is_valid {
            return Err(SessionError::InvalidWarmStart);
        }
        Ok(())
    }

    /// Check the current primal values against the model's bounds, rows and
    /// integrality. All flags are false if there is nothing to assess.
    pub fn assess_primal_solution(&self) -> Result<PrimalAssessment, SessionError> {
        self.coordinator
            .with("Assess primal solution", |engine| engine.assess_primal())
    }

    /// Write the current solution on the worker thread.
    pub fn write_solution(
        &self,
        path: impl AsRef<Path>,
        style: SolutionStyle,
    ) -> Result<Ticket, SessionError> {
        let path = c_path(path.as_ref())?;
        self.coordinator.submit_ticket("Write solution", move |engine| {
            write_solution_job(engine, &path, style)
        })
    }

    /// Callback form of [`Session::write_solution`].
    pub fn write_solution_with(
        &self,
        path: impl AsRef<Path>,
        style: SolutionStyle,
        callback: impl FnOnce(Result<(), SessionError>) + Send + 'static,
    ) -> Result<(), SessionError> {
        let path = c_path(path.as_ref())?;
        self.coordinator.submit(
            "Write solution",
            move |engine| write_solution_job(engine, &path, style),
            Box::new(callback),
        )
    }

    // Reset

    /// Reset model, solver state and options.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.coordinator.with("Clear", |engine| {
            engine.reset_hints();
            engine.highs.clear().into_result("Clear")
        })?
    }

    /// Drop the model and any solution; options are kept.
    pub fn clear_model(&self) -> Result<(), SessionError> {
        self.coordinator.with("Clear model", |engine| {
            engine.reset_hints();
            engine.highs.clear_model().into_result("Clear model")
        })?
    }

    /// Drop solver state such as the solution and basis; the model is kept.
    pub fn clear_solver(&self) -> Result<(), SessionError> {
        self.coordinator.with("Clear solver", |engine| {
            engine.reset_hints();
            engine.highs.clear_solver().into_result("Clear solver")
        })?
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("log_file", &self.log_file)
            .field("solving", &self.is_solving())
            .finish()
    }
}

fn run_job(engine: &mut Engine) -> Result<(), SessionError> {
    engine.reset_hints();
    engine.highs.run().into_result("Run")
}

fn read_model_job(engine: &mut Engine, path: &CStr) -> Result<(), SessionError> {
    engine.reset_hints();
    engine.highs.read_model(path).into_result("Read model")
}

fn write_model_job(engine: &mut Engine, path: &CStr) -> Result<(), SessionError> {
    engine.highs.write_model(path).into_result("Write model")
}

fn write_solution_job(
    engine: &mut Engine,
    path: &CStr,
    style: SolutionStyle,
) -> Result<(), SessionError> {
    engine
        .highs
        .write_solution(path, style)
        .into_result("Write solution")
}

fn path_str(path: &Path) -> Result<&str, SessionError> {
    path.to_str()
        .ok_or_else(|| SessionError::argument(format!("path {} is not valid UTF-8", path.display())))
}

fn c_path(path: &Path) -> Result<CString, SessionError> {
    c_string("path", path_str(path)?)
}
