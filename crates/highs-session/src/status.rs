//! Engine model status codes.

/// Terminal model status reported by HiGHS after a run.
///
/// Discriminants are the engine's own codes, so `status as i32` round-trips
/// with [`ModelStatus::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ModelStatus {
    NotSet = 0,
    LoadError = 1,
    ModelError = 2,
    PresolveError = 3,
    SolveError = 4,
    PostsolveError = 5,
    ModelEmpty = 6,
    Optimal = 7,
    Infeasible = 8,
    UnboundedOrInfeasible = 9,
    Unbounded = 10,
    ObjectiveBound = 11,
    ObjectiveTarget = 12,
    ReachedTimeLimit = 13,
    ReachedIterationLimit = 14,
    Unknown = 15,
    ReachedSolutionLimit = 16,
    Interrupted = 17,
}

impl ModelStatus {
    /// Map an engine status code. Codes outside the enumeration map to
    /// [`ModelStatus::Unknown`].
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ModelStatus::NotSet,
            1 => ModelStatus::LoadError,
            2 => ModelStatus::ModelError,
            3 => ModelStatus::PresolveError,
            4 => ModelStatus::SolveError,
            5 => ModelStatus::PostsolveError,
            6 => ModelStatus::ModelEmpty,
            7 => ModelStatus::Optimal,
            8 => ModelStatus::Infeasible,
            9 => ModelStatus::UnboundedOrInfeasible,
            10 => ModelStatus::Unbounded,
            11 => ModelStatus::ObjectiveBound,
            12 => ModelStatus::ObjectiveTarget,
            13 => ModelStatus::ReachedTimeLimit,
            14 => ModelStatus::ReachedIterationLimit,
            16 => ModelStatus::ReachedSolutionLimit,
            17 => ModelStatus::Interrupted,
            _ => ModelStatus::Unknown,
        }
    }

    /// The engine's integer code.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_optimal(self) -> bool {
        matches!(self, ModelStatus::Optimal)
    }

    /// Whether the run ended in a state the caller can reason about, as
    /// opposed to an engine-side error or an unset status.
    pub fn is_conclusive(self) -> bool {
        matches!(
            self,
            ModelStatus::Optimal
                | ModelStatus::Infeasible
                | ModelStatus::UnboundedOrInfeasible
                | ModelStatus::Unbounded
                | ModelStatus::ObjectiveBound
                | ModelStatus::ObjectiveTarget
                | ModelStatus::ReachedTimeLimit
                | ModelStatus::ReachedIterationLimit
                | ModelStatus::ReachedSolutionLimit
        )
    }

    /// Limit-reached statuses may still carry a feasible point.
    pub fn may_have_solution(self) -> bool {
        matches!(
            self,
            ModelStatus::Optimal
                | ModelStatus::ObjectiveBound
                | ModelStatus::ObjectiveTarget
                | ModelStatus::ReachedTimeLimit
                | ModelStatus::ReachedIterationLimit
                | ModelStatus::ReachedSolutionLimit
                | ModelStatus::Interrupted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelStatus::NotSet => "not_set",
            ModelStatus::LoadError => "load_error",
            ModelStatus::ModelError => "model_error",
            ModelStatus::PresolveError => "presolve_error",
            ModelStatus::SolveError => "solve_error",
            ModelStatus::PostsolveError => "postsolve_error",
            ModelStatus::ModelEmpty => "model_empty",
            ModelStatus::Optimal => "optimal",
            ModelStatus::Infeasible => "infeasible",
            ModelStatus::UnboundedOrInfeasible => "unbounded_or_infeasible",
            ModelStatus::Unbounded => "unbounded",
            ModelStatus::ObjectiveBound => "objective_bound",
            ModelStatus::ObjectiveTarget => "objective_target",
            ModelStatus::ReachedTimeLimit => "time_limit",
            ModelStatus::ReachedIterationLimit => "iteration_limit",
            ModelStatus::Unknown => "unknown",
            ModelStatus::ReachedSolutionLimit => "solution_limit",
            ModelStatus::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
