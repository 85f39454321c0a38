//! MIP progress extracted from the engine's log output.
//!
//! The branch-and-bound log prints a header row starting with `Proc. InQueue`
//! followed by one row per progress report:
//!
//! ```text
//!         Nodes      |    B&B Tree     |            Objective Bounds              |  Dynamic Constraints |       Work
//!      Proc. InQueue |  Leaves   Expl. | BestBound       BestSol              Gap |   Cuts   InLp Confl. | LpIters     Time
//!
//!  J       0       0         0   0.00%   -inf            1000               Large        0      0      0         0     0.0s
//!  T       0       0         0   0.00%   22.5            23                 2.17%        3      2      0        15     0.1s
//! ```
//!
//! Rows stop being interpreted once the `Solving report` section starts.

use crate::error::SessionError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::trace;

const ITERATION_HEADER: &str = "Proc. InQueue";
const REPORT_HEADER: &str = "Solving report";
const ROW_COLUMNS: usize = 12;

/// One progress report from the branch-and-bound table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolveProgress {
    /// Relative gap between the bounds, as a fraction. `None` while the log
    /// prints `Large`.
    pub relative_gap: Option<f64>,
    /// Objective of the best known solution.
    pub primal_bound: f64,
    /// Best proven bound.
    pub dual_bound: f64,
    /// Cuts currently in the LP.
    pub cut_count: u64,
    pub lp_iteration_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressPhase {
    #[default]
    Preparation,
    Iteration,
    Report,
}

/// Line-by-line state machine over a solve log.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    phase: ProgressPhase,
    latest: Option<SolveProgress>,
    updates: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ProgressPhase {
        self.phase
    }

    pub fn latest(&self) -> Option<SolveProgress> {
        self.latest
    }

    /// Number of progress rows seen so far.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Feed one log line; returns the progress it carried, if any.
    pub fn ingest(&mut self, line: &str) -> Option<SolveProgress> {
        if line.trim_start().starts_with(ITERATION_HEADER) {
            self.phase = ProgressPhase::Iteration;
            return None;
        }
        if line.trim_end() == REPORT_HEADER {
            self.phase = ProgressPhase::Report;
            return None;
        }
        if self.phase != ProgressPhase::Iteration {
            return None;
        }
        let progress = parse_iteration_row(line)?;
        trace!(
            component = "progress",
            operation = "ingest",
            relative_gap = ?progress.relative_gap,
            primal_bound = progress.primal_bound,
            dual_bound = progress.dual_bound,
            "Parsed progress row"
        );
        self.latest = Some(progress);
        self.updates += 1;
        Some(progress)
    }

    /// Feed every line from `reader`.
    pub fn ingest_all(&mut self, reader: impl BufRead) -> std::io::Result<Option<SolveProgress>> {
        for line in reader.lines() {
            self.ingest(&line?);
        }
        Ok(self.latest)
    }
}

/// Parse a bound or gap cell: `inf`, `-inf`, `x%` or a plain number.
fn parse_number(token: &str) -> Option<f64> {
    match token {
        "inf" | "+inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        _ => match token.strip_suffix('%') {
            Some(percent) => percent.parse::<f64>().ok().map(|value| value / 100.0),
            None => token.parse::<f64>().ok(),
        },
    }
}

/// Parse one branch-and-bound table row. Rows start with whitespace and may
/// carry a one-letter marker naming the heuristic that found a solution.
pub fn parse_iteration_row(line: &str) -> Option<SolveProgress> {
    if !line.starts_with(char::is_whitespace) {
        return None;
    }
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() == ROW_COLUMNS + 1 {
        let marker = tokens.remove(0);
        if marker.chars().count() != 1 || !marker.chars().all(char::is_alphanumeric) {
            return None;
        }
    }
    if tokens.len() != ROW_COLUMNS {
        return None;
    }
    let integer = |index: usize| tokens[index].parse::<u64>().ok();

    // Proc, InQueue and Leaves are plain counts.
    for index in 0..3 {
        integer(index)?;
    }
    let dual_bound = parse_number(tokens[4])?;
    let primal_bound = parse_number(tokens[5])?;
    let relative_gap = match tokens[6] {
        "Large" => None,
        token => Some(parse_number(token)?),
    };
    let cut_count = integer(7)?;
    integer(8)?;
    integer(9)?;
    let lp_iteration_count = integer(10)?;

    Some(SolveProgress {
        relative_gap,
        primal_bound,
        dual_bound,
        cut_count,
        lp_iteration_count,
    })
}

/// Replay a log file and return the last progress row.
pub fn read_progress(path: impl AsRef<Path>) -> Result<Option<SolveProgress>, SessionError> {
    let path = path.as_ref();
    let unreadable = |err: std::io::Error| {
        SessionError::argument(format!("cannot read log '{}': {}", path.display(), err))
    };
    let file = File::open(path).map_err(unreadable)?;
    ProgressTracker::new()
        .ingest_all(BufReader::new(file))
        .map_err(unreadable)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use std::io::Write;

    const LOG: &str = "\
Running HiGHS 1.7.0
Presolving model
        Nodes      |    B&B Tree     |            Objective Bounds              |  Dynamic Constraints |       Work
     Proc. InQueue |  Leaves   Expl. | BestBound       BestSol              Gap |   Cuts   InLp Confl. | LpIters     Time

 J       0       0         0   0.00%   -inf            1000               Large        0      0      0         0     0.0s
 T       0       0         0   0.00%   22.5            23                 2.17%        3      2      0        15     0.1s
         1       0         1 100.00%   23              23                 0.00%        4      2      1        21     0.1s

Solving report
  Status            Optimal
  Primal bound      23
";

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("inf"), Some(f64::INFINITY));
        assert_eq!(parse_number("-inf"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_number("2.5%"), Some(0.025));
        assert_eq!(parse_number("17"), Some(17.0));
        assert_eq!(parse_number("Large"), None);
    }

    #[test]
    fn test_parse_row_with_marker() {
        let row = " T       0       0         0   0.00%   22.5            23                 2.17%        3      2      0        15     0.1s";
        let progress = parse_iteration_row(row).unwrap();
        assert_eq!(progress.dual_bound, 22.5);
        assert_eq!(progress.primal_bound, 23.0);
        assert!((progress.relative_gap.unwrap() - 0.0217).abs() < 1e-12);
        assert_eq!(progress.cut_count, 3);
        assert_eq!(progress.lp_iteration_count, 15);
    }

    #[test]
    fn test_parse_row_rejects_other_lines() {
        assert!(parse_iteration_row("Running HiGHS 1.7.0").is_none());
        assert!(parse_iteration_row("  Status            Optimal").is_none());
        assert!(parse_iteration_row(" T       0       0         0   0.00%   22.5            23                 wide        3      2      0        15     0.1s").is_none());
    }

    #[test]
    fn test_parse_row_with_large_gap() {
        let row = " J       0       0         0   0.00%   -inf            1000               Large        0      0      0         0     0.0s";
        let progress = parse_iteration_row(row).unwrap();
        assert_eq!(progress.relative_gap, None);
        assert_eq!(progress.dual_bound, f64::NEG_INFINITY);
        assert_eq!(progress.primal_bound, 1000.0);
        assert_eq!(progress.lp_iteration_count, 0);
    }

    #[test]
    fn test_tracker_follows_phases() {
        let mut tracker = ProgressTracker::new();
        let mut seen = Vec::new();
        for line in LOG.lines() {
            if let Some(progress) = tracker.ingest(line) {
                seen.push(progress);
            }
        }
        assert_eq!(tracker.phase(), ProgressPhase::Report);
        assert_eq!(seen.len(), 3);
        assert_eq!(tracker.updates(), 3);
        assert_eq!(seen[0].relative_gap, None);
        let last = tracker.latest().unwrap();
        assert_eq!(last.relative_gap, Some(0.0));
        assert_eq!(last.lp_iteration_count, 21);
    }

    #[test]
    fn test_rows_before_header_are_ignored() {
        let mut tracker = ProgressTracker::new();
        let row = "         1       0         1 100.00%   23              23                 0.00%        4      2      1        21     0.1s";
        assert!(tracker.ingest(row).is_none());
        assert_eq!(tracker.phase(), ProgressPhase::Preparation);
    }

    #[test]
    fn test_read_progress_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LOG.as_bytes()).unwrap();
        let progress = read_progress(file.path()).unwrap().unwrap();
        assert_eq!(progress.primal_bound, 23.0);

        let err = read_progress("/nonexistent/highs.log").unwrap_err();
        assert_eq!(err.code(), "ARGUMENT_INVALID");
    }
}
