//! Session configuration.

use crate::error::SessionError;
use crate::options::OptionValue;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Engine settings applied when a session is created.
///
/// Named fields cover the common settings; anything else goes through
/// `options`, keyed by engine option name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Time limit in seconds. `None` means no limit.
    pub time_limit: Option<f64>,
    /// Relative MIP gap tolerance. `None` uses engine default.
    pub mip_gap: Option<f64>,
    /// Enable/disable presolve. `None` uses engine default.
    pub presolve: Option<bool>,
    /// Number of threads to use. `None` uses engine default.
    pub threads: Option<u32>,
    /// Primal and dual feasibility tolerance. `None` uses engine default.
    pub tolerance: Option<f64>,
    /// Log engine output to console. `None` uses engine default.
    pub log_to_console: Option<bool>,
    /// Engine log destination.
    pub log_file: Option<PathBuf>,
    /// Seed for the engine's random choices. `None` uses engine default.
    pub random_seed: Option<u32>,
    /// Additional engine options by name.
    pub options: BTreeMap<String, OptionValue>,
}

impl SessionConfig {
    /// Create a new configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the time limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Set the relative MIP gap at which a solve stops.
    pub fn with_mip_gap(mut self, gap: f64) -> Self {
        self.mip_gap = Some(gap);
        self
    }

    /// Turn presolve on or off.
    pub fn with_presolve(mut self, enabled: bool) -> Self {
        self.presolve = Some(enabled);
        self
    }

    /// Set the number of engine threads.
    pub fn with_threads(mut self, count: u32) -> Self {
        self.threads = Some(count);
        self
    }

    /// Set both the primal and the dual feasibility tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = Some(tol);
        self
    }

    /// Enable or disable engine console output.
    pub fn with_log_to_console(mut self, enabled: bool) -> Self {
        self.log_to_console = Some(enabled);
        self
    }

    /// Send the engine log to `path`.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Set the random seed.
    pub fn with_random_seed(mut self, seed: u32) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set an arbitrary engine option.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Check if this configuration is completely empty (all defaults).
    pub fn is_empty(&self) -> bool {
        self.time_limit.is_none()
            && self.mip_gap.is_none()
            && self.presolve.is_none()
            && self.threads.is_none()
            && self.tolerance.is_none()
            && self.log_to_console.is_none()
            && self.log_file.is_none()
            && self.random_seed.is_none()
            && self.options.is_empty()
    }

    /// Parse a JSON configuration. Unknown keys are rejected.
    pub fn from_json_str(json: &str) -> Result<Self, SessionError> {
        serde_json::from_str(json)
            .map_err(|err| SessionError::argument(format!("invalid session config: {err}")))
    }

    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            SessionError::argument(format!("cannot read config '{}': {}", path.display(), err))
        })?;
        Self::from_json_str(&text)
    }

    /// Flatten into engine option writes, named fields first.
    ///
    /// A log file turns console logging off unless `log_to_console` says
    /// otherwise.
    pub fn to_options(&self) -> Result<Vec<(String, OptionValue)>, SessionError> {
        let mut options: Vec<(String, OptionValue)> = Vec::new();
        let mut push = |name: &str, value: OptionValue| options.push((name.to_string(), value));

        if let Some(seconds) = self.time_limit {
            push("time_limit", OptionValue::Double(seconds));
        }
        if let Some(gap) = self.mip_gap {
            push("mip_rel_gap", OptionValue::Double(gap));
        }
        if let Some(enabled) = self.presolve {
            push("presolve", OptionValue::from(if enabled { "on" } else { "off" }));
        }
        if let Some(count) = self.threads {
            push("threads", OptionValue::Int(small_int("threads", count)?));
        }
        if let Some(tol) = self.tolerance {
            push("primal_feasibility_tolerance", OptionValue::Double(tol));
            push("dual_feasibility_tolerance", OptionValue::Double(tol));
        }
        if let Some(path) = &self.log_file {
            let path = path
                .to_str()
                .ok_or_else(|| SessionError::argument("log file path must be valid UTF-8"))?;
            push("log_file", OptionValue::from(path));
            if self.log_to_console.is_none() {
                push("log_to_console", OptionValue::Bool(false));
            }
        }
        if let Some(enabled) = self.log_to_console {
            push("log_to_console", OptionValue::Bool(enabled));
        }
        if let Some(seed) = self.random_seed {
            push("random_seed", OptionValue::Int(small_int("random_seed", seed)?));
        }
        for (name, value) in &self.options {
            push(name, value.clone());
        }
        Ok(options)
    }
}

fn small_int(name: &str, value: u32) -> Result<i32, SessionError> {
    i32::try_from(value)
        .map_err(|_| SessionError::argument(format!("{name} value {value} is out of range")))
}
