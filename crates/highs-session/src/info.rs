//! Engine info introspection through a static registry of known records.

use crate::ffi::{Highs, c_string};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Storage type of an info record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    Int,
    Int64,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    Int(i32),
    Int64(i64),
    Double(f64),
}

impl InfoValue {
    pub fn kind(self) -> InfoKind {
        match self {
            InfoValue::Int(_) => InfoKind::Int,
            InfoValue::Int64(_) => InfoKind::Int64,
            InfoValue::Double(_) => InfoKind::Double,
        }
    }

    /// Integral records widen to `i64`; doubles yield `None`.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            InfoValue::Int(value) => Some(i64::from(value)),
            InfoValue::Int64(value) => Some(value),
            InfoValue::Double(_) => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            InfoValue::Int(value) => f64::from(value),
            InfoValue::Int64(value) => value as f64,
            InfoValue::Double(value) => value,
        }
    }
}

impl fmt::Display for InfoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfoValue::Int(value) => write!(f, "{value}"),
            InfoValue::Int64(value) => write!(f, "{value}"),
            InfoValue::Double(value) => write!(f, "{value}"),
        }
    }
}

/// A known info record and the value reported before the engine sets it.
#[derive(Debug, Clone, Copy)]
pub struct InfoEntry {
    pub name: &'static str,
    pub kind: InfoKind,
    pub default: InfoValue,
}

const fn int(name: &'static str, default: i32) -> InfoEntry {
    InfoEntry {
        name,
        kind: InfoKind::Int,
        default: InfoValue::Int(default),
    }
}

const fn int64(name: &'static str, default: i64) -> InfoEntry {
    InfoEntry {
        name,
        kind: InfoKind::Int64,
        default: InfoValue::Int64(default),
    }
}

const fn double(name: &'static str, default: f64) -> InfoEntry {
    InfoEntry {
        name,
        kind: InfoKind::Double,
        default: InfoValue::Double(default),
    }
}

/// Every info record read by [`Info::read`].
pub const INFO_REGISTRY: &[InfoEntry] = &[
    int("valid", 0),
    int("simplex_iteration_count", -1),
    int("ipm_iteration_count", -1),
    int("crossover_iteration_count", -1),
    int("pdlp_iteration_count", -1),
    int("qp_iteration_count", -1),
    int("primal_solution_status", 0),
    int("dual_solution_status", 0),
    int("basis_validity", 0),
    double("objective_function_value", 0.0),
    int64("mip_node_count", -1),
    double("mip_dual_bound", 0.0),
    double("mip_gap", f64::INFINITY),
    int("num_primal_infeasibilities", -1),
    double("max_primal_infeasibility", f64::INFINITY),
    double("sum_primal_infeasibilities", f64::INFINITY),
    int("num_dual_infeasibilities", -1),
    double("max_dual_infeasibility", f64::INFINITY),
    double("sum_dual_infeasibilities", f64::INFINITY),
];

/// Snapshot of the engine's info records, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Info {
    values: BTreeMap<&'static str, InfoValue>,
}

impl Info {
    /// All registry records at their defaults.
    pub fn defaults() -> Self {
        Self {
            values: INFO_REGISTRY
                .iter()
                .map(|entry| (entry.name, entry.default))
                .collect(),
        }
    }

    /// Read every registry record, keeping the default where the engine
    /// reports nothing.
    pub(crate) fn read(highs: &Highs) -> Self {
        let values = INFO_REGISTRY
            .iter()
            .map(|entry| {
                let value = c_string("info", entry.name).ok().and_then(|name| match entry.kind {
                    InfoKind::Int => highs.int_info(&name).map(InfoValue::Int),
                    InfoKind::Int64 => highs.int64_info(&name).map(InfoValue::Int64),
                    InfoKind::Double => highs.double_info(&name).map(InfoValue::Double),
                });
                (entry.name, value.unwrap_or(entry.default))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<InfoValue> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, InfoValue)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn integer(&self, name: &str) -> i64 {
        self.get(name).and_then(InfoValue::as_i64).unwrap_or(-1)
    }

    fn float(&self, name: &str) -> f64 {
        self.get(name).map_or(f64::NAN, InfoValue::as_f64)
    }

    pub fn simplex_iteration_count(&self) -> i64 {
        self.integer("simplex_iteration_count")
    }

    pub fn ipm_iteration_count(&self) -> i64 {
        self.integer("ipm_iteration_count")
    }

    pub fn qp_iteration_count(&self) -> i64 {
        self.integer("qp_iteration_count")
    }

    pub fn mip_node_count(&self) -> i64 {
        self.integer("mip_node_count")
    }

    pub fn primal_solution_status(&self) -> i64 {
        self.integer("primal_solution_status")
    }

    pub fn dual_solution_status(&self) -> i64 {
        self.integer("dual_solution_status")
    }

    pub fn basis_validity(&self) -> i64 {
        self.integer("basis_validity")
    }

    pub fn objective_function_value(&self) -> f64 {
        self.float("objective_function_value")
    }

    pub fn mip_dual_bound(&self) -> f64 {
        self.float("mip_dual_bound")
    }

    pub fn mip_gap(&self) -> f64 {
        self.float("mip_gap")
    }

    pub fn max_primal_infeasibility(&self) -> f64 {
        self.float("max_primal_infeasibility")
    }

    /// MIP relative gap, only meaningful once branch and bound has run.
    pub fn relative_gap(&self) -> Option<f64> {
        (self.mip_node_count() >= 0).then(|| self.mip_gap())
    }
}

impl Default for Info {
    fn default() -> Self {
        Self::defaults()
    }
}
