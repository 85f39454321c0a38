//! Typed engine options.
//!
//! Every engine option has a declared kind. Writes look the kind up first and
//! coerce the caller's value into it, so a single typed engine call is made.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an engine option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Double,
    String,
}

impl OptionKind {
    /// Map the engine's option type code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(OptionKind::Bool),
            1 => Some(OptionKind::Int),
            2 => Some(OptionKind::Double),
            3 => Some(OptionKind::String),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionKind::Bool => "bool",
            OptionKind::Int => "integer",
            OptionKind::Double => "double",
            OptionKind::String => "string",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An option value as supplied by, or returned to, the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(String),
}

impl OptionValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "integer",
            OptionValue::Double(_) => "double",
            OptionValue::Str(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            OptionValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Int(value) => Some(f64::from(*value)),
            OptionValue::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Parse a command-line literal: `true`/`false`, then integer, then
    /// float, otherwise a string.
    pub fn parse_literal(text: &str) -> Self {
        match text {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            _ => {
                if let Ok(value) = text.parse::<i32>() {
                    OptionValue::Int(value)
                } else if let Ok(value) = text.parse::<f64>() {
                    OptionValue::Double(value)
                } else {
                    OptionValue::Str(text.to_string())
                }
            }
        }
    }

    /// Convert into the option's declared kind.
    ///
    /// Integers are accepted for double options; doubles are accepted for
    /// integer options only when finite, integral and in range.
    pub fn coerce(self, name: &str, kind: OptionKind) -> Result<OptionValue, SessionError> {
        let mismatch = |got: &'static str| SessionError::OptionTypeMismatch {
            name: name.to_string(),
            expected: kind,
            got,
        };
        match (kind, self) {
            (OptionKind::Bool, value @ OptionValue::Bool(_)) => Ok(value),
            (OptionKind::String, value @ OptionValue::Str(_)) => Ok(value),
            (OptionKind::Int, value @ OptionValue::Int(_)) => Ok(value),
            (OptionKind::Int, OptionValue::Double(value)) => {
                if value.is_finite()
                    && value.fract() == 0.0
                    && value >= f64::from(i32::MIN)
                    && value <= f64::from(i32::MAX)
                {
                    Ok(OptionValue::Int(value as i32))
                } else {
                    Err(mismatch("non-integral double"))
                }
            }
            (OptionKind::Double, value @ OptionValue::Double(_)) => Ok(value),
            (OptionKind::Double, OptionValue::Int(value)) => Ok(OptionValue::Double(f64::from(value))),
            (_, other) => Err(mismatch(other.kind_name())),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{value}"),
            OptionValue::Int(value) => write!(f, "{value}"),
            OptionValue::Double(value) => write!(f, "{value}"),
            OptionValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Double(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}
