//! Arithmetic operations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// `b` was zero for a division.
    #[error("division by zero")]
    DivisionByZero,
    /// Path segment named no known operation.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
}

/// Operands of every operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Operands {
    /// Left operand.
    pub a: f64,
    /// Right operand.
    pub b: f64,
}

/// Successful result body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MathResult {
    /// Computed value.
    pub result: f64,
}

/// One of the four endpoints under `/math/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`, rejecting `b == 0`
    Divide,
}

impl Operation {
    /// Path segment for this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    /// Apply to `operands`.
    pub fn apply(self, Operands { a, b }: Operands) -> Result<f64, MathError> {
        match self {
            Self::Add => Ok(a + b),
            Self::Subtract => Ok(a - b),
            Self::Multiply => Ok(a * b),
            Self::Divide if b == 0.0 => Err(MathError::DivisionByZero),
            Self::Divide => Ok(a / b),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            "multiply" => Ok(Self::Multiply),
            "divide" => Ok(Self::Divide),
            other => Err(MathError::UnknownOperation(other.to_string())),
        }
    }
}
