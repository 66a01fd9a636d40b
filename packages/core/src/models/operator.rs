//! Arithmetic Operators and the Value Rule
//!
//! Every reply in a tree is one calculator step: the parent's value, an
//! operator and a right-hand operand. [`apply`] is the single place where a
//! child value is derived, so every stored `OP` node goes through it exactly
//! once at creation time.
//!
//! # Examples
//!
//! ```rust
//! use numtree_core::models::{apply, Operator};
//!
//! let op: Operator = "+".parse().unwrap();
//! assert_eq!(apply(42.0, op, 10.0).unwrap(), 52.0);
//! assert!(apply(42.0, Operator::Divide, 0.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failures of the value rule
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("Division by zero is not allowed")]
    DivisionByZero,

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    /// Operand or result is NaN or infinite
    #[error("Result is not a finite number")]
    NonFinite,
}

/// One of the four arithmetic operators a reply may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    /// Wire/storage symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
        }
    }

    /// Apply this operator to `left` and `right`
    pub fn apply(self, left: f64, right: f64) -> Result<f64, ValueError> {
        apply(left, self, right)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            other => Err(ValueError::InvalidOperator(other.to_string())),
        }
    }
}

/// Compute a child value from its parent value, an operator and the operand
///
/// Division by zero and any non-finite operand or result are rejected, so a
/// stored value is always a finite `f64`.
pub fn apply(left: f64, op: Operator, right: f64) -> Result<f64, ValueError> {
    if !left.is_finite() || !right.is_finite() {
        return Err(ValueError::NonFinite);
    }

    let value = match op {
        Operator::Add => left + right,
        Operator::Subtract => left - right,
        Operator::Multiply => left * right,
        Operator::Divide => {
            if right == 0.0 {
                return Err(ValueError::DivisionByZero);
            }
            left / right
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValueError::NonFinite)
    }
}
