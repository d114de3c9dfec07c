//! Error taxonomy shared by the tensor engine and the crates built on it.

use thiserror::Error;

/// Everything that can go wrong while building or differentiating a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Operand shapes disagree where they must match (or broadcast).
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// Any other invalid-shape condition: construction, matmul arity, axes.
    #[error("shape error: {0}")]
    Shape(String),

    /// Value or operation not representable in the requested dtype.
    #[error("dtype error: {0}")]
    Dtype(String),

    /// Mathematically invalid input, e.g. the log of a negative number.
    #[error("domain error: {0}")]
    Domain(String),

    /// Division where the divisor contains an exact zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Unrecognized enumerated option, such as an activation name.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid use of the autograd graph.
    #[error("backward error: {0}")]
    Backward(String),
}

pub type Result<T> = std::result::Result<T, Error>;
