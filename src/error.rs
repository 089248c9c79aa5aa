use crate::chain::ReadError;
use thiserror::Error;

/// Fixed-point arithmetic failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("tick {0} outside the supported range")]
    TickOutOfRange(i32),
    #[error("global accrual index is below the stored user index")]
    IndexRegression,
    #[error("negative balance where a non-negative one is required")]
    NegativeBalance,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Math error: {0}")]
    Math(#[from] MathError),
    #[error("Chain read failed: {0}")]
    Read(#[from] ReadError),
    #[error("Failed to decode stored row: {0}")]
    Decode(String),
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Decode(err.to_string())
    }
}
