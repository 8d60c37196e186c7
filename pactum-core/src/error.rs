//! Error types for Pactum

use thiserror::Error;

/// Errors raised by term handling, elimination and the LP oracle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed term, such as a non-finite coefficient or constant
    #[error("Invalid term: {0}")]
    InvalidTerm(String),

    /// Evaluation reached a variable the point does not assign
    #[error("Missing assignment for variable: {0}")]
    MissingAssignment(String),

    /// Term text that could not be parsed
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Variable elimination could not produce a result
    #[error("Elimination failed: {0}")]
    EliminationFailed(String),

    /// Failure of the LP backend itself
    #[error("Oracle error: {0}")]
    Oracle(String),
}

impl Error {
    /// True when the failure came from the LP backend rather than from the input
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, Error::Oracle(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
