//! Error types for contract operations

use thiserror::Error;

/// Errors raised by contract construction and the contract operators
///
/// The kinds separate three situations callers usually handle differently:
/// a malformed request (`Scope`, `IncompatibleArgs`, `Format`), an
/// unsatisfiable specification (`InconsistentMerge`, `InfeasibleQuotient`)
/// and a failure of the LP backend (`Term` wrapping an oracle error).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    /// Constraint mentions a variable outside the contract's scope
    #[error("Scope error: {0}")]
    Scope(String),

    /// Operands whose variable sets do not fit the operator
    #[error("Incompatible arguments: {0}")]
    IncompatibleArgs(String),

    /// Merged assumptions or guarantees are empty
    #[error("Inconsistent merge: {0}")]
    InconsistentMerge(String),

    /// No contract completes the system with the given part
    #[error("Infeasible quotient: {0}")]
    InfeasibleQuotient(String),

    /// Operator not defined for this contract representation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Serialized contract could not be read or written
    #[error("Format error: {0}")]
    Format(String),

    /// Error from term handling or the LP oracle
    #[error(transparent)]
    Term(#[from] pactum_core::Error),
}

impl ContractError {
    /// True when the LP backend failed, as opposed to the request or the
    /// specification being at fault
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, ContractError::Term(inner) if inner.is_oracle_failure())
    }

    /// True for findings about the specification itself
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(
            self,
            ContractError::InconsistentMerge(_) | ContractError::InfeasibleQuotient(_)
        )
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        ContractError::Format(err.to_string())
    }
}

/// Result type for contract operations
pub type ContractResult<T> = Result<T, ContractError>;

#[cfg(test)]
#[path = "errors/errors_tests.rs"]
mod tests;
