//! Tests for contract error types

use super::*;

// ===== ContractError Tests =====

#[test]
fn test_scope_error() {
    let error = ContractError::Scope("assumptions reference non-input variable o".to_string());
    assert_eq!(
        error.to_string(),
        "Scope error: assumptions reference non-input variable o"
    );
}

#[test]
fn test_incompatible_args_error() {
    let error = ContractError::IncompatibleArgs("contracts share output x".to_string());
    assert_eq!(
        error.to_string(),
        "Incompatible arguments: contracts share output x"
    );
}

#[test]
fn test_inconsistent_merge_error() {
    let error = ContractError::InconsistentMerge(
        "contracts cannot be merged: guarantees are inconsistent".to_string(),
    );
    assert_eq!(
        error.to_string(),
        "Inconsistent merge: contracts cannot be merged: guarantees are inconsistent"
    );
    assert!(error.is_unsatisfiable());
}

#[test]
fn test_infeasible_quotient_error() {
    let error = ContractError::InfeasibleQuotient("could not remove y".to_string());
    assert_eq!(error.to_string(), "Infeasible quotient: could not remove y");
    assert!(error.is_unsatisfiable());
}

#[test]
fn test_unsupported_error() {
    let error = ContractError::Unsupported("machine form of compound contracts".to_string());
    assert_eq!(
        error.to_string(),
        "Unsupported operation: machine form of compound contracts"
    );
}

#[test]
fn test_format_error() {
    let error = ContractError::Format("expected an object".to_string());
    assert_eq!(error.to_string(), "Format error: expected an object");
    assert!(!error.is_unsatisfiable());
}

// ===== Conversion Tests =====

#[test]
fn test_term_error_is_transparent() {
    let error: ContractError = pactum_core::Error::Oracle("timed out".to_string()).into();
    assert_eq!(error.to_string(), "Oracle error: timed out");
    assert!(error.is_oracle_failure());
    assert!(!error.is_unsatisfiable());
}

#[test]
fn test_non_oracle_term_error() {
    let error: ContractError = pactum_core::Error::Syntax("bad".to_string()).into();
    assert!(!error.is_oracle_failure());
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: ContractError = json_error.into();
    assert!(matches!(error, ContractError::Format(_)));
}
