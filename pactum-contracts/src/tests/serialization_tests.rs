//! Tests for machine and readable contract forms

use crate::serialization::{from_json, to_json};
use crate::{
    CompoundIoContract, Contract, ContractError, ContractRecord, IoContract,
    ReadableCompoundContract, ReadableContract,
};
use pactum_core::{MinilpOracle, Relation, TermRecord};

fn producer() -> IoContract {
    IoContract::from_strings(&["x"], &["y"], &["x <= 1"], &["y - x <= 0", "y + x = 2"]).unwrap()
}

// ===== Machine Form Tests =====

#[test]
fn test_machine_form_layout() {
    let record = producer().to_machine();
    assert_eq!(record.input_vars, vec!["x".to_string()]);
    assert_eq!(record.output_vars, vec!["y".to_string()]);
    assert_eq!(record.assumptions.len(), 1);
    assert_eq!(record.assumptions[0].coefficients.get("x"), Some(&1.0));
    assert_eq!(record.assumptions[0].constant, 1.0);
    assert!(record
        .guarantees
        .iter()
        .any(|t| t.relation == Relation::Eq));
}

#[test]
fn test_machine_round_trip() {
    let oracle = MinilpOracle::new();
    let original = producer();
    let restored = IoContract::from_machine(original.to_machine()).unwrap();
    assert_eq!(restored, original);
    assert!(restored.is_equivalent(&original, &oracle).unwrap());
}

#[test]
fn test_machine_form_revalidates_scope() {
    let mut record = producer().to_machine();
    record.assumptions.push(TermRecord {
        coefficients: [("y".to_string(), 1.0)].into_iter().collect(),
        constant: 0.0,
        relation: Relation::Le,
    });
    let result = IoContract::from_machine(record);
    assert!(matches!(result, Err(ContractError::Scope(_))));
}

#[test]
fn test_machine_form_rejects_non_finite_terms() {
    let mut record = producer().to_machine();
    record.guarantees[0].constant = f64::INFINITY;
    let result = IoContract::from_machine(record);
    assert!(matches!(result, Err(ContractError::Term(_))));
}

#[test]
fn test_compound_machine_form_unsupported() {
    let compound = CompoundIoContract::from_strings(
        &["x"],
        &["y"],
        &[&["x <= 0"], &["-x <= -1"]],
        &[],
    )
    .unwrap();
    let result = Contract::from(compound).to_machine();
    assert!(matches!(result, Err(ContractError::Unsupported(_))));
}

#[test]
fn test_polyhedral_machine_form_through_enum() {
    let record: ContractRecord = Contract::from(producer()).to_machine().unwrap();
    let restored = Contract::from_machine(record).unwrap();
    assert_eq!(restored, Contract::from(producer()));
}

// ===== JSON Tests =====

#[test]
fn test_json_round_trip() {
    let text = to_json(&producer()).unwrap();
    assert!(text.contains("\"input_vars\""));
    assert!(text.contains("\"coefficients\""));
    let restored: IoContract = from_json(&text).unwrap();
    assert_eq!(restored, producer());
}

#[test]
fn test_json_scope_violation_rejected() {
    let text = r#"{
        "input_vars": ["x"],
        "output_vars": ["y"],
        "assumptions": [{"coefficients": {"y": 1.0}, "constant": 0.0}],
        "guarantees": []
    }"#;
    let result: Result<IoContract, _> = from_json(text);
    assert!(matches!(result, Err(ContractError::Format(_))));
}

#[test]
fn test_malformed_json() {
    let result: Result<IoContract, _> = from_json("{\"input_vars\": 3}");
    assert!(matches!(result, Err(ContractError::Format(_))));
}

// ===== Readable Form Tests =====

#[test]
fn test_readable_form_uses_canonical_terms() {
    let readable = producer().to_readable();
    assert_eq!(readable.assumptions, vec!["x <= 1".to_string()]);
    assert!(readable.guarantees.contains(&"-x + y <= 0".to_string()));
    assert!(readable.guarantees.contains(&"x + y = 2".to_string()));
}

#[test]
fn test_readable_round_trip() {
    let original = producer();
    let restored = IoContract::from_readable(&original.to_readable()).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn test_readable_syntax_error() {
    let readable = ReadableContract {
        input_vars: vec!["x".to_string()],
        output_vars: vec![],
        assumptions: vec!["x <=".to_string()],
        guarantees: vec![],
    };
    let result = IoContract::from_readable(&readable);
    assert!(matches!(result, Err(ContractError::Term(_))));
}

#[test]
fn test_compound_readable_round_trip() {
    let readable = ReadableCompoundContract {
        input_vars: vec!["x".to_string()],
        output_vars: vec!["y".to_string()],
        assumptions: vec![vec!["x <= 0".to_string()], vec!["-x <= -1".to_string()]],
        guarantees: vec![vec!["y - x <= 0".to_string()]],
    };

    let contract = Contract::from_readable(&readable).unwrap();
    assert!(!contract.is_polyhedral());
    let again = Contract::from_readable(&contract.to_readable()).unwrap();
    assert_eq!(again, contract);
}

#[test]
fn test_single_disjunct_reads_back_polyhedral() {
    let readable = Contract::from(producer()).to_readable();
    assert_eq!(readable.assumptions.len(), 1);
    let contract = Contract::from_readable(&readable).unwrap();
    assert_eq!(contract, Contract::from(producer()));
}
