//! Tests for dependency-ordered composition

use crate::{compose_all, dependency_order, ContractError, IoContract};
use pactum_core::{MinilpOracle, Var};

fn contract(inputs: &[&str], outputs: &[&str], a: &[&str], g: &[&str]) -> IoContract {
    IoContract::from_strings(inputs, outputs, a, g).unwrap()
}

fn stage(input: &str, output: &str, limit: f64) -> IoContract {
    let assumption = format!("{} <= {}", input, limit);
    let upper = format!("{} - {} <= 1", output, input);
    let lower = format!("{} - {} <= 0", input, output);
    contract(&[input], &[output], &[assumption.as_str()], &[upper.as_str(), lower.as_str()])
}

#[test]
fn test_dependency_order_puts_producers_first() {
    let contracts = vec![stage("c", "d", 8.0), stage("a", "b", 4.0), stage("b", "c", 6.0)];
    let order = dependency_order(&contracts).unwrap();
    assert_eq!(order, vec![1, 2, 0]);
}

#[test]
fn test_compose_all_matches_chain() {
    let oracle = MinilpOracle::new();
    let contracts = vec![stage("c", "d", 8.0), stage("a", "b", 4.0), stage("b", "c", 6.0)];

    let composed = compose_all(&contracts, &[], &oracle).unwrap();
    let expected = contract(&["a"], &["d"], &["a <= 4"], &["d - a <= 3", "a - d <= 0"]);
    assert!(composed.is_equivalent(&expected, &oracle).unwrap());
}

#[test]
fn test_compose_all_keeps_requested_outputs() {
    let oracle = MinilpOracle::new();
    let contracts = vec![stage("a", "b", 4.0), stage("b", "c", 6.0), stage("c", "d", 8.0)];

    let composed = compose_all(&contracts, &[Var::from("c")], &oracle).unwrap();
    assert!(composed.output_vars().contains("c"));
    assert!(composed.output_vars().contains("d"));
    assert!(!composed.output_vars().contains("b"));
}

#[test]
fn test_compose_all_single_contract() {
    let oracle = MinilpOracle::new();
    let only = stage("a", "b", 4.0);
    let composed = compose_all(std::slice::from_ref(&only), &[], &oracle).unwrap();
    assert_eq!(composed, only);
}

#[test]
fn test_dependency_cycle_rejected() {
    let oracle = MinilpOracle::new();
    let contracts = vec![stage("a", "b", 4.0), stage("b", "a", 4.0)];
    let result = compose_all(&contracts, &[], &oracle);
    assert!(matches!(result, Err(ContractError::IncompatibleArgs(_))));
}

#[test]
fn test_empty_set_rejected() {
    let oracle = MinilpOracle::new();
    let result = compose_all(&[], &[], &oracle);
    assert!(matches!(result, Err(ContractError::IncompatibleArgs(_))));
}
