//! Tests for the closed contract type and the shared algebra

use crate::{CompoundIoContract, Contract, ContractAlgebra, ContractError, IoContract, Membership};
use pactum_core::{LpOracle, MinilpOracle, Point, Var};

fn producer() -> IoContract {
    IoContract::from_strings(&["x"], &["y"], &["x <= 1"], &["y - x <= 0"]).unwrap()
}

fn consumer() -> IoContract {
    IoContract::from_strings(&["y"], &["z"], &["y <= 3"], &["z - y <= 0"]).unwrap()
}

fn chain<C: ContractAlgebra>(first: &C, second: &C, oracle: &dyn LpOracle) -> C {
    first.compose(second, &[], oracle).unwrap()
}

#[test]
fn test_membership_satisfaction() {
    let cases = [
        (true, true, true),
        (true, false, false),
        (false, true, true),
        (false, false, true),
    ];
    for (in_assumptions, in_guarantees, expected) in cases {
        let membership = Membership {
            in_assumptions,
            in_guarantees,
        };
        assert_eq!(membership.satisfies_contract(), expected);
    }
}

#[test]
fn test_algebra_is_generic_over_representation() {
    let oracle = MinilpOracle::new();
    let single = chain(&producer(), &consumer(), &oracle);
    let compound = chain(
        &CompoundIoContract::from(producer()),
        &CompoundIoContract::from(consumer()),
        &oracle,
    );
    assert_eq!(compound, CompoundIoContract::from(single));
}

#[test]
fn test_polyhedral_pair_stays_polyhedral() {
    let oracle = MinilpOracle::new();
    let composed = Contract::from(producer())
        .compose(&Contract::from(consumer()), &[], &oracle)
        .unwrap();
    assert!(composed.is_polyhedral());
    assert_eq!(
        composed.as_polyhedral(),
        Some(&producer().compose(&consumer(), &[], &oracle).unwrap())
    );
}

#[test]
fn test_mixed_pair_promotes_to_compound() {
    let oracle = MinilpOracle::new();
    let disjunctive = CompoundIoContract::from_strings(
        &["y"],
        &["z"],
        &[&["y <= 3"]],
        &[&["z - y <= 0"], &["z - y <= -2"]],
    )
    .unwrap();

    let composed = Contract::from(producer())
        .compose(&Contract::from(disjunctive), &[], &oracle)
        .unwrap();
    assert!(!composed.is_polyhedral());
    assert_eq!(composed.to_compound().guarantees().len(), 2);
}

#[test]
fn test_mixed_merge_agrees_with_polyhedral_merge() {
    let oracle = MinilpOracle::new();
    let demanding =
        IoContract::from_strings(&["x"], &["y"], &[], &["-y <= -10"]).unwrap();

    let single = producer().merge(&demanding, &oracle);
    assert!(matches!(single, Err(ContractError::InconsistentMerge(_))));

    let mixed = Contract::from(producer()).merge(
        &Contract::from(CompoundIoContract::from(demanding)),
        &oracle,
    );
    assert!(matches!(mixed, Err(ContractError::InconsistentMerge(_))));
}

#[test]
fn test_quotient_with_compound_operand_is_unsupported() {
    let oracle = MinilpOracle::new();
    let system = Contract::from(CompoundIoContract::from(producer()));
    let result = system.quotient(&Contract::from(consumer()), &[], &oracle);
    assert!(matches!(result, Err(ContractError::Unsupported(_))));
}

#[test]
fn test_polyhedral_refinement_through_enum() {
    let oracle = MinilpOracle::new();
    let strong = Contract::from(
        IoContract::from_strings(&["x"], &["y"], &["x <= 2"], &["y - x <= 0"]).unwrap(),
    );
    let weak = Contract::from(producer());
    assert!(strong.refines(&weak, &oracle).unwrap());
}

#[test]
fn test_contains_behavior_through_enum() {
    let behavior: Point = [(Var::from("x"), 0.0), (Var::from("y"), 0.5)]
        .into_iter()
        .collect();
    let membership = Contract::from(producer()).contains_behavior(&behavior).unwrap();
    assert_eq!(
        membership,
        Membership {
            in_assumptions: true,
            in_guarantees: false
        }
    );
}
