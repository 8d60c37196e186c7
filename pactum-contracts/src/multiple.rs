//! Composition of many contracts in dependency order

use crate::errors::{ContractError, ContractResult};
use crate::iocontract::IoContract;
use pactum_core::{LpOracle, Var};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Producer-first order of `contracts`.
///
/// Contract `j` depends on contract `i` when some output of `i` is an input
/// of `j`. Fails on a dependency cycle.
pub fn dependency_order(contracts: &[IoContract]) -> ContractResult<Vec<usize>> {
    let mut dependencies: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for (j, consumer) in contracts.iter().enumerate() {
        let producers = contracts
            .iter()
            .enumerate()
            .filter(|(i, producer)| {
                *i != j && !producer.output_vars().is_disjoint(consumer.input_vars())
            })
            .map(|(i, _)| i)
            .collect();
        dependencies.insert(j, producers);
    }

    let mut sorted = Vec::with_capacity(contracts.len());
    let mut visited = FxHashSet::default();
    let mut on_stack = FxHashSet::default();
    for index in 0..contracts.len() {
        if !visited.contains(&index) {
            visit(index, &dependencies, &mut visited, &mut on_stack, &mut sorted)?;
        }
    }
    Ok(sorted)
}

fn visit(
    index: usize,
    dependencies: &FxHashMap<usize, Vec<usize>>,
    visited: &mut FxHashSet<usize>,
    on_stack: &mut FxHashSet<usize>,
    sorted: &mut Vec<usize>,
) -> ContractResult<()> {
    visited.insert(index);
    on_stack.insert(index);

    if let Some(producers) = dependencies.get(&index) {
        for &producer in producers {
            if !visited.contains(&producer) {
                visit(producer, dependencies, visited, on_stack, sorted)?;
            } else if on_stack.contains(&producer) {
                return Err(ContractError::IncompatibleArgs(format!(
                    "contracts {} and {} form a dependency cycle",
                    producer, index
                )));
            }
        }
    }

    on_stack.remove(&index);
    sorted.push(index);
    Ok(())
}

/// Compose every contract, producers before consumers.
///
/// Variables in `vars_to_keep` stay visible as outputs once they are
/// produced.
pub fn compose_all(
    contracts: &[IoContract],
    vars_to_keep: &[Var],
    oracle: &dyn LpOracle,
) -> ContractResult<IoContract> {
    let order = dependency_order(contracts)?;
    let mut order = order.into_iter();
    let Some(first) = order.next() else {
        return Err(ContractError::IncompatibleArgs(
            "no contracts to compose".to_string(),
        ));
    };

    let mut composed = contracts[first].clone();
    for index in order {
        let next = &contracts[index];
        let keep: Vec<Var> = vars_to_keep
            .iter()
            .filter(|v| composed.output_vars().contains(*v) || next.output_vars().contains(*v))
            .cloned()
            .collect();
        debug!(step = index, kept = keep.len(), "composing next contract");
        composed = composed.compose(next, &keep, oracle)?;
    }
    Ok(composed)
}
