//! Single-polyhedron assume-guarantee contracts
//!
//! An [`IoContract`] splits its ports into inputs and outputs and carries
//! two term lists: the assumptions, over inputs only, describe the
//! environments the component supports; the guarantees, over inputs and
//! outputs, describe what the component promises in those environments.
//!
//! # Operators
//!
//! - `compose` connects two components and hides the ports they share.
//!   When one side feeds the other, the consumer's assumptions are
//!   rewritten in terms of top-level inputs using the producer's
//!   assumptions and guarantees; whatever the producer does not discharge
//!   is added to the composed assumptions.
//! - `quotient` finds the missing component: `q.compose(other)` refines
//!   the system-level contract.
//! - `merge` conjoins two specifications of the same component.
//! - `refines` is the substitutability preorder: weaker assumptions,
//!   stronger guarantees under the other contract's assumptions.
//!
//! All operators are pure and take the LP oracle explicitly.

use crate::contract::Membership;
use crate::errors::{ContractError, ContractResult};
use pactum_core::{
    Bounds, Coefficients, EliminationTrace, LpOracle, Optimum, Point, Sense, TermList, Var,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// An assume-guarantee contract over a single convex region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "crate::serialization::ContractRecord",
    into = "crate::serialization::ContractRecord"
)]
pub struct IoContract {
    input_vars: BTreeSet<Var>,
    output_vars: BTreeSet<Var>,
    assumptions: TermList,
    guarantees: TermList,
}

/// Collect port names, rejecting repeated entries.
pub(crate) fn port_set<V: Into<Var>>(
    vars: impl IntoIterator<Item = V>,
    role: &str,
) -> ContractResult<BTreeSet<Var>> {
    let mut set = BTreeSet::new();
    for var in vars {
        let var = var.into();
        if !set.insert(var.clone()) {
            return Err(ContractError::Scope(format!(
                "{} variable {} is listed more than once",
                role, var
            )));
        }
    }
    Ok(set)
}

pub(crate) fn join_vars<'a>(vars: impl IntoIterator<Item = &'a Var>) -> String {
    vars.into_iter()
        .map(Var::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check the scoping rules shared by single and compound contracts.
pub(crate) fn check_scope(
    input_vars: &BTreeSet<Var>,
    output_vars: &BTreeSet<Var>,
    assumptions: &TermList,
    guarantees: &TermList,
) -> ContractResult<()> {
    let overlap: Vec<&Var> = input_vars.intersection(output_vars).collect();
    if !overlap.is_empty() {
        return Err(ContractError::Scope(format!(
            "variables are both inputs and outputs: {}",
            join_vars(overlap)
        )));
    }

    let stray: BTreeSet<Var> = assumptions
        .vars()
        .into_iter()
        .filter(|v| !input_vars.contains(v))
        .collect();
    if !stray.is_empty() {
        return Err(ContractError::Scope(format!(
            "assumptions reference non-input variables: {}",
            join_vars(&stray)
        )));
    }

    let stray: BTreeSet<Var> = guarantees
        .vars()
        .into_iter()
        .filter(|v| !input_vars.contains(v) && !output_vars.contains(v))
        .collect();
    if !stray.is_empty() {
        return Err(ContractError::Scope(format!(
            "guarantees reference variables that are neither inputs nor outputs: {}",
            join_vars(&stray)
        )));
    }
    Ok(())
}

/// Turn a failed refining elimination into the caller's error kind.
fn elimination_error(err: pactum_core::Error, wrap: fn(String) -> ContractError) -> ContractError {
    match err {
        pactum_core::Error::EliminationFailed(message) => wrap(message),
        other => other.into(),
    }
}

impl IoContract {
    /// Build a contract, checking that assumptions only mention inputs and
    /// guarantees only mention ports.
    pub fn new(
        input_vars: impl IntoIterator<Item = impl Into<Var>>,
        output_vars: impl IntoIterator<Item = impl Into<Var>>,
        assumptions: TermList,
        guarantees: TermList,
    ) -> ContractResult<Self> {
        let input_vars = port_set(input_vars, "input")?;
        let output_vars = port_set(output_vars, "output")?;
        check_scope(&input_vars, &output_vars, &assumptions, &guarantees)?;
        Ok(IoContract {
            input_vars,
            output_vars,
            assumptions,
            guarantees,
        })
    }

    /// Build a contract from terms in canonical text form.
    pub fn from_strings(
        input_vars: &[&str],
        output_vars: &[&str],
        assumptions: &[&str],
        guarantees: &[&str],
    ) -> ContractResult<Self> {
        Self::new(
            input_vars.iter().copied(),
            output_vars.iter().copied(),
            TermList::from_strings(assumptions)?,
            TermList::from_strings(guarantees)?,
        )
    }

    pub(crate) fn from_parts(
        input_vars: BTreeSet<Var>,
        output_vars: BTreeSet<Var>,
        assumptions: TermList,
        guarantees: TermList,
    ) -> ContractResult<Self> {
        check_scope(&input_vars, &output_vars, &assumptions, &guarantees)?;
        Ok(IoContract {
            input_vars,
            output_vars,
            assumptions,
            guarantees,
        })
    }

    pub fn input_vars(&self) -> &BTreeSet<Var> {
        &self.input_vars
    }

    pub fn output_vars(&self) -> &BTreeSet<Var> {
        &self.output_vars
    }

    pub fn assumptions(&self) -> &TermList {
        &self.assumptions
    }

    pub fn guarantees(&self) -> &TermList {
        &self.guarantees
    }

    /// All ports
    pub fn vars(&self) -> BTreeSet<Var> {
        self.input_vars.union(&self.output_vars).cloned().collect()
    }

    /// Outputs do not collide.
    pub fn can_compose_with(&self, other: &IoContract) -> bool {
        self.output_vars.is_disjoint(&other.output_vars)
    }

    /// System outputs not produced by `other` are not consumed by it.
    pub fn can_quotient_by(&self, other: &IoContract) -> bool {
        self.output_vars
            .difference(&other.output_vars)
            .all(|v| !other.input_vars.contains(v))
    }

    pub fn shares_io_with(&self, other: &IoContract) -> bool {
        self.input_vars == other.input_vars && self.output_vars == other.output_vars
    }

    /// Assumptions simplified, guarantees simplified in their context.
    pub fn simplified(&self, oracle: &dyn LpOracle) -> ContractResult<IoContract> {
        let assumptions = self.assumptions.simplify(None, oracle)?;
        let guarantees = self.guarantees.simplify(Some(&assumptions), oracle)?;
        Ok(IoContract {
            assumptions,
            guarantees,
            ..self.clone()
        })
    }

    /// Composition, hiding shared ports not listed in `vars_to_keep`.
    pub fn compose(
        &self,
        other: &IoContract,
        vars_to_keep: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<IoContract> {
        self.compose_traced(other, vars_to_keep, oracle)
            .map(|(contract, _)| contract)
    }

    pub fn compose_traced(
        &self,
        other: &IoContract,
        vars_to_keep: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<(IoContract, EliminationTrace)> {
        let keep: BTreeSet<Var> = vars_to_keep.iter().cloned().collect();
        let all_outputs: BTreeSet<Var> = self.output_vars.union(&other.output_vars).cloned().collect();
        let not_outputs: Vec<&Var> = keep.difference(&all_outputs).collect();
        if !not_outputs.is_empty() {
            return Err(ContractError::IncompatibleArgs(format!(
                "asked to keep variables that are not outputs: {}",
                join_vars(not_outputs)
            )));
        }
        if !self.can_compose_with(other) {
            return Err(ContractError::IncompatibleArgs(format!(
                "contracts share outputs: {}",
                join_vars(self.output_vars.intersection(&other.output_vars))
            )));
        }

        debug!(
            self_inputs = self.input_vars.len(),
            other_inputs = other.input_vars.len(),
            "composing contracts"
        );

        let self_feeds: BTreeSet<Var> = self.output_vars.intersection(&other.input_vars).cloned().collect();
        let other_feeds: BTreeSet<Var> = other.output_vars.intersection(&self.input_vars).cloned().collect();
        let mut internal: BTreeSet<Var> = self_feeds.union(&other_feeds).cloned().collect();

        let input_vars: BTreeSet<Var> = self
            .input_vars
            .union(&other.input_vars)
            .filter(|v| !internal.contains(*v))
            .cloned()
            .collect();
        let mut output_vars: BTreeSet<Var> = all_outputs
            .iter()
            .filter(|v| !internal.contains(*v))
            .cloned()
            .collect();
        internal.retain(|v| !keep.contains(v));
        output_vars.extend(keep.iter().cloned());

        let self_helps_other = !self_feeds.is_empty();
        let other_helps_self = !other_feeds.is_empty();
        let cycle = self_helps_other && other_helps_self;
        let other_drives_constrained = other
            .output_vars
            .iter()
            .any(|v| self.assumptions.contains_var(v.name()));
        let self_drives_constrained = self
            .output_vars
            .iter()
            .any(|v| other.assumptions.contains_var(v.name()));

        let forbidden: BTreeSet<Var> = internal.union(&output_vars).cloned().collect();
        let mut composition_trace = EliminationTrace::new();

        let assumptions = if cycle && (other_drives_constrained || self_drives_constrained) {
            return Err(ContractError::IncompatibleArgs(
                "cannot compose contracts due to feedback".to_string(),
            ));
        } else if self_helps_other && !other_helps_self {
            debug!("assumptions: self provides context for other");
            let context = self.assumptions.conjoin(&self.guarantees);
            let (refined, steps) = other
                .assumptions
                .eliminate_vars_refining_traced(&context, forbidden.iter().cloned(), oracle)
                .map_err(|err| elimination_error(err, ContractError::IncompatibleArgs))?;
            composition_trace.extend(steps);
            refined.conjoin(&self.assumptions)
        } else if other_helps_self && !self_helps_other {
            debug!("assumptions: other provides context for self");
            let context = other.assumptions.conjoin(&other.guarantees);
            let (refined, steps) = self
                .assumptions
                .eliminate_vars_refining_traced(&context, forbidden.iter().cloned(), oracle)
                .map_err(|err| elimination_error(err, ContractError::IncompatibleArgs))?;
            composition_trace.extend(steps);
            refined.conjoin(&other.assumptions)
        } else {
            self.assumptions.conjoin(&other.assumptions)
        };

        let leftover: BTreeSet<Var> = assumptions
            .vars()
            .into_iter()
            .filter(|v| forbidden.contains(v))
            .collect();
        if !leftover.is_empty() {
            return Err(ContractError::IncompatibleArgs(format!(
                "could not eliminate {} from the composed assumptions",
                join_vars(&leftover)
            )));
        }
        let assumptions = assumptions.simplify(None, oracle)?;

        let (guarantees, steps) = self
            .guarantees
            .conjoin(&other.guarantees)
            .eliminate_vars_traced(internal.iter().cloned(), oracle)?;
        composition_trace.extend(steps);
        let guarantees = guarantees.simplify(Some(&assumptions), oracle)?;

        debug!(
            assumptions = assumptions.len(),
            guarantees = guarantees.len(),
            hidden = internal.len(),
            "composed contracts"
        );

        let composed = IoContract::from_parts(input_vars, output_vars, assumptions, guarantees)?;
        Ok((composed, composition_trace))
    }

    /// The weakest contract which, composed with `other`, refines `self`.
    ///
    /// `additional_inputs` lists top-level inputs or outputs of `other`
    /// that the quotient may additionally read.
    pub fn quotient(
        &self,
        other: &IoContract,
        additional_inputs: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<IoContract> {
        self.quotient_traced(other, additional_inputs, oracle)
            .map(|(contract, _)| contract)
    }

    pub fn quotient_traced(
        &self,
        other: &IoContract,
        additional_inputs: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<(IoContract, EliminationTrace)> {
        if !self.can_quotient_by(other) {
            return Err(ContractError::IncompatibleArgs(
                "contracts cannot be quotiented due to incompatible IO".to_string(),
            ));
        }
        let additional: BTreeSet<Var> = additional_inputs.iter().cloned().collect();
        let unknown: Vec<&Var> = additional
            .iter()
            .filter(|v| !other.output_vars.contains(*v) && !self.input_vars.contains(*v))
            .collect();
        if !unknown.is_empty() {
            return Err(ContractError::IncompatibleArgs(format!(
                "additional inputs are neither top-level inputs nor outputs of the divisor: {}",
                join_vars(unknown)
            )));
        }

        let output_vars: BTreeSet<Var> = self
            .output_vars
            .difference(&other.output_vars)
            .chain(other.input_vars.difference(&self.input_vars))
            .cloned()
            .collect();
        let input_vars: BTreeSet<Var> = self
            .input_vars
            .iter()
            .chain(other.output_vars.difference(&self.output_vars))
            .chain(additional.iter())
            .cloned()
            .collect();
        let internal: BTreeSet<Var> = self
            .output_vars
            .intersection(&other.output_vars)
            .filter(|v| !additional.contains(*v))
            .cloned()
            .collect();

        debug!(
            inputs = input_vars.len(),
            outputs = output_vars.len(),
            hidden = internal.len(),
            "computing quotient"
        );
        let mut quotient_trace = EliminationTrace::new();

        let mut assumptions = self.assumptions.clone();
        if self.assumptions.refines(&other.assumptions, oracle)? {
            debug!("extending top-level assumptions with divisor guarantees");
            assumptions = assumptions.conjoin(&other.guarantees);
        }
        let (assumptions, steps) = assumptions
            .eliminate_vars_traced(internal.union(&output_vars).cloned(), oracle)?;
        quotient_trace.extend(steps);
        let assumptions = assumptions.simplify(None, oracle)?;

        let divisor_context = other.guarantees.conjoin(&other.assumptions);
        let guarantees = match self
            .guarantees
            .eliminate_vars_refining_traced(&divisor_context, internal.iter().cloned(), oracle)
        {
            Ok((refined, steps)) => {
                quotient_trace.extend(steps);
                refined
            }
            Err(pactum_core::Error::EliminationFailed(message)) => {
                debug!(%message, "divisor guarantees do not help, keeping system guarantees");
                self.guarantees.clone()
            }
            Err(err) => return Err(err.into()),
        };
        let guarantees = guarantees.conjoin(&other.assumptions);
        let guarantees = match guarantees.eliminate_vars_refining_traced(
            &self.assumptions,
            internal.iter().cloned(),
            oracle,
        ) {
            Ok((refined, steps)) => {
                quotient_trace.extend(steps);
                refined
            }
            Err(pactum_core::Error::EliminationFailed(_)) => guarantees,
            Err(err) => return Err(err.into()),
        };

        let leftover: BTreeSet<Var> = guarantees
            .vars()
            .into_iter()
            .filter(|v| internal.contains(v))
            .collect();
        if !leftover.is_empty() {
            return Err(ContractError::InfeasibleQuotient(format!(
                "could not eliminate {} from the quotient guarantees {}",
                join_vars(&leftover),
                guarantees.terms_with_vars(&leftover)
            )));
        }
        let guarantees = guarantees.simplify(Some(&assumptions), oracle)?;

        let quotient = IoContract::from_parts(input_vars, output_vars, assumptions, guarantees)?;
        Ok((quotient, quotient_trace))
    }

    /// Conjunction of two specifications of one component.
    pub fn merge(&self, other: &IoContract, oracle: &dyn LpOracle) -> ContractResult<IoContract> {
        let input_vars: BTreeSet<Var> = self.input_vars.union(&other.input_vars).cloned().collect();
        let output_vars: BTreeSet<Var> = self.output_vars.union(&other.output_vars).cloned().collect();
        if !input_vars.is_disjoint(&output_vars) {
            return Err(ContractError::IncompatibleArgs(format!(
                "merged contracts disagree on the role of {}",
                join_vars(input_vars.intersection(&output_vars))
            )));
        }

        let assumptions = self.assumptions.conjoin(&other.assumptions);
        let guarantees = self.guarantees.conjoin(&other.guarantees);
        if !assumptions.conjoin(&guarantees).is_feasible(oracle)? {
            return Err(ContractError::InconsistentMerge(
                "contracts cannot be merged: guarantees are inconsistent".to_string(),
            ));
        }
        IoContract::from_parts(input_vars, output_vars, assumptions, guarantees)
    }

    /// `self` can replace `other` in any context.
    pub fn refines(&self, other: &IoContract, oracle: &dyn LpOracle) -> ContractResult<bool> {
        if !self.shares_io_with(other) {
            return Err(ContractError::IncompatibleArgs(
                "contracts do not share IO".to_string(),
            ));
        }
        if !other.assumptions.refines(&self.assumptions, oracle)? {
            return Ok(false);
        }
        let constrained_self = self.guarantees.conjoin(&other.assumptions);
        let constrained_other = other.guarantees.conjoin(&other.assumptions);
        Ok(constrained_self.refines(&constrained_other, oracle)?)
    }

    /// Mutual refinement: same environments, same promises in them.
    pub fn is_equivalent(&self, other: &IoContract, oracle: &dyn LpOracle) -> ContractResult<bool> {
        Ok(self.refines(other, oracle)? && other.refines(self, oracle)?)
    }

    /// Optimize over the behaviors allowed by assumptions and guarantees.
    pub fn optimize(
        &self,
        objective: &Coefficients,
        sense: Sense,
        oracle: &dyn LpOracle,
    ) -> ContractResult<Optimum> {
        Ok(self
            .assumptions
            .conjoin(&self.guarantees)
            .optimize(objective, sense, oracle)?)
    }

    pub fn get_variable_bounds(&self, var: &str, oracle: &dyn LpOracle) -> ContractResult<Option<Bounds>> {
        Ok(self
            .assumptions
            .conjoin(&self.guarantees)
            .get_variable_bounds(var, oracle)?)
    }

    /// Every behavior of `component` is an admissible environment.
    pub fn contains_environment(&self, component: &TermList, oracle: &dyn LpOracle) -> ContractResult<bool> {
        Ok(component.refines(&self.assumptions, oracle)?)
    }

    /// `component` keeps the guarantees whenever the assumptions hold.
    pub fn contains_implementation(
        &self,
        component: &TermList,
        oracle: &dyn LpOracle,
    ) -> ContractResult<bool> {
        let constrained = component.conjoin(&self.assumptions);
        let promised = self.guarantees.conjoin(&self.assumptions);
        Ok(constrained.refines(&promised, oracle)?)
    }

    /// Membership of `point` in the assumption and guarantee regions.
    pub fn contains_behavior(&self, point: &Point) -> ContractResult<Membership> {
        Ok(Membership {
            in_assumptions: self.assumptions.contains_behavior(point)?,
            in_guarantees: self.guarantees.contains_behavior(point)?,
        })
    }

    /// Rename a port.
    ///
    /// Fails if the new name is already used with the opposite role.
    /// Renaming a variable that is not a port leaves the contract unchanged.
    pub fn rename_variable(&self, source: &Var, target: &Var) -> ContractResult<IoContract> {
        if source == target {
            return Ok(self.clone());
        }
        let (mut input_vars, mut output_vars) = (self.input_vars.clone(), self.output_vars.clone());
        if input_vars.contains(source) {
            if output_vars.contains(target) {
                return Err(ContractError::IncompatibleArgs(format!(
                    "renaming would make {} both an input and an output",
                    target
                )));
            }
            input_vars.remove(source);
            input_vars.insert(target.clone());
        } else if output_vars.contains(source) {
            if input_vars.contains(target) {
                return Err(ContractError::IncompatibleArgs(format!(
                    "renaming would make {} both an input and an output",
                    target
                )));
            }
            output_vars.remove(source);
            output_vars.insert(target.clone());
        } else {
            return Ok(self.clone());
        }
        IoContract::from_parts(
            input_vars,
            output_vars,
            self.assumptions.rename_variable(source, target),
            self.guarantees.rename_variable(source, target),
        )
    }

    pub fn rename_variables(&self, mappings: &[(Var, Var)]) -> ContractResult<IoContract> {
        mappings
            .iter()
            .try_fold(self.clone(), |contract, (source, target)| {
                contract.rename_variable(source, target)
            })
    }
}

impl fmt::Display for IoContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "InVars: [{}]", join_vars(&self.input_vars))?;
        writeln!(f, "OutVars: [{}]", join_vars(&self.output_vars))?;
        writeln!(f, "A: {}", self.assumptions)?;
        write!(f, "G: {}", self.guarantees)
    }
}

#[cfg(test)]
#[path = "iocontract_tests.rs"]
mod tests;
