//! Contracts over finite unions of convex regions

use crate::contract::Membership;
use crate::errors::{ContractError, ContractResult};
use crate::iocontract::{check_scope, join_vars, port_set, IoContract};
use pactum_core::{LpOracle, Point, TermList, Var};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, trace};

/// A contract whose assumptions and guarantees are unions of polyhedra
///
/// Each disjunct is a [`TermList`]. An empty list of disjuncts is read as
/// the unconstrained region and stored as a single empty term list.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundIoContract {
    input_vars: BTreeSet<Var>,
    output_vars: BTreeSet<Var>,
    assumptions: Vec<TermList>,
    guarantees: Vec<TermList>,
}

fn normalize_disjuncts(disjuncts: Vec<TermList>) -> Vec<TermList> {
    let mut unique: Vec<TermList> = Vec::with_capacity(disjuncts.len());
    for disjunct in disjuncts {
        if !unique.contains(&disjunct) {
            unique.push(disjunct);
        }
    }
    if unique.is_empty() {
        unique.push(TermList::empty());
    }
    unique
}

impl CompoundIoContract {
    pub fn new(
        input_vars: impl IntoIterator<Item = impl Into<Var>>,
        output_vars: impl IntoIterator<Item = impl Into<Var>>,
        assumptions: Vec<TermList>,
        guarantees: Vec<TermList>,
    ) -> ContractResult<Self> {
        let input_vars = port_set(input_vars, "input")?;
        let output_vars = port_set(output_vars, "output")?;
        Self::from_parts(input_vars, output_vars, assumptions, guarantees)
    }

    /// Build from one list of canonical term strings per disjunct.
    pub fn from_strings(
        input_vars: &[&str],
        output_vars: &[&str],
        assumptions: &[&[&str]],
        guarantees: &[&[&str]],
    ) -> ContractResult<Self> {
        let parse = |disjuncts: &[&[&str]]| -> ContractResult<Vec<TermList>> {
            disjuncts
                .iter()
                .map(|items| TermList::from_strings(*items).map_err(ContractError::from))
                .collect()
        };
        Self::new(
            input_vars.iter().copied(),
            output_vars.iter().copied(),
            parse(assumptions)?,
            parse(guarantees)?,
        )
    }

    pub(crate) fn from_parts(
        input_vars: BTreeSet<Var>,
        output_vars: BTreeSet<Var>,
        assumptions: Vec<TermList>,
        guarantees: Vec<TermList>,
    ) -> ContractResult<Self> {
        let assumptions = normalize_disjuncts(assumptions);
        let guarantees = normalize_disjuncts(guarantees);
        for a in &assumptions {
            check_scope(&input_vars, &output_vars, a, &TermList::empty())?;
        }
        for g in &guarantees {
            check_scope(&input_vars, &output_vars, &TermList::empty(), g)?;
        }
        Ok(CompoundIoContract {
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

    pub fn assumptions(&self) -> &[TermList] {
        &self.assumptions
    }

    pub fn guarantees(&self) -> &[TermList] {
        &self.guarantees
    }

    pub fn shares_io_with(&self, other: &CompoundIoContract) -> bool {
        self.input_vars == other.input_vars && self.output_vars == other.output_vars
    }

    /// True when the contract is a single polyhedron on both sides.
    pub fn is_convex(&self) -> bool {
        self.assumptions.len() == 1 && self.guarantees.len() == 1
    }

    /// One single-polyhedron contract per assumption/guarantee pairing.
    pub fn disjuncts(&self) -> ContractResult<Vec<IoContract>> {
        let mut pieces = Vec::with_capacity(self.assumptions.len() * self.guarantees.len());
        for a in &self.assumptions {
            for g in &self.guarantees {
                pieces.push(IoContract::from_parts(
                    self.input_vars.clone(),
                    self.output_vars.clone(),
                    a.clone(),
                    g.clone(),
                )?);
            }
        }
        Ok(pieces)
    }

    /// Check that assumption disjuncts do not intersect.
    pub fn validate_disjoint_assumptions(&self, oracle: &dyn LpOracle) -> ContractResult<()> {
        for (i, left) in self.assumptions.iter().enumerate() {
            for right in &self.assumptions[i + 1..] {
                if left.conjoin(right).is_feasible(oracle)? {
                    return Err(ContractError::IncompatibleArgs(format!(
                        "assumption disjuncts {} and {} intersect",
                        left, right
                    )));
                }
            }
        }
        Ok(())
    }

    /// Membership in the union of assumption disjuncts and in the union of
    /// guarantee disjuncts.
    pub fn contains_behavior(&self, point: &Point) -> ContractResult<Membership> {
        let mut in_assumptions = false;
        for a in &self.assumptions {
            if a.contains_behavior(point)? {
                in_assumptions = true;
                break;
            }
        }
        let mut in_guarantees = false;
        for g in &self.guarantees {
            if g.contains_behavior(point)? {
                in_guarantees = true;
                break;
            }
        }
        Ok(Membership {
            in_assumptions,
            in_guarantees,
        })
    }

    /// Pairwise conjunction of disjuncts, keeping the feasible pairs.
    ///
    /// A merged guarantee disjunct is kept only if it is feasible under some
    /// merged assumption disjunct. Fails with `InconsistentMerge` when no
    /// assumption pairing, or no guarantee pairing under the assumptions,
    /// is feasible.
    pub fn merge(
        &self,
        other: &CompoundIoContract,
        oracle: &dyn LpOracle,
    ) -> ContractResult<CompoundIoContract> {
        let input_vars: BTreeSet<Var> = self.input_vars.union(&other.input_vars).cloned().collect();
        let output_vars: BTreeSet<Var> = self.output_vars.union(&other.output_vars).cloned().collect();
        if !input_vars.is_disjoint(&output_vars) {
            return Err(ContractError::IncompatibleArgs(format!(
                "merged contracts disagree on the role of {}",
                join_vars(input_vars.intersection(&output_vars))
            )));
        }

        let assumptions = intersect_feasible(&self.assumptions, &other.assumptions, oracle)?;
        if assumptions.is_empty() {
            return Err(ContractError::InconsistentMerge(
                "contracts cannot be merged: assumptions are inconsistent".to_string(),
            ));
        }
        let mut guarantees = Vec::new();
        for candidate in intersect_feasible(&self.guarantees, &other.guarantees, oracle)? {
            if feasible_under_any(&candidate, &assumptions, oracle)? {
                guarantees.push(candidate);
            } else {
                trace!(guarantee = %candidate, "dropping guarantee infeasible under every assumption");
            }
        }
        if guarantees.is_empty() {
            return Err(ContractError::InconsistentMerge(
                "contracts cannot be merged: guarantees are inconsistent".to_string(),
            ));
        }

        debug!(
            assumptions = assumptions.len(),
            guarantees = guarantees.len(),
            "merged compound contracts"
        );
        Self::from_parts(input_vars, output_vars, assumptions, guarantees)
    }

    /// Disjunct-by-disjunct composition, unioning the results.
    ///
    /// Pairings that cannot be composed are skipped; the first error is
    /// returned if none can. Oracle failures abort immediately.
    pub fn compose(
        &self,
        other: &CompoundIoContract,
        vars_to_keep: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<CompoundIoContract> {
        let mut composed: Vec<IoContract> = Vec::new();
        let mut first_error = None;
        for left in self.disjuncts()? {
            for right in other.disjuncts()? {
                match left.compose(&right, vars_to_keep, oracle) {
                    Ok(contract) => composed.push(contract),
                    Err(err) if err.is_oracle_failure() => return Err(err),
                    Err(err) => {
                        trace!(error = %err, "skipping disjunct pairing");
                        first_error.get_or_insert(err);
                    }
                }
            }
        }

        let Some(head) = composed.first() else {
            return Err(first_error.unwrap_or_else(|| {
                ContractError::IncompatibleArgs("no disjuncts to compose".to_string())
            }));
        };
        let input_vars = head.input_vars().clone();
        let output_vars = head.output_vars().clone();
        let assumptions = composed.iter().map(|c| c.assumptions().clone()).collect();
        let guarantees = composed.iter().map(|c| c.guarantees().clone()).collect();
        Self::from_parts(input_vars, output_vars, assumptions, guarantees)
    }

    /// Sufficient refinement check over disjuncts.
    ///
    /// Every assumption disjunct of `other` must lie inside one of ours, and
    /// under each of `other`'s assumption disjuncts every guarantee disjunct
    /// of ours must lie inside one of `other`'s.
    pub fn refines(&self, other: &CompoundIoContract, oracle: &dyn LpOracle) -> ContractResult<bool> {
        if !self.shares_io_with(other) {
            return Err(ContractError::IncompatibleArgs(
                "contracts do not share IO".to_string(),
            ));
        }

        for theirs in &other.assumptions {
            if !covered_by_any(theirs, &self.assumptions, oracle)? {
                return Ok(false);
            }
        }

        for context in &other.assumptions {
            let promised: Vec<TermList> = other.guarantees.iter().map(|g| g.conjoin(context)).collect();
            for ours in &self.guarantees {
                let constrained = ours.conjoin(context);
                if !constrained.is_feasible(oracle)? {
                    continue;
                }
                if !covered_by_any(&constrained, &promised, oracle)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub fn quotient(
        &self,
        _other: &CompoundIoContract,
        _additional_inputs: &[Var],
        _oracle: &dyn LpOracle,
    ) -> ContractResult<CompoundIoContract> {
        Err(ContractError::Unsupported(
            "quotient of compound contracts".to_string(),
        ))
    }
}

fn intersect_feasible(
    left: &[TermList],
    right: &[TermList],
    oracle: &dyn LpOracle,
) -> ContractResult<Vec<TermList>> {
    let mut result = Vec::new();
    for l in left {
        for r in right {
            let both = l.conjoin(r);
            if both.is_feasible(oracle)? {
                result.push(both);
            }
        }
    }
    Ok(result)
}

fn feasible_under_any(
    region: &TermList,
    contexts: &[TermList],
    oracle: &dyn LpOracle,
) -> ContractResult<bool> {
    for context in contexts {
        if region.conjoin(context).is_feasible(oracle)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn covered_by_any(region: &TermList, candidates: &[TermList], oracle: &dyn LpOracle) -> ContractResult<bool> {
    for candidate in candidates {
        if region.refines(candidate, oracle)? {
            return Ok(true);
        }
    }
    Ok(false)
}

impl From<IoContract> for CompoundIoContract {
    fn from(contract: IoContract) -> Self {
        CompoundIoContract {
            input_vars: contract.input_vars().clone(),
            output_vars: contract.output_vars().clone(),
            assumptions: vec![contract.assumptions().clone()],
            guarantees: vec![contract.guarantees().clone()],
        }
    }
}

fn write_disjuncts(f: &mut fmt::Formatter<'_>, disjuncts: &[TermList]) -> fmt::Result {
    for (i, disjunct) in disjuncts.iter().enumerate() {
        if i > 0 {
            f.write_str("\nor\n")?;
        }
        write!(f, "{}", disjunct)?;
    }
    Ok(())
}

impl fmt::Display for CompoundIoContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "InVars: [{}]", join_vars(&self.input_vars))?;
        writeln!(f, "OutVars: [{}]", join_vars(&self.output_vars))?;
        f.write_str("A: ")?;
        write_disjuncts(f, &self.assumptions)?;
        f.write_str("\nG: ")?;
        write_disjuncts(f, &self.guarantees)
    }
}
