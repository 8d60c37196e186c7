//! Conjunctions of linear terms
//!
//! A [`TermList`] is a convex polyhedron described as the conjunction of its
//! terms. The empty list is the whole space; an infeasible list is a valid
//! value, detected with [`TermList::is_feasible`].
//!
//! # Elimination
//!
//! Two kernels remove variables from a list:
//!
//! - [`TermList::eliminate_vars`] computes the exact existential projection.
//!   Equalities are used to substitute a variable away when one is
//!   available; otherwise bounds are combined pairwise (Fourier–Motzkin).
//!   Variables go one at a time, cheapest first, and the list is simplified
//!   after every step to keep the term count under control.
//! - [`TermList::eliminate_vars_refining`] rewrites each term into a term
//!   free of the given variables that, conjoined with a context list,
//!   implies the original. The multipliers come from a small dual LP.
//!
//! Both go through [`TermArena`], a flat slot array indexed by variable so
//! the terms touching a variable are found without rescanning the list.

use crate::error::{Error, Result};
use crate::lp::{LpOracle, LpOutcome, Sense, DEFAULT_TOLERANCE};
use crate::term::{Coefficients, Point, Relation, Term};
use crate::trace::{EliminationMethod, EliminationStep, EliminationTrace};
use crate::var::Var;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, trace};

/// Outcome of optimizing a linear objective over a term list
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Optimum {
    Optimal(f64),
    Unbounded,
    Infeasible,
}

impl Optimum {
    pub fn value(&self) -> Option<f64> {
        match self {
            Optimum::Optimal(value) => Some(*value),
            _ => None,
        }
    }
}

/// Range of a variable over a feasible region; unbounded sides are infinite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

/// A conjunction of terms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Term>", into = "Vec<Term>")]
pub struct TermList {
    terms: Vec<Term>,
}

impl TermList {
    /// Build a list, dropping duplicates and constant terms that always hold.
    pub fn new(terms: impl IntoIterator<Item = Term>) -> Self {
        let mut list = TermList::default();
        for term in terms {
            list.push(term);
        }
        list
    }

    /// The unconstrained region
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse one term per string in canonical form.
    pub fn from_strings<S: AsRef<str>>(items: &[S]) -> Result<Self> {
        items
            .iter()
            .map(|item| item.as_ref().parse::<Term>())
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    fn push(&mut self, term: Term) {
        if term.is_tautology(DEFAULT_TOLERANCE) || self.terms.contains(&term) {
            return;
        }
        self.terms.push(term);
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Every variable referenced by some term
    pub fn vars(&self) -> BTreeSet<Var> {
        self.terms.iter().flat_map(|t| t.vars().cloned()).collect()
    }

    pub fn contains_var(&self, var: &str) -> bool {
        self.terms.iter().any(|t| t.contains_var(var))
    }

    /// Conjunction of both lists
    pub fn conjoin(&self, other: &TermList) -> TermList {
        let mut result = self.clone();
        for term in &other.terms {
            result.push(term.clone());
        }
        result
    }

    /// Terms mentioning at least one of `vars`
    pub fn terms_with_vars(&self, vars: &BTreeSet<Var>) -> TermList {
        TermList {
            terms: self
                .terms
                .iter()
                .filter(|t| t.contains_any(vars))
                .cloned()
                .collect(),
        }
    }

    /// Terms mentioning none of `vars`
    pub fn terms_without_vars(&self, vars: &BTreeSet<Var>) -> TermList {
        TermList {
            terms: self
                .terms
                .iter()
                .filter(|t| !t.contains_any(vars))
                .cloned()
                .collect(),
        }
    }

    pub fn rename_variable(&self, source: &Var, target: &Var) -> TermList {
        TermList::new(self.terms.iter().map(|t| t.rename_variable(source, target)))
    }

    /// Whether `point` satisfies every term.
    ///
    /// Fails with `MissingAssignment` if a referenced variable has no value.
    pub fn contains_behavior(&self, point: &Point) -> Result<bool> {
        let mut holds = true;
        for term in &self.terms {
            holds &= term.evaluate(point)?;
        }
        Ok(holds)
    }

    pub fn is_feasible(&self, oracle: &dyn LpOracle) -> Result<bool> {
        Ok(oracle.solve(self, None, Sense::Minimize)? != LpOutcome::Infeasible)
    }

    /// Optimize a linear objective over the region.
    pub fn optimize(
        &self,
        objective: &Coefficients,
        sense: Sense,
        oracle: &dyn LpOracle,
    ) -> Result<Optimum> {
        Ok(match oracle.solve(self, Some(objective), sense)? {
            LpOutcome::Optimal { value, .. } => Optimum::Optimal(value),
            LpOutcome::Unbounded => Optimum::Unbounded,
            LpOutcome::Infeasible => Optimum::Infeasible,
        })
    }

    /// Minimum and maximum of `var`, or `None` if the region is empty.
    pub fn get_variable_bounds(&self, var: &str, oracle: &dyn LpOracle) -> Result<Option<Bounds>> {
        let objective: Coefficients = [(Var::from(var), 1.0)].into_iter().collect();
        let lower = match self.optimize(&objective, Sense::Minimize, oracle)? {
            Optimum::Optimal(value) => value,
            Optimum::Unbounded => f64::NEG_INFINITY,
            Optimum::Infeasible => return Ok(None),
        };
        let upper = match self.optimize(&objective, Sense::Maximize, oracle)? {
            Optimum::Optimal(value) => value,
            Optimum::Unbounded => f64::INFINITY,
            Optimum::Infeasible => return Ok(None),
        };
        Ok(Some(Bounds { lower, upper }))
    }

    /// Whether every point of this region satisfies `term`.
    pub fn implies(&self, term: &Term, oracle: &dyn LpOracle) -> Result<bool> {
        let tolerance = oracle.tolerance();
        if term.is_constant() {
            return Ok(term.is_tautology(tolerance) || !self.is_feasible(oracle)?);
        }

        let slack = tolerance * (1.0 + term.constant().abs());
        let upper_holds = match self.optimize(term.coefficients(), Sense::Maximize, oracle)? {
            Optimum::Optimal(value) => value <= term.constant() + slack,
            Optimum::Unbounded => false,
            Optimum::Infeasible => return Ok(true),
        };
        if !upper_holds || term.relation() == Relation::Le {
            return Ok(upper_holds);
        }
        Ok(match self.optimize(term.coefficients(), Sense::Minimize, oracle)? {
            Optimum::Optimal(value) => value >= term.constant() - slack,
            Optimum::Unbounded => false,
            Optimum::Infeasible => true,
        })
    }

    /// Drop terms implied by the remaining terms together with `context`.
    ///
    /// The region is unchanged. Context terms are never removed and an
    /// infeasible list is returned as is.
    pub fn simplify(&self, context: Option<&TermList>, oracle: &dyn LpOracle) -> Result<TermList> {
        let empty = TermList::empty();
        let context = context.unwrap_or(&empty);
        if !self.conjoin(context).is_feasible(oracle)? {
            debug!(terms = self.len(), "skipping simplification of infeasible list");
            return Ok(self.clone());
        }

        let mut kept = self.terms.clone();
        let mut index = kept.len();
        while index > 0 {
            index -= 1;
            let candidate = kept.remove(index);
            let rest = TermList {
                terms: kept.clone(),
            }
            .conjoin(context);
            if rest.implies(&candidate, oracle)? {
                trace!(term = %candidate, "dropping redundant term");
            } else {
                kept.insert(index, candidate);
            }
        }
        Ok(TermList { terms: kept })
    }

    /// Containment: every point of `self` lies in `other`.
    pub fn refines(&self, other: &TermList, oracle: &dyn LpOracle) -> Result<bool> {
        if !self.is_feasible(oracle)? {
            return Ok(true);
        }
        for term in &other.terms {
            if !self.implies(term, oracle)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Both lists describe the same region.
    pub fn is_equivalent(&self, other: &TermList, oracle: &dyn LpOracle) -> Result<bool> {
        Ok(self.refines(other, oracle)? && other.refines(self, oracle)?)
    }

    /// Existentially project away `vars`.
    pub fn eliminate_vars<I>(&self, vars: I, oracle: &dyn LpOracle) -> Result<TermList>
    where
        I: IntoIterator,
        I::Item: Into<Var>,
    {
        self.eliminate_vars_traced(vars, oracle).map(|(list, _)| list)
    }

    /// [`eliminate_vars`](Self::eliminate_vars) returning the steps taken.
    pub fn eliminate_vars_traced<I>(
        &self,
        vars: I,
        oracle: &dyn LpOracle,
    ) -> Result<(TermList, EliminationTrace)>
    where
        I: IntoIterator,
        I::Item: Into<Var>,
    {
        let mut pending: BTreeSet<Var> = vars.into_iter().map(Into::into).collect();
        let mut arena = TermArena::from_list(self);
        let mut elimination_trace = EliminationTrace::new();

        debug!(
            terms = self.len(),
            vars = pending.len(),
            "eliminating variables"
        );

        while let Some(var) = arena.cheapest(&pending) {
            pending.remove(&var);
            let touching = arena.take_touching(&var);
            if touching.is_empty() {
                continue;
            }
            let terms_before = arena.len() + touching.len();
            let method = arena.eliminate(&var, touching);

            let simplified = arena.to_list().simplify(None, oracle)?;
            arena = TermArena::from_list(&simplified);

            trace!(
                var = %var,
                ?method,
                terms_before,
                terms_after = arena.len(),
                "eliminated variable"
            );
            elimination_trace.record(EliminationStep {
                vars: vec![var],
                method,
                terms_before,
                terms_after: arena.len(),
            });
        }

        Ok((arena.to_list(), elimination_trace))
    }

    /// Rewrite the terms touching `vars` into terms free of them which,
    /// together with `context`, imply the originals.
    ///
    /// Terms are dropped when the rows of `context` over `vars` alone are
    /// infeasible. Fails with `EliminationFailed` when no rewriting exists.
    pub fn eliminate_vars_refining<I>(
        &self,
        context: &TermList,
        vars: I,
        oracle: &dyn LpOracle,
    ) -> Result<TermList>
    where
        I: IntoIterator,
        I::Item: Into<Var>,
    {
        self.eliminate_vars_refining_traced(context, vars, oracle)
            .map(|(list, _)| list)
    }

    pub fn eliminate_vars_refining_traced<I>(
        &self,
        context: &TermList,
        vars: I,
        oracle: &dyn LpOracle,
    ) -> Result<(TermList, EliminationTrace)>
    where
        I: IntoIterator,
        I::Item: Into<Var>,
    {
        let forbidden: BTreeSet<Var> = vars.into_iter().map(Into::into).collect();
        let rows: Vec<Term> = context.iter().flat_map(Term::split_equality).collect();
        let mut arena = TermArena::default();

        debug!(
            terms = self.len(),
            context = context.len(),
            vars = forbidden.len(),
            "eliminating variables by refinement"
        );

        for term in &self.terms {
            if !term.contains_any(&forbidden) {
                arena.insert(term.clone());
                continue;
            }
            for half in term.split_equality() {
                match refine_term(&half, &rows, &forbidden, oracle)? {
                    Some(rewritten) => {
                        trace!(from = %half, to = %rewritten, "refined term");
                        arena.insert(rewritten);
                    }
                    None => trace!(term = %half, "context infeasible, dropping term"),
                }
            }
        }

        let mut elimination_trace = EliminationTrace::new();
        let touched: Vec<Var> = forbidden
            .iter()
            .filter(|v| self.contains_var(v.name()))
            .cloned()
            .collect();
        if !touched.is_empty() {
            elimination_trace.record(EliminationStep {
                vars: touched,
                method: EliminationMethod::Refinement,
                terms_before: self.len(),
                terms_after: arena.len(),
            });
        }
        Ok((arena.to_list(), elimination_trace))
    }
}

/// Multipliers for the rows of a context
enum Multipliers {
    Found(Vec<f64>),
    Infeasible,
    Unbounded,
}

/// Find `λ >= 0` with `Σ λ_j·row_j` matching `term` on every forbidden
/// variable and return `term - Σ λ_j·row_j`.
///
/// Rows over forbidden variables only are tried first, so the rewritten
/// term introduces no new variables when that is possible.
fn refine_term(
    term: &Term,
    rows: &[Term],
    forbidden: &BTreeSet<Var>,
    oracle: &dyn LpOracle,
) -> Result<Option<Term>> {
    let local: Vec<Term> = rows
        .iter()
        .filter(|row| !row.is_constant() && row.vars().all(|v| forbidden.contains(v)))
        .cloned()
        .collect();

    match solve_multipliers(term, &local, forbidden, oracle)? {
        Multipliers::Found(lambda) => return Ok(Some(apply_multipliers(term, &local, &lambda, forbidden))),
        // the rows over forbidden variables contradict each other
        Multipliers::Unbounded => return Ok(None),
        Multipliers::Infeasible => {}
    }

    match solve_multipliers(term, rows, forbidden, oracle)? {
        Multipliers::Found(lambda) => Ok(Some(apply_multipliers(term, rows, &lambda, forbidden))),
        Multipliers::Infeasible => Err(Error::EliminationFailed(format!(
            "cannot remove {} from `{}` using the given context",
            forbidden
                .iter()
                .filter(|v| term.contains_var(v.name()))
                .map(Var::name)
                .collect::<Vec<_>>()
                .join(", "),
            term
        ))),
        Multipliers::Unbounded => match minimal_mass_multipliers(term, rows, forbidden, oracle)? {
            Some(lambda) => Ok(Some(apply_multipliers(term, rows, &lambda, forbidden))),
            None => Err(Error::EliminationFailed(format!(
                "no bounded multipliers for `{}`",
                term
            ))),
        },
    }
}

fn multiplier_var(index: usize) -> Var {
    Var::new(format!("lambda_{}", index))
}

/// Constraints `Σ λ_j·row_j[f] = term[f]` for each forbidden `f`, `λ >= 0`.
fn multiplier_constraints(term: &Term, rows: &[Term], forbidden: &BTreeSet<Var>) -> TermList {
    let mut constraints = Vec::new();
    for var in forbidden {
        let coefficients: Vec<(Var, f64)> = rows
            .iter()
            .enumerate()
            .map(|(j, row)| (multiplier_var(j), row.coefficient(var.name())))
            .collect();
        constraints.push(Term::from_parts(
            coefficients.into_iter().collect(),
            term.coefficient(var.name()),
            Relation::Eq,
        ));
    }
    for j in 0..rows.len() {
        constraints.push(Term::from_parts(
            [(multiplier_var(j), -1.0)].into_iter().collect(),
            0.0,
            Relation::Le,
        ));
    }
    TermList::new(constraints)
}

fn multipliers_from(solution: &Point, rows: usize) -> Vec<f64> {
    (0..rows)
        .map(|j| {
            solution
                .get(&multiplier_var(j))
                .copied()
                .unwrap_or(0.0)
                .max(0.0)
        })
        .collect()
}

/// Lexicographic choice: weakest resulting constant first, then the
/// smallest total multiplier.
fn solve_multipliers(
    term: &Term,
    rows: &[Term],
    forbidden: &BTreeSet<Var>,
    oracle: &dyn LpOracle,
) -> Result<Multipliers> {
    let constraints = multiplier_constraints(term, rows, forbidden);
    let shift: Coefficients = rows
        .iter()
        .enumerate()
        .map(|(j, row)| (multiplier_var(j), row.constant()))
        .collect();

    let best = match oracle.solve(&constraints, Some(&shift), Sense::Minimize)? {
        LpOutcome::Optimal { value, solution } => (value, solution),
        LpOutcome::Infeasible => return Ok(Multipliers::Infeasible),
        LpOutcome::Unbounded => return Ok(Multipliers::Unbounded),
    };
    let (value, first_solution) = best;

    let slack = oracle.tolerance() * (1.0 + value.abs());
    let capped = constraints.conjoin(&TermList::new([Term::from_parts(
        shift,
        value + slack,
        Relation::Le,
    )]));
    let mass: Coefficients = (0..rows.len()).map(|j| (multiplier_var(j), 1.0)).collect();
    let lambda = match oracle.solve(&capped, Some(&mass), Sense::Minimize)? {
        LpOutcome::Optimal { solution, .. } => multipliers_from(&solution, rows.len()),
        _ => multipliers_from(&first_solution, rows.len()),
    };
    Ok(Multipliers::Found(lambda))
}

fn minimal_mass_multipliers(
    term: &Term,
    rows: &[Term],
    forbidden: &BTreeSet<Var>,
    oracle: &dyn LpOracle,
) -> Result<Option<Vec<f64>>> {
    let constraints = multiplier_constraints(term, rows, forbidden);
    let mass: Coefficients = (0..rows.len()).map(|j| (multiplier_var(j), 1.0)).collect();
    Ok(match oracle.solve(&constraints, Some(&mass), Sense::Minimize)? {
        LpOutcome::Optimal { solution, .. } => Some(multipliers_from(&solution, rows.len())),
        _ => None,
    })
}

fn apply_multipliers(term: &Term, rows: &[Term], lambda: &[f64], forbidden: &BTreeSet<Var>) -> Term {
    let mut result = term.clone();
    for (row, &weight) in rows.iter().zip(lambda) {
        if weight > 0.0 {
            result = result.add_scaled(row, -weight);
        }
    }
    let mut coefficients = result.coefficients().clone();
    coefficients.retain(|v, _| !forbidden.contains(v));
    Term::from_parts(coefficients, result.constant(), Relation::Le).normalized()
}

/// Flat term storage indexed by variable
#[derive(Debug, Default)]
struct TermArena {
    slots: Vec<Option<Term>>,
    by_var: FxHashMap<Var, Vec<usize>>,
    live: usize,
}

impl TermArena {
    fn from_list(list: &TermList) -> Self {
        let mut arena = TermArena::default();
        for term in list.iter() {
            arena.insert(term.clone());
        }
        arena
    }

    fn len(&self) -> usize {
        self.live
    }

    fn live_touching(&self, var: &Var) -> impl Iterator<Item = (usize, &Term)> + '_ {
        self.by_var
            .get(var)
            .into_iter()
            .flatten()
            .filter_map(move |&i| self.slots[i].as_ref().map(|t| (i, t)))
    }

    fn insert(&mut self, term: Term) {
        if term.is_tautology(DEFAULT_TOLERANCE) {
            return;
        }
        let duplicate = match term.vars().next() {
            Some(first) => self
                .live_touching(first)
                .any(|(_, t)| t.approx_eq(&term, DEFAULT_TOLERANCE)),
            None => self
                .slots
                .iter()
                .flatten()
                .any(|t| t.approx_eq(&term, DEFAULT_TOLERANCE)),
        };
        if duplicate {
            return;
        }

        let index = self.slots.len();
        for var in term.vars() {
            self.by_var.entry(var.clone()).or_default().push(index);
        }
        self.slots.push(Some(term));
        self.live += 1;
    }

    /// Remove and return every live term mentioning `var`.
    fn take_touching(&mut self, var: &Var) -> Vec<Term> {
        let indices = self.by_var.remove(var).unwrap_or_default();
        let mut taken = Vec::with_capacity(indices.len());
        for index in indices {
            if let Some(term) = self.slots[index].take() {
                self.live -= 1;
                taken.push(term);
            }
        }
        taken
    }

    /// Next variable to eliminate: one with an equality, else the fewest
    /// generated combinations.
    fn cheapest(&self, pending: &BTreeSet<Var>) -> Option<Var> {
        pending
            .iter()
            .min_by_key(|var| {
                let mut upper = 0usize;
                let mut lower = 0usize;
                for (_, term) in self.live_touching(var) {
                    if term.is_equality() {
                        return 0;
                    }
                    if term.coefficient(var.name()) > 0.0 {
                        upper += 1;
                    } else {
                        lower += 1;
                    }
                }
                1 + upper * lower
            })
            .cloned()
    }

    /// Eliminate `var` from `touching` and insert the results.
    fn eliminate(&mut self, var: &Var, mut touching: Vec<Term>) -> EliminationMethod {
        let pivot = touching
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_equality())
            .max_by(|(_, a), (_, b)| {
                a.coefficient(var.name())
                    .abs()
                    .total_cmp(&b.coefficient(var.name()).abs())
            })
            .map(|(i, _)| i);

        if let Some(pivot) = pivot {
            let pivot = touching.swap_remove(pivot);
            for term in touching {
                self.insert(term.substitute(var, &pivot).normalized());
            }
            return EliminationMethod::Substitution;
        }

        let (upper, lower): (Vec<Term>, Vec<Term>) = touching
            .into_iter()
            .partition(|t| t.coefficient(var.name()) > 0.0);
        for up in &upper {
            let up_scaled = up.scaled(1.0 / up.coefficient(var.name()));
            for low in &lower {
                let factor = -1.0 / low.coefficient(var.name());
                let mut combined = up_scaled.add_scaled(low, factor);
                combined = combined.without_var(var);
                self.insert(combined.normalized());
            }
        }
        EliminationMethod::FourierMotzkin
    }

    fn to_list(&self) -> TermList {
        TermList::new(self.slots.iter().flatten().cloned())
    }
}

impl PartialEq for TermList {
    /// Syntactic equality up to term order; use
    /// [`TermList::is_equivalent`] for region equality.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.terms.iter().all(|t| other.terms.contains(t))
    }
}

impl From<Vec<Term>> for TermList {
    fn from(terms: Vec<Term>) -> Self {
        TermList::new(terms)
    }
}

impl From<TermList> for Vec<Term> {
    fn from(list: TermList) -> Self {
        list.terms
    }
}

impl FromIterator<Term> for TermList {
    fn from_iter<T: IntoIterator<Item = Term>>(iter: T) -> Self {
        TermList::new(iter)
    }
}

impl<'a> IntoIterator for &'a TermList {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

impl fmt::Display for TermList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("[]");
        }
        writeln!(f, "[")?;
        for term in &self.terms {
            writeln!(f, "  {}", term)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
#[path = "term_list_tests.rs"]
mod tests;
