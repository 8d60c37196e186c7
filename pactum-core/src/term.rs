//! Linear constraints over named variables
//!
//! A [`Term`] is one constraint `Σ coefficients[v]·v ⋈ constant` where the
//! relation is either `<=` or `=`. Terms are immutable: every arithmetic
//! helper builds a new term. Zero coefficients are never stored, so two
//! terms describing the same constraint with the same scaling compare equal.

use crate::error::{Error, Result};
use crate::lp::DEFAULT_TOLERANCE;
use crate::var::Var;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Coefficient map of a term or of a linear objective
pub type Coefficients = BTreeMap<Var, f64>;

/// An assignment of values to variables
pub type Point = BTreeMap<Var, f64>;

/// Coefficients smaller than this, relative to the largest one, are dropped
/// from terms produced by arithmetic.
const PRUNE_RATIO: f64 = 1e-12;

/// Relation between the left-hand side and the constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Relation {
    #[default]
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=")]
    Eq,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Le => f.write_str("<="),
            Relation::Eq => f.write_str("="),
        }
    }
}

/// A single linear constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TermRecord", into = "TermRecord")]
pub struct Term {
    coefficients: Coefficients,
    constant: f64,
    relation: Relation,
}

/// Machine form of a term: a coefficient map, a constant and a relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub coefficients: BTreeMap<String, f64>,
    pub constant: f64,
    #[serde(default)]
    pub relation: Relation,
}

impl Term {
    /// Build a term, rejecting non-finite values.
    ///
    /// Repeated variables are summed and zero coefficients are dropped.
    pub fn new<V: Into<Var>>(
        coefficients: impl IntoIterator<Item = (V, f64)>,
        constant: f64,
        relation: Relation,
    ) -> Result<Self> {
        if !constant.is_finite() {
            return Err(Error::InvalidTerm(format!(
                "constant must be finite, got {}",
                constant
            )));
        }

        let mut map = Coefficients::new();
        for (var, coefficient) in coefficients {
            let var = var.into();
            if !coefficient.is_finite() {
                return Err(Error::InvalidTerm(format!(
                    "coefficient of {} must be finite, got {}",
                    var, coefficient
                )));
            }
            *map.entry(var).or_insert(0.0) += coefficient;
        }
        map.retain(|_, c| *c != 0.0);

        Ok(Term {
            coefficients: map,
            constant,
            relation,
        })
    }

    /// Build `Σ a·v <= constant`
    pub fn le<V: Into<Var>>(
        coefficients: impl IntoIterator<Item = (V, f64)>,
        constant: f64,
    ) -> Result<Self> {
        Self::new(coefficients, constant, Relation::Le)
    }

    /// Build `Σ a·v = constant`
    pub fn equality<V: Into<Var>>(
        coefficients: impl IntoIterator<Item = (V, f64)>,
        constant: f64,
    ) -> Result<Self> {
        Self::new(coefficients, constant, Relation::Eq)
    }

    /// Assemble a term from values already known to be finite.
    pub(crate) fn from_parts(coefficients: Coefficients, constant: f64, relation: Relation) -> Self {
        let mut term = Term {
            coefficients,
            constant,
            relation,
        };
        term.prune();
        term
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn is_equality(&self) -> bool {
        self.relation == Relation::Eq
    }

    /// Coefficient of `var`, zero when absent
    pub fn coefficient(&self, var: &str) -> f64 {
        self.coefficients.get(var).copied().unwrap_or(0.0)
    }

    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.coefficients.keys()
    }

    pub fn var_set(&self) -> BTreeSet<Var> {
        self.coefficients.keys().cloned().collect()
    }

    pub fn contains_var(&self, var: &str) -> bool {
        self.coefficients.contains_key(var)
    }

    pub fn contains_any(&self, vars: &BTreeSet<Var>) -> bool {
        self.coefficients.keys().any(|v| vars.contains(v))
    }

    /// True when the term mentions no variable
    pub fn is_constant(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// A constant term that holds everywhere, e.g. `0 <= 3`
    pub fn is_tautology(&self, tolerance: f64) -> bool {
        if !self.is_constant() {
            return false;
        }
        let slack = tolerance * (1.0 + self.constant.abs());
        match self.relation {
            Relation::Le => self.constant >= -slack,
            Relation::Eq => self.constant.abs() <= slack,
        }
    }

    /// A constant term that holds nowhere, e.g. `0 <= -1`
    pub fn is_contradiction(&self, tolerance: f64) -> bool {
        self.is_constant() && !self.is_tautology(tolerance)
    }

    /// Value of the left-hand side at `point`
    pub fn lhs_value(&self, point: &Point) -> Result<f64> {
        self.coefficients.iter().try_fold(0.0, |acc, (var, coefficient)| {
            point
                .get(var)
                .map(|value| acc + coefficient * value)
                .ok_or_else(|| Error::MissingAssignment(var.to_string()))
        })
    }

    /// Whether `point` satisfies the term within the default tolerance
    pub fn evaluate(&self, point: &Point) -> Result<bool> {
        let lhs = self.lhs_value(point)?;
        let slack = DEFAULT_TOLERANCE * (1.0 + self.constant.abs());
        Ok(match self.relation {
            Relation::Le => lhs <= self.constant + slack,
            Relation::Eq => (lhs - self.constant).abs() <= slack,
        })
    }

    /// Multiply both sides by `factor`.
    ///
    /// A negative factor on an inequality flips its meaning; callers only
    /// pass negative factors for equalities.
    pub(crate) fn scaled(&self, factor: f64) -> Term {
        Term::from_parts(
            self.coefficients
                .iter()
                .map(|(v, c)| (v.clone(), c * factor))
                .collect(),
            self.constant * factor,
            self.relation,
        )
    }

    /// `self + factor·other`, the result is an equality only if both are.
    pub(crate) fn add_scaled(&self, other: &Term, factor: f64) -> Term {
        let mut coefficients = self.coefficients.clone();
        for (var, coefficient) in &other.coefficients {
            *coefficients.entry(var.clone()).or_insert(0.0) += factor * coefficient;
        }
        let relation = if self.is_equality() && other.is_equality() {
            Relation::Eq
        } else {
            Relation::Le
        };
        Term::from_parts(coefficients, self.constant + factor * other.constant, relation)
    }

    /// Substitute `var` away using the equality `pivot`.
    pub(crate) fn substitute(&self, var: &Var, pivot: &Term) -> Term {
        let factor = -self.coefficient(var.name()) / pivot.coefficient(var.name());
        let mut combined = self.add_scaled(pivot, factor);
        combined.relation = self.relation;
        combined.coefficients.remove(var);
        combined
    }

    /// Drop `var` outright, used once its coefficient has cancelled.
    pub(crate) fn without_var(&self, var: &Var) -> Term {
        let mut term = self.clone();
        term.coefficients.remove(var);
        term
    }

    /// Scale so the largest coefficient magnitude is one.
    pub(crate) fn normalized(&self) -> Term {
        let largest = self
            .coefficients
            .values()
            .fold(0.0_f64, |acc, c| acc.max(c.abs()));
        if largest == 0.0 || largest == 1.0 {
            return self.clone();
        }
        self.scaled(1.0 / largest)
    }

    /// Equalities split into their two inequalities; inequalities unchanged.
    pub fn split_equality(&self) -> Vec<Term> {
        match self.relation {
            Relation::Le => vec![self.clone()],
            Relation::Eq => {
                let upper = Term {
                    relation: Relation::Le,
                    ..self.clone()
                };
                let lower = self.scaled(-1.0);
                vec![
                    upper,
                    Term {
                        relation: Relation::Le,
                        ..lower
                    },
                ]
            }
        }
    }

    /// Replace `source` with `target`, merging coefficients if `target` is
    /// already present.
    pub fn rename_variable(&self, source: &Var, target: &Var) -> Term {
        let Some(coefficient) = self.coefficients.get(source).copied() else {
            return self.clone();
        };
        let mut coefficients = self.coefficients.clone();
        coefficients.remove(source);
        *coefficients.entry(target.clone()).or_insert(0.0) += coefficient;
        Term::from_parts(coefficients, self.constant, self.relation)
    }

    /// Approximate equality of coefficients, constant and relation
    pub fn approx_eq(&self, other: &Term, tolerance: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance * (1.0 + a.abs().max(b.abs()));
        self.relation == other.relation
            && close(self.constant, other.constant)
            && self
                .coefficients
                .keys()
                .chain(other.coefficients.keys())
                .all(|v| close(self.coefficient(v.name()), other.coefficient(v.name())))
    }

    fn prune(&mut self) {
        let largest = self
            .coefficients
            .values()
            .fold(0.0_f64, |acc, c| acc.max(c.abs()));
        let cutoff = largest * PRUNE_RATIO;
        self.coefficients.retain(|_, c| c.abs() > cutoff && *c != 0.0);
        if self.constant.abs() <= PRUNE_RATIO * largest.max(1.0) {
            self.constant = 0.0;
        }
    }
}

impl TryFrom<TermRecord> for Term {
    type Error = Error;

    fn try_from(record: TermRecord) -> Result<Self> {
        Term::new(record.coefficients, record.constant, record.relation)
    }
}

impl From<Term> for TermRecord {
    fn from(term: Term) -> Self {
        TermRecord {
            coefficients: term
                .coefficients
                .into_iter()
                .map(|(v, c)| (v.name().to_string(), c))
                .collect(),
            constant: term.constant,
            relation: term.relation,
        }
    }
}

impl FromStr for Term {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        crate::syntax::parse_term(s)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coefficients.is_empty() {
            f.write_str("0")?;
        }
        for (index, (var, &coefficient)) in self.coefficients.iter().enumerate() {
            let magnitude = if index == 0 {
                if coefficient < 0.0 {
                    f.write_str("-")?;
                }
                coefficient.abs()
            } else {
                f.write_str(if coefficient < 0.0 { " - " } else { " + " })?;
                coefficient.abs()
            };
            if magnitude == 1.0 {
                write!(f, "{}", var)?;
            } else {
                write!(f, "{}*{}", magnitude, var)?;
            }
        }
        // avoid printing "-0"
        let constant = if self.constant == 0.0 { 0.0 } else { self.constant };
        write!(f, " {} {}", self.relation, constant)
    }
}
