//! Linear-programming oracle
//!
//! Every feasibility, bound, redundancy and containment query made by
//! [`TermList`](crate::TermList) goes through the single [`LpOracle::solve`]
//! shape: a conjunction of terms, an optional linear objective and a sense.
//! "Infeasible" and "unbounded" are ordinary outcomes; only a failure of
//! the backend itself is an error.

use crate::error::{Error, Result};
use crate::term::{Coefficients, Point, Relation};
use crate::term_list::TermList;
use crate::var::Var;
use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use tracing::trace;

/// Default relative tolerance for numeric comparisons
pub const DEFAULT_TOLERANCE: f64 = 1e-7;

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// Result of one LP solve
#[derive(Debug, Clone, PartialEq)]
pub enum LpOutcome {
    Optimal { value: f64, solution: Point },
    Infeasible,
    Unbounded,
}

/// Black-box LP backend
pub trait LpOracle {
    /// Optimize `objective` over the region described by `constraints`.
    ///
    /// Without an objective this is a pure feasibility query and any
    /// feasible outcome reports `Optimal { value: 0.0, .. }`.
    fn solve(
        &self,
        constraints: &TermList,
        objective: Option<&Coefficients>,
        sense: Sense,
    ) -> Result<LpOutcome>;

    /// Relative tolerance used when comparing optimal values to constants
    fn tolerance(&self) -> f64 {
        DEFAULT_TOLERANCE
    }
}

/// Oracle configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Relative tolerance, scaled by `1 + |constant|` at each comparison
    pub tolerance: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Oracle backed by the pure-Rust `minilp` simplex solver
#[derive(Debug, Clone, Default)]
pub struct MinilpOracle {
    config: OracleConfig,
}

impl MinilpOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OracleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }
}

impl LpOracle for MinilpOracle {
    fn solve(
        &self,
        constraints: &TermList,
        objective: Option<&Coefficients>,
        sense: Sense,
    ) -> Result<LpOutcome> {
        // constant rows never reach the backend
        if constraints
            .iter()
            .any(|term| term.is_contradiction(self.config.tolerance))
        {
            return Ok(LpOutcome::Infeasible);
        }

        let mut vars: BTreeSet<&Var> = constraints.iter().flat_map(|t| t.vars()).collect();
        if let Some(objective) = objective {
            vars.extend(objective.iter().filter(|(_, c)| **c != 0.0).map(|(v, _)| v));
        }
        if vars.is_empty() {
            return Ok(LpOutcome::Optimal {
                value: 0.0,
                solution: Point::new(),
            });
        }

        let direction = match sense {
            Sense::Minimize => OptimizationDirection::Minimize,
            Sense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = Problem::new(direction);
        // each free variable is split into nonnegative parts `v = v⁺ - v⁻`
        let columns: Vec<(Var, minilp::Variable, minilp::Variable)> = vars
            .into_iter()
            .map(|var| {
                let cost = objective
                    .and_then(|o| o.get(var).copied())
                    .unwrap_or(0.0);
                let plus = problem.add_var(cost, (0.0, f64::INFINITY));
                let minus = problem.add_var(-cost, (0.0, f64::INFINITY));
                (var.clone(), plus, minus)
            })
            .collect();

        for term in constraints.iter().filter(|t| !t.is_constant()) {
            let mut expr = LinearExpr::empty();
            for (var, plus, minus) in &columns {
                let coefficient = term.coefficient(var.name());
                if coefficient != 0.0 {
                    expr.add(*plus, coefficient);
                    expr.add(*minus, -coefficient);
                }
            }
            let op = match term.relation() {
                Relation::Le => ComparisonOp::Le,
                Relation::Eq => ComparisonOp::Eq,
            };
            problem.add_constraint(expr, op, term.constant());
        }

        trace!(
            constraints = constraints.len(),
            columns = columns.len(),
            "solving LP"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| problem.solve()))
            .map_err(|_| Error::Oracle("LP backend panicked".to_string()))?;

        match outcome {
            Ok(solution) => {
                let value = if objective.is_some() {
                    solution.objective()
                } else {
                    0.0
                };
                if !value.is_finite() {
                    return Err(Error::Oracle(format!(
                        "LP backend returned non-finite objective {}",
                        value
                    )));
                }
                let solution = columns
                    .iter()
                    .map(|(var, plus, minus)| (var.clone(), solution[*plus] - solution[*minus]))
                    .collect();
                Ok(LpOutcome::Optimal { value, solution })
            }
            Err(minilp::Error::Infeasible) => Ok(LpOutcome::Infeasible),
            Err(minilp::Error::Unbounded) => Ok(LpOutcome::Unbounded),
        }
    }

    fn tolerance(&self) -> f64 {
        self.config.tolerance
    }
}
