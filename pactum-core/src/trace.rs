//! Structured elimination diagnostics returned alongside results

use crate::var::Var;
use serde::Serialize;

/// How a variable was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EliminationMethod {
    /// Substituted away through an equality
    Substitution,
    /// Pairwise combination of lower and upper bounds
    FourierMotzkin,
    /// Terms rewritten with multipliers of context rows
    Refinement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EliminationStep {
    pub vars: Vec<Var>,
    pub method: EliminationMethod,
    pub terms_before: usize,
    pub terms_after: usize,
}

/// Ordered record of the elimination steps performed by one operation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EliminationTrace {
    steps: Vec<EliminationStep>,
}

impl EliminationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: EliminationStep) {
        self.steps.push(step);
    }

    pub fn extend(&mut self, other: EliminationTrace) {
        self.steps.extend(other.steps);
    }

    pub fn steps(&self) -> &[EliminationStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Variables removed, in order
    pub fn eliminated_vars(&self) -> Vec<&Var> {
        self.steps.iter().flat_map(|s| s.vars.iter()).collect()
    }

    /// Largest term count seen at any step boundary
    pub fn peak_terms(&self) -> usize {
        self.steps
            .iter()
            .map(|s| s.terms_before.max(s.terms_after))
            .max()
            .unwrap_or(0)
    }
}
