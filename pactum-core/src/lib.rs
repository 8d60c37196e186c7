//! Polyhedral term algebra for Pactum
//!
//! This crate provides the representation that contract operators are
//! built on:
//! - Variables and linear terms
//! - Term lists (convex polyhedra) with simplification, variable
//!   elimination, bounds and containment queries
//! - The LP oracle those queries are answered by
//! - Error and diagnostic types

pub mod error;
pub mod lp;
pub mod syntax;
pub mod term;
pub mod term_list;
pub mod trace;
pub mod var;

pub use error::{Error, Result};
pub use lp::{LpOracle, LpOutcome, MinilpOracle, OracleConfig, Sense, DEFAULT_TOLERANCE};
pub use term::{Coefficients, Point, Relation, Term, TermRecord};
pub use term_list::{Bounds, Optimum, TermList};
pub use trace::{EliminationMethod, EliminationStep, EliminationTrace};
pub use var::Var;
