//! Pactum assume-guarantee contracts
//!
//! This crate provides the contract algebra over polyhedral specifications:
//! composition, quotient, merge and refinement for single-polyhedron
//! contracts, their disjunctive generalization, and the machine and
//! readable forms used to store them.

pub mod compound;
pub mod contract;
pub mod errors;
pub mod iocontract;
pub mod multiple;
pub mod serialization;

pub use compound::CompoundIoContract;
pub use contract::{Contract, ContractAlgebra, Membership};
pub use errors::{ContractError, ContractResult};
pub use iocontract::IoContract;
pub use multiple::{compose_all, dependency_order};
pub use serialization::{
    from_json, to_json, ContractRecord, ReadableCompoundContract, ReadableContract,
};

#[cfg(test)]
mod tests;
