//! The contract algebra shared by polyhedral and compound contracts

use crate::compound::CompoundIoContract;
use crate::errors::{ContractError, ContractResult};
use crate::iocontract::IoContract;
use pactum_core::{LpOracle, Point, Var};
use std::fmt;

/// Where a behavior falls relative to a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub in_assumptions: bool,
    pub in_guarantees: bool,
}

impl Membership {
    /// Outside the assumptions, or inside the guarantees.
    pub fn satisfies_contract(&self) -> bool {
        !self.in_assumptions || self.in_guarantees
    }
}

/// Operators every contract representation supports
pub trait ContractAlgebra: Sized {
    fn compose(&self, other: &Self, vars_to_keep: &[Var], oracle: &dyn LpOracle) -> ContractResult<Self>;

    fn quotient(
        &self,
        other: &Self,
        additional_inputs: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<Self>;

    fn merge(&self, other: &Self, oracle: &dyn LpOracle) -> ContractResult<Self>;

    fn refines(&self, other: &Self, oracle: &dyn LpOracle) -> ContractResult<bool>;

    fn contains_behavior(&self, point: &Point) -> ContractResult<Membership>;
}

impl ContractAlgebra for IoContract {
    fn compose(&self, other: &Self, vars_to_keep: &[Var], oracle: &dyn LpOracle) -> ContractResult<Self> {
        IoContract::compose(self, other, vars_to_keep, oracle)
    }

    fn quotient(
        &self,
        other: &Self,
        additional_inputs: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<Self> {
        IoContract::quotient(self, other, additional_inputs, oracle)
    }

    fn merge(&self, other: &Self, oracle: &dyn LpOracle) -> ContractResult<Self> {
        IoContract::merge(self, other, oracle)
    }

    fn refines(&self, other: &Self, oracle: &dyn LpOracle) -> ContractResult<bool> {
        IoContract::refines(self, other, oracle)
    }

    fn contains_behavior(&self, point: &Point) -> ContractResult<Membership> {
        IoContract::contains_behavior(self, point)
    }
}

impl ContractAlgebra for CompoundIoContract {
    fn compose(&self, other: &Self, vars_to_keep: &[Var], oracle: &dyn LpOracle) -> ContractResult<Self> {
        CompoundIoContract::compose(self, other, vars_to_keep, oracle)
    }

    fn quotient(
        &self,
        other: &Self,
        additional_inputs: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<Self> {
        CompoundIoContract::quotient(self, other, additional_inputs, oracle)
    }

    fn merge(&self, other: &Self, oracle: &dyn LpOracle) -> ContractResult<Self> {
        CompoundIoContract::merge(self, other, oracle)
    }

    fn refines(&self, other: &Self, oracle: &dyn LpOracle) -> ContractResult<bool> {
        CompoundIoContract::refines(self, other, oracle)
    }

    fn contains_behavior(&self, point: &Point) -> ContractResult<Membership> {
        CompoundIoContract::contains_behavior(self, point)
    }
}

/// Either representation, with mixed operands promoted to compound form
#[derive(Debug, Clone, PartialEq)]
pub enum Contract {
    Polyhedral(IoContract),
    Compound(CompoundIoContract),
}

impl Contract {
    pub fn is_polyhedral(&self) -> bool {
        matches!(self, Contract::Polyhedral(_))
    }

    pub fn as_polyhedral(&self) -> Option<&IoContract> {
        match self {
            Contract::Polyhedral(contract) => Some(contract),
            Contract::Compound(_) => None,
        }
    }

    pub fn to_compound(&self) -> CompoundIoContract {
        match self {
            Contract::Polyhedral(contract) => CompoundIoContract::from(contract.clone()),
            Contract::Compound(contract) => contract.clone(),
        }
    }
}

impl From<IoContract> for Contract {
    fn from(contract: IoContract) -> Self {
        Contract::Polyhedral(contract)
    }
}

impl From<CompoundIoContract> for Contract {
    fn from(contract: CompoundIoContract) -> Self {
        Contract::Compound(contract)
    }
}

impl ContractAlgebra for Contract {
    fn compose(&self, other: &Self, vars_to_keep: &[Var], oracle: &dyn LpOracle) -> ContractResult<Self> {
        match (self, other) {
            (Contract::Polyhedral(a), Contract::Polyhedral(b)) => {
                a.compose(b, vars_to_keep, oracle).map(Contract::from)
            }
            _ => self
                .to_compound()
                .compose(&other.to_compound(), vars_to_keep, oracle)
                .map(Contract::from),
        }
    }

    fn quotient(
        &self,
        other: &Self,
        additional_inputs: &[Var],
        oracle: &dyn LpOracle,
    ) -> ContractResult<Self> {
        match (self, other) {
            (Contract::Polyhedral(a), Contract::Polyhedral(b)) => {
                a.quotient(b, additional_inputs, oracle).map(Contract::from)
            }
            _ => Err(ContractError::Unsupported(
                "quotient of compound contracts".to_string(),
            )),
        }
    }

    fn merge(&self, other: &Self, oracle: &dyn LpOracle) -> ContractResult<Self> {
        match (self, other) {
            (Contract::Polyhedral(a), Contract::Polyhedral(b)) => a.merge(b, oracle).map(Contract::from),
            _ => self
                .to_compound()
                .merge(&other.to_compound(), oracle)
                .map(Contract::from),
        }
    }

    fn refines(&self, other: &Self, oracle: &dyn LpOracle) -> ContractResult<bool> {
        match (self, other) {
            (Contract::Polyhedral(a), Contract::Polyhedral(b)) => a.refines(b, oracle),
            _ => self.to_compound().refines(&other.to_compound(), oracle),
        }
    }

    fn contains_behavior(&self, point: &Point) -> ContractResult<Membership> {
        match self {
            Contract::Polyhedral(contract) => contract.contains_behavior(point),
            Contract::Compound(contract) => contract.contains_behavior(point),
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contract::Polyhedral(contract) => write!(f, "{}", contract),
            Contract::Compound(contract) => write!(f, "{}", contract),
        }
    }
}
