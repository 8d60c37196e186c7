//! Machine and readable forms of contracts

use crate::compound::CompoundIoContract;
use crate::contract::Contract;
use crate::errors::{ContractError, ContractResult};
use crate::iocontract::IoContract;
use pactum_core::{Term, TermList, TermRecord, Var};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Machine form: coefficient maps per term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub input_vars: Vec<String>,
    pub output_vars: Vec<String>,
    pub assumptions: Vec<TermRecord>,
    pub guarantees: Vec<TermRecord>,
}

/// Readable form: one canonical string per term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadableContract {
    pub input_vars: Vec<String>,
    pub output_vars: Vec<String>,
    pub assumptions: Vec<String>,
    pub guarantees: Vec<String>,
}

/// Readable form of a compound contract, one string list per disjunct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadableCompoundContract {
    pub input_vars: Vec<String>,
    pub output_vars: Vec<String>,
    pub assumptions: Vec<Vec<String>>,
    pub guarantees: Vec<Vec<String>>,
}

fn names(vars: &std::collections::BTreeSet<Var>) -> Vec<String> {
    vars.iter().map(|v| v.name().to_string()).collect()
}

fn records(list: &TermList) -> Vec<TermRecord> {
    list.iter().cloned().map(TermRecord::from).collect()
}

fn from_records(records: Vec<TermRecord>) -> ContractResult<TermList> {
    let terms = records
        .into_iter()
        .map(Term::try_from)
        .collect::<pactum_core::Result<Vec<_>>>()?;
    Ok(TermList::new(terms))
}

fn strings(list: &TermList) -> Vec<String> {
    list.iter().map(Term::to_string).collect()
}

fn from_strings(items: &[String]) -> ContractResult<TermList> {
    Ok(TermList::from_strings(items)?)
}

impl From<IoContract> for ContractRecord {
    fn from(contract: IoContract) -> Self {
        contract.to_machine()
    }
}

impl TryFrom<ContractRecord> for IoContract {
    type Error = ContractError;

    fn try_from(record: ContractRecord) -> ContractResult<Self> {
        IoContract::from_machine(record)
    }
}

impl IoContract {
    pub fn to_machine(&self) -> ContractRecord {
        ContractRecord {
            input_vars: names(self.input_vars()),
            output_vars: names(self.output_vars()),
            assumptions: records(self.assumptions()),
            guarantees: records(self.guarantees()),
        }
    }

    pub fn from_machine(record: ContractRecord) -> ContractResult<IoContract> {
        IoContract::new(
            record.input_vars,
            record.output_vars,
            from_records(record.assumptions)?,
            from_records(record.guarantees)?,
        )
    }

    pub fn to_readable(&self) -> ReadableContract {
        ReadableContract {
            input_vars: names(self.input_vars()),
            output_vars: names(self.output_vars()),
            assumptions: strings(self.assumptions()),
            guarantees: strings(self.guarantees()),
        }
    }

    pub fn from_readable(readable: &ReadableContract) -> ContractResult<IoContract> {
        IoContract::new(
            readable.input_vars.iter().map(String::as_str),
            readable.output_vars.iter().map(String::as_str),
            from_strings(&readable.assumptions)?,
            from_strings(&readable.guarantees)?,
        )
    }
}

impl CompoundIoContract {
    pub fn to_readable(&self) -> ReadableCompoundContract {
        ReadableCompoundContract {
            input_vars: names(self.input_vars()),
            output_vars: names(self.output_vars()),
            assumptions: self.assumptions().iter().map(strings).collect(),
            guarantees: self.guarantees().iter().map(strings).collect(),
        }
    }

    pub fn from_readable(readable: &ReadableCompoundContract) -> ContractResult<CompoundIoContract> {
        let parse = |disjuncts: &[Vec<String>]| -> ContractResult<Vec<TermList>> {
            disjuncts.iter().map(|items| from_strings(items)).collect()
        };
        CompoundIoContract::new(
            readable.input_vars.iter().map(String::as_str),
            readable.output_vars.iter().map(String::as_str),
            parse(&readable.assumptions)?,
            parse(&readable.guarantees)?,
        )
    }
}

impl Contract {
    /// Machine form. Compound contracts have none.
    pub fn to_machine(&self) -> ContractResult<ContractRecord> {
        match self {
            Contract::Polyhedral(contract) => Ok(contract.to_machine()),
            Contract::Compound(_) => Err(ContractError::Unsupported(
                "machine form of a compound contract".to_string(),
            )),
        }
    }

    pub fn from_machine(record: ContractRecord) -> ContractResult<Contract> {
        IoContract::from_machine(record).map(Contract::Polyhedral)
    }

    /// Readable form; single-polyhedron contracts use one disjunct.
    pub fn to_readable(&self) -> ReadableCompoundContract {
        match self {
            Contract::Polyhedral(contract) => {
                let readable = contract.to_readable();
                ReadableCompoundContract {
                    input_vars: readable.input_vars,
                    output_vars: readable.output_vars,
                    assumptions: vec![readable.assumptions],
                    guarantees: vec![readable.guarantees],
                }
            }
            Contract::Compound(contract) => contract.to_readable(),
        }
    }

    /// Inverse of [`Contract::to_readable`]; one disjunct per side reads
    /// back as a single-polyhedron contract.
    pub fn from_readable(readable: &ReadableCompoundContract) -> ContractResult<Contract> {
        if readable.assumptions.len() <= 1 && readable.guarantees.len() <= 1 {
            let single = ReadableContract {
                input_vars: readable.input_vars.clone(),
                output_vars: readable.output_vars.clone(),
                assumptions: readable.assumptions.first().cloned().unwrap_or_default(),
                guarantees: readable.guarantees.first().cloned().unwrap_or_default(),
            };
            return IoContract::from_readable(&single).map(Contract::Polyhedral);
        }
        CompoundIoContract::from_readable(readable).map(Contract::Compound)
    }
}

pub fn to_json<T: Serialize>(value: &T) -> ContractResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json<T: DeserializeOwned>(text: &str) -> ContractResult<T> {
    Ok(serde_json::from_str(text)?)
}
