//! Test suite for compound contracts, serialization and multi-contract composition


#[cfg(test)]
mod contract_tests;

#[cfg(test)]
mod multiple_tests;

#[cfg(test)]
mod serialization_tests;
