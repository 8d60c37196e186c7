//! Port variables

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A named real-valued port.
///
/// Variables are compared by name only: the same name denotes the same
/// quantity in every term list and contract it appears in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Var(String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Var(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Var(name.to_string())
    }
}

impl From<String> for Var {
    fn from(name: String) -> Self {
        Var(name)
    }
}

impl From<&Var> for Var {
    fn from(var: &Var) -> Self {
        var.clone()
    }
}

impl Borrow<str> for Var {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
