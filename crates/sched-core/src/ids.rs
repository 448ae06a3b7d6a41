use std::fmt;

use serde::{Deserialize, Serialize};

/// Index into `Data::lines`. Lines and orders reference each other only
/// through these indices plus lookup tables keyed on them — never through
/// direct pointers — so the domain model stays a flat arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineIdx(pub usize);

/// Index into `Data::orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderIdx(pub usize);

impl LineIdx {
    pub fn new(i: usize) -> Self {
        LineIdx(i)
    }
    pub fn value(self) -> usize {
        self.0
    }
}

impl OrderIdx {
    pub fn new(i: usize) -> Self {
        OrderIdx(i)
    }
    pub fn value(self) -> usize {
        self.0
    }
}

impl fmt::Display for LineIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl fmt::Display for OrderIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}
