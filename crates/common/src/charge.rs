use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Processing cost reported by the read store for a single operation.
///
/// Costs of paged or multi-step operations are summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestCharge(f64);

impl RequestCharge {
    pub fn new(units: f64) -> Self {
        Self(units)
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn units(&self) -> f64 {
        self.0
    }
}

impl Add for RequestCharge {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for RequestCharge {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for RequestCharge {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl std::fmt::Display for RequestCharge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} RU", self.0)
    }
}
