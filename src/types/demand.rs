use std::ops::{Add, AddAssign};

/// Number of items a consumer has authorized a cursor to deliver.
///
/// `Demand::unlimited()` is a sentinel: it absorbs additions and is never
/// decremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Demand(usize);

impl Demand {
    pub const NONE: Demand = Demand(0);

    pub fn none() -> Self {
        Self::NONE
    }

    pub fn max(n: usize) -> Self {
        Demand(n)
    }

    pub fn unlimited() -> Self {
        Demand(usize::MAX)
    }

    pub fn is_unlimited(self) -> bool {
        self.0 == usize::MAX
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns the bounded count, or `None` when unlimited.
    pub fn count(self) -> Option<usize> {
        (!self.is_unlimited()).then_some(self.0)
    }

    /// Takes one unit of demand. Returns false if none was outstanding.
    pub(crate) fn take_one(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }
        if !self.is_unlimited() {
            self.0 -= 1;
        }
        true
    }
}

impl Add for Demand {
    type Output = Demand;

    fn add(self, rhs: Demand) -> Demand {
        Demand(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Demand {
    fn add_assign(&mut self, rhs: Demand) {
        *self = *self + rhs;
    }
}

impl From<usize> for Demand {
    fn from(value: usize) -> Self {
        Demand(value)
    }
}
