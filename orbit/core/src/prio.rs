//! Active-object priorities and the priority set.
//!
//! Priorities are unique per process and run `1..=MAX_ACTIVE`; a higher
//! number means higher urgency. The [`PrioSet`] is a single-word bitmask
//! giving constant-time insert, remove, membership and find-max, which is
//! all the scheduler needs to pick the next active object.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result, MAX_ACTIVE};

/// Validated active-object priority in `1..=MAX_ACTIVE`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prio(u8);

impl Prio {
    /// Lowest urgency.
    pub const MIN: Prio = Prio(1);
    /// Highest urgency.
    pub const MAX: Prio = Prio(MAX_ACTIVE);

    pub fn new(raw: u8) -> Result<Self> {
        if raw == 0 || raw > MAX_ACTIVE {
            Err(Error::InvalidPriority)
        } else {
            Ok(Prio(raw))
        }
    }

    /// Construct without validation; the caller guarantees the range.
    pub const fn new_unchecked(raw: u8) -> Self {
        Prio(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Prio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prio {}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Prio {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "prio {}", self.0);
    }
}

/// Fixed-width bitset over priorities `1..=MAX_ACTIVE`.
///
/// Mutations and scheduler reads both happen inside critical sections; the
/// set itself is plain data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrioSet(u64);

impl PrioSet {
    pub const EMPTY: PrioSet = PrioSet(0);

    pub const fn new() -> Self {
        Self::EMPTY
    }

    #[inline]
    pub fn insert(&mut self, p: Prio) {
        self.0 |= 1u64 << (p.raw() - 1);
    }

    #[inline]
    pub fn remove(&mut self, p: Prio) {
        self.0 &= !(1u64 << (p.raw() - 1));
    }

    #[inline]
    pub const fn has(&self, p: Prio) -> bool {
        self.0 & (1u64 << (p.0 - 1)) != 0
    }

    #[inline]
    pub const fn not_empty(&self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Numerically highest member, or `None` when the set is empty.
    #[inline]
    pub fn find_max(&self) -> Option<Prio> {
        if self.0 == 0 {
            None
        } else {
            let msb = 63 - self.0.leading_zeros();
            Some(Prio::new_unchecked((msb + 1) as u8))
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PrioSet {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "PrioSet({=u64:b})", self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_validation() {
        assert!(Prio::new(0).is_err());
        assert!(Prio::new(1).is_ok());
        assert!(Prio::new(MAX_ACTIVE).is_ok());
        assert!(Prio::new(MAX_ACTIVE + 1).is_err());
    }

    #[test]
    fn find_max_tracks_the_highest_member() {
        let mut set = PrioSet::new();
        assert_eq!(set.find_max(), None);

        for raw in [3u8, 17, 1, 64, 32] {
            set.insert(Prio::new(raw).unwrap());
        }
        assert_eq!(set.find_max(), Some(Prio::new(64).unwrap()));

        set.remove(Prio::new(64).unwrap());
        assert_eq!(set.find_max(), Some(Prio::new(32).unwrap()));
        set.remove(Prio::new(32).unwrap());
        set.remove(Prio::new(17).unwrap());
        assert_eq!(set.find_max(), Some(Prio::new(3).unwrap()));
    }

    #[test]
    fn membership_and_emptiness() {
        let mut set = PrioSet::new();
        let p5 = Prio::new(5).unwrap();
        let p6 = Prio::new(6).unwrap();

        set.insert(p5);
        assert!(set.has(p5));
        assert!(!set.has(p6));
        assert!(set.not_empty());

        set.remove(p5);
        assert!(set.is_empty());
        assert_eq!(set.find_max(), None);
    }

    #[test]
    fn single_member_boundaries() {
        for raw in [1u8, 64] {
            let mut set = PrioSet::new();
            let p = Prio::new(raw).unwrap();
            set.insert(p);
            assert_eq!(set.find_max(), Some(p));
        }
    }
}
