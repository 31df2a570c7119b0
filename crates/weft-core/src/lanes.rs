//! Priority lanes for scheduling renders.
//!
//! A lane is a single bit in a `u32`; a lower bit means a higher priority.
//! Sets of lanes merge with bitwise or, so membership tests and the
//! highest-priority query are O(1) regardless of how many updates are
//! pending.

use std::fmt;

/// One scheduling priority, represented as a single bit.
///
/// Every update is tagged with the lane that was current when it was
/// dispatched. The work loop always renders the highest-priority pending
/// lane and filters update queues down to that lane.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lane(u32);

impl Lane {
    /// The absence of a lane. Doubles as the "nothing pending" sentinel.
    pub const NONE: Lane = Lane(0);
    /// Highest priority. Sync renders run to completion without yielding.
    pub const SYNC: Lane = Lane(1 << 0);
    /// Priority of updates driven by continuous user input.
    pub const INPUT: Lane = Lane(1 << 1);
    /// Default priority for updates with no special origin.
    pub const DEFAULT: Lane = Lane(1 << 2);
    /// Lowest priority. Runs only when nothing else is pending.
    pub const IDLE: Lane = Lane(1 << 3);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `true` when this lane is a member of `lanes`.
    pub fn intersects(self, lanes: Lanes) -> bool {
        self.0 & lanes.0 != 0
    }

    /// `true` when this lane is strictly higher priority than `other`.
    /// [`Lane::NONE`] outranks nothing.
    pub fn outranks(self, other: Lane) -> bool {
        !self.is_none() && (other.is_none() || self.0 < other.0)
    }
}

impl fmt::Debug for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Lane::NONE => write!(f, "Lane::NONE"),
            Lane::SYNC => write!(f, "Lane::SYNC"),
            Lane::INPUT => write!(f, "Lane::INPUT"),
            Lane::DEFAULT => write!(f, "Lane::DEFAULT"),
            Lane::IDLE => write!(f, "Lane::IDLE"),
            Lane(bits) => write!(f, "Lane({bits:#b})"),
        }
    }
}

/// A set of lanes.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Lanes(u32);

impl Lanes {
    pub const NONE: Lanes = Lanes(0);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, lane: Lane) -> bool {
        self.0 & lane.0 != 0
    }

    #[must_use]
    pub fn merge(self, lane: Lane) -> Lanes {
        Lanes(self.0 | lane.0)
    }

    #[must_use]
    pub fn remove(self, lane: Lane) -> Lanes {
        Lanes(self.0 & !lane.0)
    }

    /// The highest-priority member: the lowest set bit, isolated via
    /// two's complement. Returns [`Lane::NONE`] for the empty set.
    pub fn highest(self) -> Lane {
        Lane(self.0 & self.0.wrapping_neg())
    }
}

impl From<Lane> for Lanes {
    fn from(lane: Lane) -> Lanes {
        Lanes(lane.0)
    }
}

impl fmt::Debug for Lanes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lanes({:#b})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_picks_lowest_set_bit() {
        let lanes = Lanes::NONE.merge(Lane::IDLE).merge(Lane::INPUT);
        assert_eq!(lanes.highest(), Lane::INPUT);

        let lanes = lanes.merge(Lane::SYNC);
        assert_eq!(lanes.highest(), Lane::SYNC);
    }

    #[test]
    fn highest_of_empty_set_is_none() {
        assert_eq!(Lanes::NONE.highest(), Lane::NONE);
        assert!(Lanes::NONE.highest().is_none());
    }

    #[test]
    fn sync_outranks_everything_else() {
        assert!(Lane::SYNC.outranks(Lane::INPUT));
        assert!(Lane::SYNC.outranks(Lane::IDLE));
        assert!(Lane::INPUT.outranks(Lane::DEFAULT));
        assert!(!Lane::DEFAULT.outranks(Lane::INPUT));
        assert!(!Lane::SYNC.outranks(Lane::SYNC));
        assert!(!Lane::NONE.outranks(Lane::IDLE));
        assert!(Lane::IDLE.outranks(Lane::NONE));
    }

    #[test]
    fn merge_is_idempotent_and_remove_clears_one_bit() {
        let lanes = Lanes::from(Lane::DEFAULT)
            .merge(Lane::DEFAULT)
            .merge(Lane::SYNC);
        assert!(lanes.contains(Lane::DEFAULT));
        assert!(lanes.contains(Lane::SYNC));

        let lanes = lanes.remove(Lane::SYNC);
        assert!(!lanes.contains(Lane::SYNC));
        assert_eq!(lanes.highest(), Lane::DEFAULT);
    }
}
