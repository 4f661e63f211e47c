//! Cursor positions into the event log.
//!
//! A [`Cursor`] identifies an event's place in the log: the pair
//! `(position, position_offset)`. `position` is a monotonic, real-number-like
//! value assigned by the log (not necessarily contiguous); `position_offset`
//! (a.k.a. `inTxOrder`) disambiguates events that share a `position` because
//! they were appended in the same transaction.
//!
//! Comparison is always lexicographic on the pair. Nothing in this crate
//! assumes `position_offset` resets to zero when `position` advances.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A position in the event log: `(position, position_offset)`, compared
/// lexicographically.
///
/// The zero value `Cursor::ORIGIN` represents "before the first event",
/// used as the starting cursor for a projection that has never run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// Monotonic position assigned by the log.
    pub position: OrderedFloat<f64>,
    /// Disambiguator for events sharing a `position` (same transaction).
    pub position_offset: i32,
}

impl Cursor {
    /// The cursor of a projection that has never applied an event.
    ///
    /// Represented as `(0.0, 0)` since `position` is non-negative in this
    /// system (spec note: "−∞" is represented as `0` for that reason).
    pub const ORIGIN: Self = Self {
        position: OrderedFloat(0.0),
        position_offset: 0,
    };

    /// Build a cursor from a raw `(position, position_offset)` pair.
    #[must_use]
    pub const fn new(position: f64, position_offset: i32) -> Self {
        Self {
            position: OrderedFloat(position),
            position_offset,
        }
    }

    /// `true` if this cursor is still at the origin (nothing applied yet).
    #[must_use]
    pub fn is_origin(self) -> bool {
        self == Self::ORIGIN
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::ORIGIN
    }
}

impl Eq for Cursor {}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| self.position_offset.cmp(&other.position_offset))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.position.0, self.position_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_default() {
        assert_eq!(Cursor::default(), Cursor::ORIGIN);
        assert!(Cursor::ORIGIN.is_origin());
    }

    #[test]
    fn lexicographic_ordering() {
        let a = Cursor::new(100.0, 5);
        let b = Cursor::new(100.0, 6);
        let c = Cursor::new(101.0, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(Cursor::ORIGIN < a);
    }

    #[test]
    fn equal_pairs_are_equal() {
        assert_eq!(Cursor::new(1.0, 2), Cursor::new(1.0, 2));
    }

    proptest::proptest! {
        #[test]
        fn ord_is_consistent_with_tuple(
            p1 in 0.0f64..1_000_000.0,
            o1 in 0i32..10_000,
            p2 in 0.0f64..1_000_000.0,
            o2 in 0i32..10_000,
        ) {
            let a = Cursor::new(p1, o1);
            let b = Cursor::new(p2, o2);
            let expected = (p1, o1).partial_cmp(&(p2, o2)).unwrap();
            assert_eq!(a.cmp(&b), expected);
        }
    }
}
