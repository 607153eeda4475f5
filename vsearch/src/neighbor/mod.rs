/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::cmp::Ordering;

mod queue;
pub use queue::{TopKQueue, select_top_k};

/// Id written to result slots that could not be filled.
pub const NO_ID: u64 = u64::MAX;

/// Distance written to result slots that could not be filled.
pub const NO_DISTANCE: f64 = f64::INFINITY;

//////////////
// Neighbor //
//////////////

/// A candidate neighbor of a query.
///
/// Neighbors are totally ordered by distance (using [`f64::total_cmp`], so `NaN` sorts
/// after `+inf`) and then by id. Among equal distances the smaller id ranks first.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Row of the candidate in the searched dataset.
    pub id: u64,

    /// Distance from the query to the candidate.
    pub distance: f64,
}

impl Neighbor {
    /// The value of an unfilled result slot.
    pub const SENTINEL: Self = Self {
        id: NO_ID,
        distance: NO_DISTANCE,
    };

    pub fn new(id: u64, distance: f64) -> Self {
        Self { id, distance }
    }

    /// Return the contents of `self` as a tuple.
    pub fn as_tuple(self) -> (u64, f64) {
        (self.id, self.distance)
    }
}

impl Default for Neighbor {
    fn default() -> Self {
        Self::SENTINEL
    }
}

impl PartialEq for Neighbor {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbor {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod neighbor_test {
    use super::*;

    #[test]
    fn orders_by_distance_then_id() {
        let a = Neighbor::new(7, 1.0);
        let b = Neighbor::new(3, 1.0);
        let c = Neighbor::new(1, 2.0);
        assert!(b < a);
        assert!(a < c);
        assert_eq!(a, Neighbor::new(7, 1.0));
        assert_ne!(a, b);

        let mut v = vec![c, a, b];
        v.sort();
        assert_eq!(v, vec![b, a, c]);
    }

    #[test]
    fn nan_sorts_last() {
        let nan = Neighbor::new(0, f64::NAN);
        let inf = Neighbor::new(1, f64::INFINITY);
        assert!(inf < nan);
        assert!(Neighbor::SENTINEL > Neighbor::new(u64::MAX - 1, f64::MAX));
        assert_eq!(Neighbor::default().as_tuple(), (NO_ID, NO_DISTANCE));
    }
}
