/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::collections::BinaryHeap;

use super::{NO_DISTANCE, NO_ID, Neighbor};

/// Keeps the `k` smallest neighbors seen so far.
///
/// Implemented as a bounded max-heap: the root is the worst retained candidate, so a new
/// candidate is either rejected with one comparison or replaces the root.
#[derive(Debug, Clone)]
pub struct TopKQueue {
    k: usize,
    heap: BinaryHeap<Neighbor>,
}

impl TopKQueue {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k),
        }
    }

    /// Maximum number of retained neighbors.
    pub fn capacity(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The worst retained neighbor, if any.
    pub fn worst(&self) -> Option<&Neighbor> {
        self.heap.peek()
    }

    /// Offer a candidate. Returns `true` if it was retained.
    #[inline]
    pub fn insert(&mut self, id: u64, distance: f64) -> bool {
        let candidate = Neighbor::new(id, distance);
        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return true;
        }
        match self.heap.peek_mut() {
            Some(mut worst) if candidate < *worst => {
                *worst = candidate;
                true
            }
            _ => false,
        }
    }

    /// Offer every neighbor retained by `other`.
    pub fn merge(&mut self, other: &TopKQueue) {
        for neighbor in other.heap.iter() {
            self.insert(neighbor.id, neighbor.distance);
        }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Return the retained neighbors in ascending order, emptying the queue.
    pub fn drain_sorted(&mut self) -> Vec<Neighbor> {
        std::mem::take(&mut self.heap).into_sorted_vec()
    }

    /// Write the retained neighbors in ascending order to `ids` and `distances`, padding
    /// with the sentinel when fewer than `ids.len()` are retained. Empties the queue but
    /// keeps its allocation.
    ///
    /// # Panics
    ///
    /// Panics if `ids` and `distances` have different lengths or are shorter than the
    /// number of retained neighbors.
    pub fn write_to(&mut self, ids: &mut [u64], distances: &mut [f64]) {
        assert_eq!(
            ids.len(),
            distances.len(),
            "id and distance outputs must have the same length"
        );
        assert!(
            self.len() <= ids.len(),
            "cannot write {} neighbors into {} slots",
            self.len(),
            ids.len()
        );
        let mut sorted = self.drain_sorted();
        let filled = sorted.len();
        for ((id, distance), neighbor) in ids.iter_mut().zip(distances.iter_mut()).zip(&sorted) {
            *id = neighbor.id;
            *distance = neighbor.distance;
        }
        ids[filled..].fill(NO_ID);
        distances[filled..].fill(NO_DISTANCE);

        sorted.clear();
        self.heap = BinaryHeap::from(sorted);
    }
}

/// Select the `ids.len()` smallest entries of `distances`, writing their positions and
/// values in ascending order. When fewer than `ids.len()` distances are given the
/// remaining slots receive the sentinel. Ties resolve to the smaller position.
///
/// # Panics
///
/// Panics if `ids` and `distances_out` have different lengths.
pub fn select_top_k(distances: &[f64], ids: &mut [u64], distances_out: &mut [f64]) {
    let mut queue = TopKQueue::new(ids.len());
    for (i, &d) in distances.iter().enumerate() {
        queue.insert(i as u64, d);
    }
    queue.write_to(ids, distances_out);
}
