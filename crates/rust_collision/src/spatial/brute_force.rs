//! All-pairs broad phase

use std::collections::HashSet;

use crate::geometry::AABB;
use crate::physics::{BodyHandle, CollisionPair};

use super::spatial_index::{into_sorted, overlapping_pairs_among, BroadPhase};

/// Tests every pair of stored boxes
#[derive(Debug, Clone, Default)]
pub struct BruteForce {
    entries: Vec<(BodyHandle, AABB)>,
}

impl BruteForce {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }
}

impl BroadPhase for BruteForce {
    fn insert(&mut self, handle: BodyHandle, aabb: AABB) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == handle) {
            Some(entry) => entry.1 = aabb,
            None => self.entries.push((handle, aabb)),
        }
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != handle);
        self.entries.len() != before
    }

    fn update(&mut self, handle: BodyHandle, aabb: AABB) {
        self.insert(handle, aabb);
    }

    fn rebuild(&mut self) {}

    fn query_pairs(&mut self) -> Vec<CollisionPair> {
        let mut pairs = HashSet::new();
        overlapping_pairs_among(&self.entries, &mut pairs);
        into_sorted(pairs)
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
