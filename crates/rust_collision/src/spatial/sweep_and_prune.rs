//! Sweep and prune along a single axis
//!
//! Endpoints persist between queries and are re-sorted with insertion sort,
//! which is close to linear when bodies move a little each frame.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::geometry::AABB;
use crate::physics::{BodyHandle, CollisionPair};

use super::spatial_index::{into_sorted, BroadPhase};

/// Sweep axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SweepAxis {
    /// World X
    #[default]
    X,
    /// World Y
    Y,
    /// World Z
    Z,
}

impl SweepAxis {
    /// Component index
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// # Sweep-and-Prune Configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepAndPruneConfig {
    /// Axis the endpoints are sorted along
    pub axis: SweepAxis,
}

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    value: f32,
    handle: BodyHandle,
    is_min: bool,
}

impl Endpoint {
    /// Ascending value; at equal values min endpoints come first so touching
    /// intervals overlap
    fn order(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| other.is_min.cmp(&self.is_min))
            .then_with(|| self.handle.cmp(&other.handle))
    }
}

/// Sweep-and-prune broad phase
#[derive(Debug, Clone, Default)]
pub struct SweepAndPrune {
    config: SweepAndPruneConfig,
    entries: HashMap<BodyHandle, AABB>,
    endpoints: Vec<Endpoint>,
}

impl SweepAndPrune {
    /// Create an empty sweep
    pub fn new(config: SweepAndPruneConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Active axis
    pub const fn axis(&self) -> SweepAxis {
        self.config.axis
    }

    fn push_endpoints(&mut self, handle: BodyHandle, aabb: &AABB) {
        if !aabb.is_valid() {
            return;
        }
        let axis = self.config.axis.index();
        self.endpoints.push(Endpoint { value: aabb.min[axis], handle, is_min: true });
        self.endpoints.push(Endpoint { value: aabb.max[axis], handle, is_min: false });
    }

    /// Refresh endpoint values from the stored boxes and restore order
    fn refresh(&mut self) {
        let axis = self.config.axis.index();
        for endpoint in &mut self.endpoints {
            if let Some(aabb) = self.entries.get(&endpoint.handle) {
                endpoint.value = if endpoint.is_min { aabb.min[axis] } else { aabb.max[axis] };
            }
        }

        for i in 1..self.endpoints.len() {
            let mut j = i;
            while j > 0 && self.endpoints[j - 1].order(&self.endpoints[j]) == Ordering::Greater {
                self.endpoints.swap(j - 1, j);
                j -= 1;
            }
        }
    }
}

impl BroadPhase for SweepAndPrune {
    fn insert(&mut self, handle: BodyHandle, aabb: AABB) {
        if self.entries.insert(handle, aabb).is_some() {
            self.endpoints.retain(|endpoint| endpoint.handle != handle);
        }
        self.push_endpoints(handle, &aabb);
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        let removed = self.entries.remove(&handle).is_some();
        if removed {
            self.endpoints.retain(|endpoint| endpoint.handle != handle);
        }
        removed
    }

    fn update(&mut self, handle: BodyHandle, aabb: AABB) {
        let had_endpoints = self
            .entries
            .insert(handle, aabb)
            .is_some_and(|previous| previous.is_valid());
        // Endpoint values are refreshed lazily; only validity changes touch the list
        match (had_endpoints, aabb.is_valid()) {
            (true, true) => {}
            (true, false) => self.endpoints.retain(|endpoint| endpoint.handle != handle),
            (false, _) => self.push_endpoints(handle, &aabb),
        }
    }

    fn rebuild(&mut self) {
        self.endpoints.clear();
        let mut sorted: Vec<(BodyHandle, AABB)> =
            self.entries.iter().map(|(handle, aabb)| (*handle, *aabb)).collect();
        sorted.sort_unstable_by_key(|(handle, _)| *handle);
        for (handle, aabb) in &sorted {
            self.push_endpoints(*handle, aabb);
        }
        self.endpoints.sort_by(Endpoint::order);
    }

    fn query_pairs(&mut self) -> Vec<CollisionPair> {
        self.refresh();

        let mut pairs = HashSet::new();
        let mut active: Vec<BodyHandle> = Vec::new();
        for endpoint in &self.endpoints {
            if !endpoint.is_min {
                active.retain(|handle| *handle != endpoint.handle);
                continue;
            }
            let Some(aabb) = self.entries.get(&endpoint.handle) else {
                continue;
            };
            for other in &active {
                let overlaps = self
                    .entries
                    .get(other)
                    .is_some_and(|other_aabb| aabb.intersects(other_aabb));
                if overlaps {
                    pairs.insert(CollisionPair::new(endpoint.handle, *other));
                }
            }
            active.push(endpoint.handle);
        }
        into_sorted(pairs)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.endpoints.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
