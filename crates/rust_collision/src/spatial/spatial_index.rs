//! Broad-phase contract and strategy selection

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::geometry::AABB;
use crate::physics::{BodyHandle, CollisionPair};

use super::{
    BruteForce, Bvh, BvhConfig, Octree, OctreeConfig, SweepAndPrune, SweepAndPruneConfig,
    UniformGrid, UniformGridConfig,
};

/// Broad-phase contract
///
/// `query_pairs` returns every pair of stored bodies whose AABBs overlap
/// (touching included), sorted and without duplicates. Bodies with an invalid
/// (empty) AABB are stored but never paired. Querying an empty index yields
/// an empty list.
pub trait BroadPhase {
    /// Add a body, replacing any previous entry for the same handle
    fn insert(&mut self, handle: BodyHandle, aabb: AABB);

    /// Remove a body; `false` if it was not present
    fn remove(&mut self, handle: BodyHandle) -> bool;

    /// Replace a body's bounds
    fn update(&mut self, handle: BodyHandle, aabb: AABB) {
        self.remove(handle);
        self.insert(handle, aabb);
    }

    /// Rebuild internal structure from the stored bounds
    fn rebuild(&mut self);

    /// Candidate pairs whose AABBs overlap
    fn query_pairs(&mut self) -> Vec<CollisionPair>;

    /// Drop every body
    fn clear(&mut self);

    /// Number of stored bodies
    fn len(&self) -> usize;

    /// Whether no body is stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Broad-phase strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BroadPhaseKind {
    /// Test every pair
    BruteForce,
    /// Bounding volume hierarchy
    #[default]
    Bvh,
    /// Fixed-region octree
    Octree,
    /// Hashed uniform grid
    UniformGrid,
    /// Sweep and prune along one axis
    SweepAndPrune,
}

/// # Broad Phase Configuration
///
/// Active strategy plus the tuning of every strategy, so switching at runtime
/// keeps each one's settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadPhaseConfig {
    /// Active strategy
    pub kind: BroadPhaseKind,
    /// BVH settings
    pub bvh: BvhConfig,
    /// Octree settings
    pub octree: OctreeConfig,
    /// Uniform grid settings
    pub grid: UniformGridConfig,
    /// Sweep-and-prune settings
    pub sweep: SweepAndPruneConfig,
}

impl BroadPhaseConfig {
    /// Select the strategy
    #[must_use]
    pub const fn with_kind(mut self, kind: BroadPhaseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Validate every strategy's settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bvh.validate()?;
        self.octree.validate()?;
        self.grid.validate()?;
        Ok(())
    }
}

/// The active broad phase
///
/// An enum rather than a trait object so every call is statically dispatched.
#[derive(Debug, Clone)]
pub enum SpatialIndex {
    /// Every pair
    BruteForce(BruteForce),
    /// Bounding volume hierarchy
    Bvh(Bvh),
    /// Octree
    Octree(Octree),
    /// Uniform grid
    UniformGrid(UniformGrid),
    /// Sweep and prune
    SweepAndPrune(SweepAndPrune),
}

impl SpatialIndex {
    /// Empty index of the given kind
    pub fn new(kind: BroadPhaseKind, config: &BroadPhaseConfig) -> Self {
        match kind {
            BroadPhaseKind::BruteForce => Self::BruteForce(BruteForce::new()),
            BroadPhaseKind::Bvh => Self::Bvh(Bvh::new(config.bvh.clone())),
            BroadPhaseKind::Octree => Self::Octree(Octree::new(config.octree.clone())),
            BroadPhaseKind::UniformGrid => Self::UniformGrid(UniformGrid::new(config.grid.clone())),
            BroadPhaseKind::SweepAndPrune => Self::SweepAndPrune(SweepAndPrune::new(config.sweep.clone())),
        }
    }

    /// Empty index for `config.kind`
    pub fn from_config(config: &BroadPhaseConfig) -> Self {
        Self::new(config.kind, config)
    }

    /// Which strategy this is
    pub const fn kind(&self) -> BroadPhaseKind {
        match self {
            Self::BruteForce(_) => BroadPhaseKind::BruteForce,
            Self::Bvh(_) => BroadPhaseKind::Bvh,
            Self::Octree(_) => BroadPhaseKind::Octree,
            Self::UniformGrid(_) => BroadPhaseKind::UniformGrid,
            Self::SweepAndPrune(_) => BroadPhaseKind::SweepAndPrune,
        }
    }
}

/// Forward a call to whichever strategy is active
macro_rules! for_each_strategy {
    ($index:expr, $inner:ident => $call:expr) => {
        match $index {
            SpatialIndex::BruteForce($inner) => $call,
            SpatialIndex::Bvh($inner) => $call,
            SpatialIndex::Octree($inner) => $call,
            SpatialIndex::UniformGrid($inner) => $call,
            SpatialIndex::SweepAndPrune($inner) => $call,
        }
    };
}

impl BroadPhase for SpatialIndex {
    fn insert(&mut self, handle: BodyHandle, aabb: AABB) {
        for_each_strategy!(self, index => index.insert(handle, aabb));
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        for_each_strategy!(self, index => index.remove(handle))
    }

    fn update(&mut self, handle: BodyHandle, aabb: AABB) {
        for_each_strategy!(self, index => index.update(handle, aabb));
    }

    fn rebuild(&mut self) {
        for_each_strategy!(self, index => index.rebuild());
    }

    fn query_pairs(&mut self) -> Vec<CollisionPair> {
        for_each_strategy!(self, index => index.query_pairs())
    }

    fn clear(&mut self) {
        for_each_strategy!(self, index => index.clear());
    }

    fn len(&self) -> usize {
        for_each_strategy!(self, index => index.len())
    }
}

/// Sorted, duplicate-free list from a pair set
pub(super) fn into_sorted(pairs: HashSet<CollisionPair>) -> Vec<CollisionPair> {
    let mut sorted: Vec<CollisionPair> = pairs.into_iter().collect();
    sorted.sort_unstable();
    sorted
}

/// Pairs among `entries` with overlapping valid boxes
pub(super) fn overlapping_pairs_among(
    entries: &[(BodyHandle, AABB)],
    pairs: &mut HashSet<CollisionPair>,
) {
    for (i, (handle_a, aabb_a)) in entries.iter().enumerate() {
        for (handle_b, aabb_b) in &entries[i + 1..] {
            if handle_a != handle_b && aabb_a.intersects(aabb_b) {
                pairs.insert(CollisionPair::new(*handle_a, *handle_b));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use slotmap::SlotMap;

    const ALL_KINDS: [BroadPhaseKind; 5] = [
        BroadPhaseKind::BruteForce,
        BroadPhaseKind::Bvh,
        BroadPhaseKind::Octree,
        BroadPhaseKind::UniformGrid,
        BroadPhaseKind::SweepAndPrune,
    ];

    fn random_boxes(rng: &mut StdRng, count: usize) -> Vec<(BodyHandle, AABB)> {
        let mut handles: SlotMap<BodyHandle, ()> = SlotMap::with_key();
        (0..count)
            .map(|_| {
                let center = Vec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                let half = Vec3::new(
                    rng.gen_range(0.1..2.5),
                    rng.gen_range(0.1..2.5),
                    rng.gen_range(0.1..2.5),
                );
                (handles.insert(()), AABB::from_center_half_extents(center, half))
            })
            .collect()
    }

    fn small_octree_config() -> BroadPhaseConfig {
        let mut config = BroadPhaseConfig::default();
        config.octree.world_bounds = AABB::from_center_half_extents(Vec3::zeros(), Vec3::repeat(10.0));
        config.octree.max_entities_per_node = 3;
        config
    }

    #[test]
    fn test_empty_index_yields_nothing() {
        let config = BroadPhaseConfig::default();
        for kind in ALL_KINDS {
            let mut index = SpatialIndex::new(kind, &config);
            assert!(index.is_empty());
            assert!(index.query_pairs().is_empty(), "{kind:?}");
            index.rebuild();
            assert!(index.query_pairs().is_empty(), "{kind:?}");
        }
    }

    #[test]
    fn test_every_strategy_matches_brute_force() {
        let config = small_octree_config();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for round in 0..20 {
            let count = rng.gen_range(0..=50);
            let boxes = random_boxes(&mut rng, count);

            let mut reference = SpatialIndex::new(BroadPhaseKind::BruteForce, &config);
            for (handle, aabb) in &boxes {
                reference.insert(*handle, *aabb);
            }
            let expected = reference.query_pairs();

            for kind in ALL_KINDS {
                let mut index = SpatialIndex::new(kind, &config);
                for (handle, aabb) in &boxes {
                    index.insert(*handle, *aabb);
                }
                assert_eq!(index.len(), count);
                assert_eq!(index.query_pairs(), expected, "{kind:?} round {round}");
            }
        }
    }

    #[test]
    fn test_every_strategy_tracks_moves() {
        let config = small_octree_config();
        let mut rng = StdRng::seed_from_u64(42);
        let mut boxes = random_boxes(&mut rng, 40);

        let mut indices: Vec<SpatialIndex> =
            ALL_KINDS.iter().map(|kind| SpatialIndex::new(*kind, &config)).collect();
        for index in &mut indices {
            for (handle, aabb) in &boxes {
                index.insert(*handle, *aabb);
            }
        }

        for _ in 0..10 {
            for (handle, aabb) in boxes.iter_mut().step_by(3) {
                let offset = Vec3::new(
                    rng.gen_range(-1.5..1.5),
                    rng.gen_range(-1.5..1.5),
                    rng.gen_range(-1.5..1.5),
                );
                *aabb = AABB::new(aabb.min + offset, aabb.max + offset);
                for index in &mut indices {
                    index.update(*handle, *aabb);
                }
            }
            let (reference, others) = indices.split_at_mut(1);
            let expected = reference[0].query_pairs();
            for index in others {
                assert_eq!(index.query_pairs(), expected, "{:?}", index.kind());
            }
        }
    }

    #[test]
    fn test_rebuild_is_idempotent_for_every_strategy() {
        let config = small_octree_config();
        let mut rng = StdRng::seed_from_u64(7);
        let boxes = random_boxes(&mut rng, 30);

        for kind in ALL_KINDS {
            let mut index = SpatialIndex::new(kind, &config);
            for (handle, aabb) in &boxes {
                index.insert(*handle, *aabb);
            }
            index.rebuild();
            let first = index.query_pairs();
            index.rebuild();
            index.rebuild();
            assert_eq!(index.query_pairs(), first, "{kind:?}");
        }
    }

    #[test]
    fn test_remove_and_clear() {
        let config = BroadPhaseConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let boxes = random_boxes(&mut rng, 10);

        for kind in ALL_KINDS {
            let mut index = SpatialIndex::new(kind, &config);
            for (handle, aabb) in &boxes {
                index.insert(*handle, *aabb);
            }
            assert!(index.remove(boxes[0].0));
            assert!(!index.remove(boxes[0].0));
            assert!(index.query_pairs().iter().all(|pair| !pair.contains(boxes[0].0)));
            index.clear();
            assert!(index.is_empty());
            assert!(index.query_pairs().is_empty());
        }
    }

    #[test]
    fn test_config_selects_kind() {
        let config = BroadPhaseConfig::default().with_kind(BroadPhaseKind::SweepAndPrune);
        assert_eq!(SpatialIndex::from_config(&config).kind(), BroadPhaseKind::SweepAndPrune);
        assert_eq!(
            SpatialIndex::from_config(&BroadPhaseConfig::default()).kind(),
            BroadPhaseKind::Bvh
        );
        assert!(config.validate().is_ok());
    }
}
