//! Octree spatial partitioning over a fixed world region
//!
//! Each leaf holds up to `max_entities_per_node` boxes and splits into 8
//! octants once it overflows. A box is stored in every octant it overlaps,
//! so two boxes overlap only if they share at least one leaf. Boxes that
//! reach outside the world bounds live in an overflow list and are tested
//! against everything.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::foundation::math::Vec3;
use crate::geometry::AABB;
use crate::physics::{BodyHandle, CollisionPair};

use super::spatial_index::{into_sorted, overlapping_pairs_among, BroadPhase};

/// # Octree Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Region covered by the tree
    pub world_bounds: AABB,

    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            world_bounds: AABB::from_center_half_extents(Vec3::zeros(), Vec3::repeat(1024.0)),
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

impl OctreeConfig {
    /// Set the covered region
    #[must_use]
    pub fn with_world_bounds(mut self, world_bounds: AABB) -> Self {
        self.world_bounds = world_bounds;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.world_bounds.size();
        if !self.world_bounds.is_valid() || !size.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(ConfigError::Validation(
                "octree.world_bounds must be a finite box with positive size".into(),
            ));
        }
        if self.max_entities_per_node == 0 {
            return Err(ConfigError::Validation(
                "octree.max_entities_per_node must be at least 1".into(),
            ));
        }
        if !(self.min_node_size.is_finite() && self.min_node_size > 0.0) {
            return Err(ConfigError::Validation(
                "octree.min_node_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Boxes stored in this node (leaves only)
    pub entries: Vec<(BodyHandle, AABB)>,

    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: None,
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Bounds of octant `index`
    ///
    /// Bit 0 selects +X, bit 1 +Y, bit 2 +Z.
    fn octant_bounds(&self, index: usize) -> AABB {
        let center = self.bounds.center();
        let quarter = self.bounds.half_extents() * 0.5;
        let sign = |bit: usize| if index & bit != 0 { 1.0 } else { -1.0 };
        let child_center = Vec3::new(
            center.x + quarter.x * sign(1),
            center.y + quarter.y * sign(2),
            center.z + quarter.z * sign(4),
        );
        AABB::from_center_half_extents(child_center, quarter)
    }

    fn subdivide(&mut self) {
        let depth = self.depth + 1;
        let mut children: [OctreeNode; 8] =
            std::array::from_fn(|index| OctreeNode::new(self.octant_bounds(index), depth));

        for (handle, aabb) in std::mem::take(&mut self.entries) {
            for child in children.iter_mut() {
                if child.bounds.intersects(&aabb) {
                    child.entries.push((handle, aabb));
                }
            }
        }
        self.children = Some(Box::new(children));
    }

    /// Whether splitting would separate anything: false when every entry
    /// overlaps all eight octants
    fn split_helps(&self) -> bool {
        let center = self.bounds.center();
        self.entries.iter().any(|(_, aabb)| {
            (0..3).any(|axis| aabb.min[axis] > center[axis] || aabb.max[axis] < center[axis])
        })
    }

    /// Insert a box into every leaf it overlaps
    pub fn insert(&mut self, handle: BodyHandle, aabb: AABB, config: &OctreeConfig) {
        if !self.bounds.intersects(&aabb) {
            return;
        }

        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                child.insert(handle, aabb, config);
            }
            return;
        }

        self.entries.push((handle, aabb));

        let should_subdivide = self.entries.len() > config.max_entities_per_node
            && self.depth < config.max_depth
            && self.bounds.half_extents().x > config.min_node_size
            && self.split_helps();
        if should_subdivide {
            self.subdivide();
        }
    }

    /// Remove a box from every leaf it overlaps; true if any copy was found
    ///
    /// Octants left holding at most `max_entities_per_node` distinct boxes
    /// between them are merged back into their parent.
    pub fn remove(&mut self, handle: BodyHandle, aabb: &AABB, config: &OctreeConfig) -> bool {
        if !self.bounds.intersects(aabb) {
            return false;
        }

        let Some(children) = self.children.as_mut() else {
            let before = self.entries.len();
            self.entries.retain(|(existing, _)| *existing != handle);
            return self.entries.len() != before;
        };
        let found = children
            .iter_mut()
            .fold(false, |found, child| child.remove(handle, aabb, config) | found);
        if found {
            self.collapse(config.max_entities_per_node);
        }
        found
    }

    /// Turn this node back into a leaf if its children are leaves that fit
    fn collapse(&mut self, capacity: usize) {
        let Some(children) = self.children.as_ref() else {
            return;
        };
        if !children.iter().all(OctreeNode::is_leaf) {
            return;
        }

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for (handle, aabb) in children.iter().flat_map(|child| child.entries.iter()) {
            if seen.insert(*handle) {
                if merged.len() == capacity {
                    return;
                }
                merged.push((*handle, *aabb));
            }
        }
        self.entries = merged;
        self.children = None;
    }

    /// Get all leaf nodes
    pub fn leaves<'a>(&'a self, leaves: &mut Vec<&'a OctreeNode>) {
        match self.children.as_ref() {
            None => leaves.push(self),
            Some(children) => {
                for child in children.iter() {
                    child.leaves(leaves);
                }
            }
        }
    }

    /// Count this node and every descendant
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |children| children.iter().map(OctreeNode::node_count).sum())
    }
}

/// Octree broad phase
#[derive(Debug, Clone)]
pub struct Octree {
    config: OctreeConfig,
    root: OctreeNode,
    entries: HashMap<BodyHandle, AABB>,
    overflow: Vec<BodyHandle>,
}

impl Octree {
    /// Create an empty octree over `config.world_bounds`
    pub fn new(config: OctreeConfig) -> Self {
        let root = OctreeNode::new(config.world_bounds, 0);
        Self {
            config,
            root,
            entries: HashMap::new(),
            overflow: Vec::new(),
        }
    }

    /// Root node
    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Bodies reaching outside the world bounds
    pub fn overflow_count(&self) -> usize {
        self.overflow.len()
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    fn place(&mut self, handle: BodyHandle, aabb: AABB) {
        if !aabb.is_valid() {
            return;
        }
        if self.config.world_bounds.contains_aabb(&aabb) {
            self.root.insert(handle, aabb, &self.config);
        } else {
            log::trace!("octree: body outside world bounds goes to overflow");
            self.overflow.push(handle);
        }
    }

    fn unplace(&mut self, handle: BodyHandle, aabb: &AABB) {
        if let Some(index) = self.overflow.iter().position(|existing| *existing == handle) {
            self.overflow.swap_remove(index);
        } else if aabb.is_valid() {
            self.root.remove(handle, aabb, &self.config);
        }
    }
}

impl BroadPhase for Octree {
    fn insert(&mut self, handle: BodyHandle, aabb: AABB) {
        if let Some(previous) = self.entries.insert(handle, aabb) {
            self.unplace(handle, &previous);
        }
        self.place(handle, aabb);
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        match self.entries.remove(&handle) {
            Some(previous) => {
                self.unplace(handle, &previous);
                true
            }
            None => false,
        }
    }

    fn rebuild(&mut self) {
        self.root = OctreeNode::new(self.config.world_bounds, 0);
        self.overflow.clear();

        let mut sorted: Vec<(BodyHandle, AABB)> =
            self.entries.iter().map(|(handle, aabb)| (*handle, *aabb)).collect();
        sorted.sort_unstable_by_key(|(handle, _)| *handle);
        for (handle, aabb) in sorted {
            self.place(handle, aabb);
        }
        log::trace!("octree: rebuilt with {} nodes", self.node_count());
    }

    fn query_pairs(&mut self) -> Vec<CollisionPair> {
        let mut pairs = HashSet::new();

        let mut leaves = Vec::new();
        self.root.leaves(&mut leaves);
        for leaf in leaves {
            overlapping_pairs_among(&leaf.entries, &mut pairs);
        }

        for handle in &self.overflow {
            let Some(aabb) = self.entries.get(handle) else {
                continue;
            };
            for (other, other_aabb) in &self.entries {
                if other != handle && aabb.intersects(other_aabb) {
                    pairs.insert(CollisionPair::new(*handle, *other));
                }
            }
        }

        into_sorted(pairs)
    }

    fn clear(&mut self) {
        self.root = OctreeNode::new(self.config.world_bounds, 0);
        self.entries.clear();
        self.overflow.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
