//! Bounding volume hierarchy
//!
//! Nodes live in a flat arena and refer to each other by index. Build and
//! pair query both run over explicit work stacks, so pathological inputs
//! cannot exhaust the call stack.
//!
//! Every mutation marks the tree stale; the next `rebuild` or `query_pairs`
//! rebuilds it from scratch. A frame that moves many bodies therefore pays
//! for one rebuild, not one per body.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::geometry::AABB;
use crate::physics::{BodyHandle, CollisionPair};

use super::spatial_index::{into_sorted, overlapping_pairs_among, BroadPhase};

/// # BVH Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BvhConfig {
    /// Depth at which partitioning stops and a (multi-body) leaf is emitted
    pub max_depth: u32,
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self { max_depth: 20 }
    }
}

impl BvhConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Validation("bvh.max_depth must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    /// Children by arena index
    Internal { left: u32, right: u32 },
    /// Range into the leaf item list
    Leaf { start: u32, count: u32 },
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    aabb: AABB,
    kind: NodeKind,
}

impl BvhNode {
    fn placeholder() -> Self {
        Self {
            aabb: AABB::empty(),
            kind: NodeKind::Leaf { start: 0, count: 0 },
        }
    }
}

struct BuildTask {
    node: u32,
    start: usize,
    end: usize,
    depth: u32,
}

/// Bounding volume hierarchy broad phase
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    config: BvhConfig,
    entries: HashMap<BodyHandle, AABB>,
    nodes: Vec<BvhNode>,
    items: Vec<(BodyHandle, AABB)>,
    depth: u32,
    stale: bool,
}

impl Bvh {
    /// Create an empty hierarchy
    pub fn new(config: BvhConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Number of nodes in the current tree
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf in the current tree (root = 0)
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether a mutation happened since the last build
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    fn build(&mut self) {
        self.nodes.clear();
        self.depth = 0;
        self.stale = false;

        // Empty boxes are never paired; keeping them out also keeps their
        // infinite centers out of the split computation.
        self.items = self
            .entries
            .iter()
            .filter(|(_, aabb)| aabb.is_valid())
            .map(|(handle, aabb)| (*handle, *aabb))
            .collect();
        self.items.sort_unstable_by_key(|(handle, _)| *handle);

        if self.items.is_empty() {
            return;
        }

        self.nodes.push(BvhNode::placeholder());
        let mut stack = vec![BuildTask { node: 0, start: 0, end: self.items.len(), depth: 0 }];

        while let Some(task) = stack.pop() {
            let partition = &mut self.items[task.start..task.end];
            let bounds = partition
                .iter()
                .fold(AABB::empty(), |acc, (_, aabb)| acc.merge(aabb));
            let count = partition.len();

            if count == 1 || task.depth >= self.config.max_depth {
                self.depth = self.depth.max(task.depth);
                self.nodes[task.node as usize] = BvhNode {
                    aabb: bounds,
                    kind: NodeKind::Leaf {
                        start: task.start as u32,
                        count: count as u32,
                    },
                };
                continue;
            }

            let axis = bounds.longest_axis();
            let split = bounds.center()[axis];
            let mut mid = 0;
            for i in 0..count {
                if partition[i].1.center()[axis] < split {
                    partition.swap(i, mid);
                    mid += 1;
                }
            }
            if mid == 0 || mid == count {
                // Every center on one side: split the list in half instead
                mid = count / 2;
            }

            let left = self.nodes.len() as u32;
            self.nodes.push(BvhNode::placeholder());
            let right = self.nodes.len() as u32;
            self.nodes.push(BvhNode::placeholder());
            self.nodes[task.node as usize] = BvhNode {
                aabb: bounds,
                kind: NodeKind::Internal { left, right },
            };

            let split_index = task.start + mid;
            stack.push(BuildTask { node: right, start: split_index, end: task.end, depth: task.depth + 1 });
            stack.push(BuildTask { node: left, start: task.start, end: split_index, depth: task.depth + 1 });
        }

        log::trace!(
            "bvh: rebuilt {} bodies into {} nodes, depth {}",
            self.items.len(),
            self.nodes.len(),
            self.depth
        );
    }

    fn leaf_items(&self, start: u32, count: u32) -> &[(BodyHandle, AABB)] {
        &self.items[start as usize..(start + count) as usize]
    }

    fn collect_pairs(&self) -> HashSet<CollisionPair> {
        let mut pairs = HashSet::new();
        if self.nodes.is_empty() {
            return pairs;
        }

        let mut stack: Vec<(u32, u32)> = vec![(0, 0)];
        while let Some((x, y)) = stack.pop() {
            let node_x = self.nodes[x as usize];
            let node_y = self.nodes[y as usize];
            if !node_x.aabb.intersects(&node_y.aabb) {
                continue;
            }

            match (node_x.kind, node_y.kind) {
                (NodeKind::Leaf { start, count }, NodeKind::Leaf { .. }) if x == y => {
                    overlapping_pairs_among(self.leaf_items(start, count), &mut pairs);
                }
                (
                    NodeKind::Leaf { start: start_x, count: count_x },
                    NodeKind::Leaf { start: start_y, count: count_y },
                ) => {
                    for (handle_a, aabb_a) in self.leaf_items(start_x, count_x) {
                        for (handle_b, aabb_b) in self.leaf_items(start_y, count_y) {
                            if handle_a != handle_b && aabb_a.intersects(aabb_b) {
                                pairs.insert(CollisionPair::new(*handle_a, *handle_b));
                            }
                        }
                    }
                }
                (NodeKind::Leaf { .. }, NodeKind::Internal { left, right }) => {
                    stack.push((x, left));
                    stack.push((x, right));
                }
                (NodeKind::Internal { left, right }, NodeKind::Leaf { .. }) => {
                    stack.push((left, y));
                    stack.push((right, y));
                }
                (NodeKind::Internal { left, right }, NodeKind::Internal { .. }) if x == y => {
                    stack.push((left, left));
                    stack.push((right, right));
                    stack.push((left, right));
                }
                (
                    NodeKind::Internal { left: left_x, right: right_x },
                    NodeKind::Internal { left: left_y, right: right_y },
                ) => {
                    stack.push((left_x, left_y));
                    stack.push((left_x, right_y));
                    stack.push((right_x, left_y));
                    stack.push((right_x, right_y));
                }
            }
        }
        pairs
    }
}

impl BroadPhase for Bvh {
    fn insert(&mut self, handle: BodyHandle, aabb: AABB) {
        self.entries.insert(handle, aabb);
        self.stale = true;
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        let removed = self.entries.remove(&handle).is_some();
        self.stale |= removed;
        removed
    }

    fn update(&mut self, handle: BodyHandle, aabb: AABB) {
        self.insert(handle, aabb);
    }

    fn rebuild(&mut self) {
        self.build();
    }

    fn query_pairs(&mut self) -> Vec<CollisionPair> {
        if self.stale {
            self.build();
        }
        into_sorted(self.collect_pairs())
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.nodes.clear();
        self.items.clear();
        self.depth = 0;
        self.stale = false;
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
