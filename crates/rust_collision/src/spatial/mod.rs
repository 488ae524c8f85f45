//! Broad-phase spatial indexing
//!
//! Every strategy stores one AABB per body and reports the pairs whose boxes
//! overlap. They differ only in how they avoid testing every pair:
//!
//! - [`Bvh`]: bounding volume hierarchy rebuilt from scratch when stale
//! - [`Octree`]: fixed world region split into octants on demand
//! - [`UniformGrid`]: hashed cells of a fixed size
//! - [`SweepAndPrune`]: sorted interval endpoints along one axis
//! - [`BruteForce`]: every pair, used as the reference result

mod brute_force;
mod bvh;
mod octree;
mod spatial_index;
mod sweep_and_prune;
mod uniform_grid;

pub use brute_force::BruteForce;
pub use bvh::{Bvh, BvhConfig};
pub use octree::{Octree, OctreeConfig, OctreeNode};
pub use spatial_index::{BroadPhase, BroadPhaseConfig, BroadPhaseKind, SpatialIndex};
pub use sweep_and_prune::{SweepAndPrune, SweepAndPruneConfig, SweepAxis};
pub use uniform_grid::{CellCoord, UniformGrid, UniformGridConfig};
