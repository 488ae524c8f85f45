//! Physics module for collision detection
//!
//! Bodies, convex shapes and the narrow-phase algorithms (GJK with EPA, SAT
//! for oriented boxes), tied together by the [`CollisionManager`].

pub mod body;
pub mod collision_layers;
pub mod collision_manager;
pub mod epa;
pub mod gjk;
pub mod narrow_phase;
pub mod pair;
pub mod sat;
pub mod shape;

#[cfg(test)]
mod tests;

pub use body::{Body, HullSupport};
pub use collision_layers::CollisionLayers;
pub use collision_manager::{CollisionManager, FrameStats};
pub use epa::{EpaConfig, Penetration};
pub use gjk::{GjkConfig, GjkResult, GjkSolver, Simplex, SupportMap, SupportPoint};
pub use narrow_phase::{Contact, NarrowPhase, NarrowPhaseAlgorithm};
pub use pair::{BodyHandle, CollisionPair};
pub use shape::{CollisionShape, ConvexHull, ShapePiece};
