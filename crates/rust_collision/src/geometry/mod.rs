//! Bounding volumes
//!
//! World-space envelopes used for cheap overlap pre-tests: [`AABB`] for every
//! broad phase, [`OBB`] for the separating-axis narrow phase.

mod aabb;
mod obb;

pub use aabb::AABB;
pub use obb::OBB;
