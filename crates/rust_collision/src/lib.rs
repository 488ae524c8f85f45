//! # Rust Collision
//!
//! A two-phase 3D collision detection pipeline.
//!
//! ## Features
//!
//! - **Pluggable Broad Phase**: BVH, octree, uniform grid and sweep-and-prune
//!   behind one interface, switchable at runtime
//! - **Exact Narrow Phase**: GJK with EPA contacts for convex hulls and convex
//!   decompositions, SAT for oriented boxes
//! - **Collision Events**: enter / stay / exit per body pair, drained by the
//!   client or dispatched to registered handlers
//! - **Layer Filtering**: bitflag layers and masks
//! - **File Configuration**: TOML or RON, validated on load
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_collision::prelude::*;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = CollisionConfig::default().with_broad_phase(BroadPhaseKind::SweepAndPrune);
//!     let mut manager = CollisionManager::from_config(config)?;
//!
//!     let player = manager.register_body(Body::new("player", CollisionShape::default()));
//!     let crate_box = manager.register_body(
//!         Body::new("crate", CollisionShape::cuboid(Vec3::new(1.0, 0.5, 0.5)))
//!             .with_position(Vec3::new(1.2, 0.0, 0.0)),
//!     );
//!
//!     manager.update();
//!     for event in manager.drain_events() {
//!         println!("{:?}: {:?} touches {:?}", event.kind, event.body, event.info.other);
//!     }
//!
//!     if let Some(body) = manager.body_mut(player) {
//!         body.translate(Vec3::new(-5.0, 0.0, 0.0));
//!     }
//!     manager.update();
//!     assert!(!manager.is_colliding(crate_box));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared configuration
pub mod config;
pub mod core;

pub mod events;
pub mod foundation;
pub mod geometry;
pub mod physics;
pub mod spatial;

/// Common imports for collision users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::CollisionConfig,
        events::{CollisionEvent, CollisionEventKind, CollisionInfo},
        foundation::math::{Quat, Transform, Vec3},
        geometry::{AABB, OBB},
        physics::{
            Body, BodyHandle, CollisionLayers, CollisionManager, CollisionPair, CollisionShape,
            Contact, ConvexHull, FrameStats, NarrowPhaseAlgorithm,
        },
        spatial::{BroadPhase, BroadPhaseKind},
    };
}
