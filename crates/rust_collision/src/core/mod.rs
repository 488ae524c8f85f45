//! # Core Module
//!
//! Shared configuration that ties the collision subsystems together.

pub mod config;

pub use config::{CollisionConfig, Config, ConfigError};
