//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the collision pipeline:
//! - Math types and transforms
//! - Time measurement for per-phase diagnostics
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
