//! # Collision Pipeline Configuration
//!
//! One serializable structure holding the settings of every stage: broad
//! phase strategy and tuning, narrow phase algorithm, GJK and EPA limits,
//! detection interval and parallelism.
//!
//! ```toml
//! narrow_phase = "Gjk"
//! check_interval = 1
//! parallel_narrow_phase = false
//! parallel_threshold = 64
//!
//! [broad_phase]
//! kind = "Bvh"
//! ```

use serde::{Deserialize, Serialize};

use crate::physics::{EpaConfig, GjkConfig, NarrowPhaseAlgorithm};
use crate::spatial::{BroadPhaseConfig, BroadPhaseKind};

pub use crate::config::{Config, ConfigError};

/// # Complete Collision Configuration
///
/// Missing keys in a config file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Broad-phase strategy and per-strategy settings
    pub broad_phase: BroadPhaseConfig,
    /// Exact test run on broad-phase candidates
    pub narrow_phase: NarrowPhaseAlgorithm,
    /// GJK limits
    pub gjk: GjkConfig,
    /// EPA limits
    pub epa: EpaConfig,
    /// Run detection on every n-th `update` call
    pub check_interval: u32,
    /// Spread the narrow phase over the rayon pool
    pub parallel_narrow_phase: bool,
    /// Minimum candidate count before the narrow phase goes parallel
    pub parallel_threshold: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            broad_phase: BroadPhaseConfig::default(),
            narrow_phase: NarrowPhaseAlgorithm::default(),
            gjk: GjkConfig::default(),
            epa: EpaConfig::default(),
            check_interval: 1,
            parallel_narrow_phase: false,
            parallel_threshold: 64,
        }
    }
}

impl CollisionConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the broad-phase strategy
    #[must_use]
    pub fn with_broad_phase(mut self, kind: BroadPhaseKind) -> Self {
        self.broad_phase.kind = kind;
        self
    }

    /// Replace the whole broad-phase section
    #[must_use]
    pub fn with_broad_phase_config(mut self, broad_phase: BroadPhaseConfig) -> Self {
        self.broad_phase = broad_phase;
        self
    }

    /// Select the narrow-phase algorithm
    #[must_use]
    pub fn with_narrow_phase(mut self, algorithm: NarrowPhaseAlgorithm) -> Self {
        self.narrow_phase = algorithm;
        self
    }

    /// Set GJK limits
    #[must_use]
    pub fn with_gjk(mut self, gjk: GjkConfig) -> Self {
        self.gjk = gjk;
        self
    }

    /// Set EPA limits
    #[must_use]
    pub fn with_epa(mut self, epa: EpaConfig) -> Self {
        self.epa = epa;
        self
    }

    /// Run detection every `interval` updates
    #[must_use]
    pub fn with_check_interval(mut self, interval: u32) -> Self {
        self.check_interval = interval;
        self
    }

    /// Enable the parallel narrow phase above `threshold` candidates
    #[must_use]
    pub fn with_parallel_narrow_phase(mut self, enabled: bool, threshold: usize) -> Self {
        self.parallel_narrow_phase = enabled;
        self.parallel_threshold = threshold;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval == 0 {
            return Err(ConfigError::Validation("check_interval must be at least 1".into()));
        }
        self.broad_phase.validate()?;
        self.gjk.validate()?;
        self.epa.validate()?;
        Ok(())
    }
}

impl Config for CollisionConfig {}
