//! Game configuration with documented constants
//!
//! Tunables are collected here so that server and clients agree on them.
//! Everything that affects validation must be identical on every peer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TacticsError};

/// Configuration for the rules engine and the peer loops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === MOVEMENT ===
    /// Side of the square search region, in tiles per point of movement
    ///
    /// The movement graph covers `ceil(max_cost * factor) + 1` tiles per
    /// side around the mover. Tile costs below 1.0 let a unit cover more
    /// tiles than it has points.
    pub graph_bound_factor: f32,

    /// Tolerance when comparing accumulated path cost against move points
    ///
    /// Remaining move points below this are clamped to exactly zero.
    pub move_epsilon: f32,

    // === COMBAT ===
    /// Seed for the server's critical strike draws
    pub seed: u64,

    // === TRANSPORT ===
    /// Maximum frames buffered per queue before `push` blocks
    pub queue_capacity: usize,

    /// How long a peer waits on its inbox before re-checking its state
    pub receive_timeout_ms: u64,

    /// Consecutive empty polls after which the server gives up on a game
    pub max_idle_polls: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            graph_bound_factor: 4.0,
            move_epsilon: 1e-4,
            seed: 12345,
            queue_capacity: 64,
            receive_timeout_ms: 50,
            max_idle_polls: 200,
        }
    }
}

impl GameConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate().map_err(TacticsError::Config)?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.graph_bound_factor >= 1.0) || !self.graph_bound_factor.is_finite() {
            return Err(format!(
                "graph_bound_factor ({}) must be finite and at least 1.0",
                self.graph_bound_factor
            ));
        }

        if !(0.0..0.5).contains(&self.move_epsilon) {
            return Err(format!(
                "move_epsilon ({}) must be in [0, 0.5)",
                self.move_epsilon
            ));
        }

        if self.queue_capacity == 0 {
            return Err("queue_capacity must be positive".into());
        }

        Ok(())
    }
}
