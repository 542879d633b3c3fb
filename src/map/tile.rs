//! Tile types and the registry they are interned in
//!
//! Tile types are loaded once and shared by reference; a map stores
//! `Arc<Tile>` handles rather than copies.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TacticsError};

/// A terrain type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: String,
    pub name: String,
    /// Cost to enter a tile of this type (always > 0)
    pub movement_cost: f32,
    #[serde(default)]
    pub height: f32,
}

impl Tile {
    pub fn new(id: &str, name: &str, movement_cost: f32, height: f32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            movement_cost,
            height,
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !(self.movement_cost > 0.0) || !self.movement_cost.is_finite() {
            return Err(format!(
                "tile '{}' has movement_cost {} (must be finite and > 0)",
                self.id, self.movement_cost
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TileFile {
    #[serde(rename = "tile")]
    tiles: Vec<Tile>,
}

/// Registry of tile types indexed by id
#[derive(Debug, Clone, Default)]
pub struct TileRegistry {
    tiles: AHashMap<String, Arc<Tile>>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tile types shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(include_str!("../../data/tiles.toml"))
    }

    /// Parse a `[[tile]]` table array
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TileFile = toml::from_str(content)?;
        let mut registry = Self::new();
        for tile in file.tiles {
            registry.register(tile)?;
        }
        Ok(registry)
    }

    /// Register a tile type, replacing any previous type with the same id
    pub fn register(&mut self, tile: Tile) -> Result<Arc<Tile>> {
        tile.validate().map_err(TacticsError::Config)?;
        let tile = Arc::new(tile);
        self.tiles.insert(tile.id.clone(), Arc::clone(&tile));
        Ok(tile)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Tile>> {
        self.tiles.get(id).cloned()
    }

    /// Like `get`, but a missing id is an error
    pub fn require(&self, id: &str) -> Result<Arc<Tile>> {
        self.get(id)
            .ok_or_else(|| TacticsError::TileNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = TileRegistry::builtin().unwrap();
        let grass = registry.require("grass").unwrap();
        assert_eq!(grass.movement_cost, 1.0);
        assert!(registry.get("forest").unwrap().movement_cost > 1.0);
    }

    #[test]
    fn test_zero_cost_rejected() {
        let err = TileRegistry::from_toml_str(
            "[[tile]]\nid = \"void\"\nname = \"Void\"\nmovement_cost = 0.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, TacticsError::Config(_)));
    }

    #[test]
    fn test_missing_tile_is_error() {
        let registry = TileRegistry::new();
        assert!(matches!(
            registry.require("lava"),
            Err(TacticsError::TileNotFound(_))
        ));
    }

    #[test]
    fn test_height_defaults_to_zero() {
        let registry = TileRegistry::from_toml_str(
            "[[tile]]\nid = \"sand\"\nname = \"Sand\"\nmovement_cost = 1.5\n",
        )
        .unwrap();
        assert_eq!(registry.require("sand").unwrap().height, 0.0);
    }
}
