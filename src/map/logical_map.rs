//! Rectangular logical map of tiles
//!
//! Tiles are stored row-major. Coordinates outside
//! `[origin, origin + (width, height))` have no tile.

use std::sync::Arc;

use crate::core::error::{Result, TacticsError};
use crate::map::hex::HexCoord;
use crate::map::tile::{Tile, TileRegistry};

#[derive(Debug, Clone)]
pub struct LogicalMap {
    pub width: i32,
    pub height: i32,
    pub origin: HexCoord,
    tiles: Vec<Arc<Tile>>,
}

impl LogicalMap {
    /// Build a map from row-major tiles; `tiles.len()` must be `width * height`
    pub fn new(width: i32, height: i32, origin: HexCoord, tiles: Vec<Arc<Tile>>) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(TacticsError::Config(format!(
                "map dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if tiles.len() != (width * height) as usize {
            return Err(TacticsError::Config(format!(
                "map of {}x{} needs {} tiles, got {}",
                width,
                height,
                width * height,
                tiles.len()
            )));
        }
        Ok(Self {
            width,
            height,
            origin,
            tiles,
        })
    }

    /// Map of one tile type with its origin at (0, 0)
    pub fn filled(width: i32, height: i32, tile: Arc<Tile>) -> Result<Self> {
        let count = (width.max(0) * height.max(0)) as usize;
        Self::new(width, height, HexCoord::default(), vec![tile; count])
    }

    /// Parse a layout of whitespace-separated tile ids, one row per line
    pub fn from_layout(registry: &TileRegistry, layout: &str, origin: HexCoord) -> Result<Self> {
        let mut tiles = Vec::new();
        let mut width = None;
        let mut height = 0;

        for line in layout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let row = line
                .split_whitespace()
                .map(|id| registry.require(id))
                .collect::<Result<Vec<_>>>()?;

            match width {
                None => width = Some(row.len() as i32),
                Some(w) if w != row.len() as i32 => {
                    return Err(TacticsError::Config(format!(
                        "layout row {} has {} tiles, expected {}",
                        height,
                        row.len(),
                        w
                    )));
                }
                Some(_) => {}
            }

            tiles.extend(row);
            height += 1;
        }

        Self::new(width.unwrap_or(0), height, origin, tiles)
    }

    /// Check if coordinate is within map bounds
    pub fn in_bounds(&self, coord: HexCoord) -> bool {
        coord.x >= self.origin.x
            && coord.y >= self.origin.y
            && coord.x < self.origin.x + self.width
            && coord.y < self.origin.y + self.height
    }

    fn index(&self, coord: HexCoord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        let col = coord.x - self.origin.x;
        let row = coord.y - self.origin.y;
        Some((row * self.width + col) as usize)
    }

    /// Tile at a coordinate, `None` off the map
    pub fn get(&self, coord: HexCoord) -> Option<&Tile> {
        self.index(coord).map(|i| self.tiles[i].as_ref())
    }

    /// Movement cost to enter a coordinate, `None` off the map
    pub fn movement_cost(&self, coord: HexCoord) -> Option<f32> {
        self.get(coord).map(|tile| tile.movement_cost)
    }

    /// Replace the tile at a coordinate
    pub fn set_tile(&mut self, coord: HexCoord, tile: Arc<Tile>) -> Result<()> {
        let index = self.index(coord).ok_or(TacticsError::OutOfBounds(coord))?;
        self.tiles[index] = tile;
        Ok(())
    }

    /// Cheapest tile on the map
    pub fn min_movement_cost(&self) -> f32 {
        self.tiles
            .iter()
            .map(|t| t.movement_cost)
            .fold(f32::INFINITY, f32::min)
    }

    /// All coordinates, row by row
    pub fn coords(&self) -> impl Iterator<Item = HexCoord> + '_ {
        (0..self.height).flat_map(move |row| {
            (0..self.width)
                .map(move |col| HexCoord::new(self.origin.x + col, self.origin.y + row))
        })
    }
}
