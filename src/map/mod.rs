//! Logical hex map: coordinates, tile types and the tile grid

pub mod hex;
pub mod logical_map;
pub mod tile;

pub use hex::{HexCoord, HexDirection};
pub use logical_map::LogicalMap;
pub use tile::{Tile, TileRegistry};
