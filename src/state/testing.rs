//! Shared fixtures for unit tests

use std::sync::Arc;

use crate::core::config::GameConfig;
use crate::core::types::UnitId;
use crate::entity::creature::{CreatureRegistry, CreatureTemplate};
use crate::entity::player::PlayerKind;
use crate::map::hex::HexCoord;
use crate::map::logical_map::LogicalMap;
use crate::map::tile::Tile;
use crate::state::game_state::GameState;

/// Empty state on an all-grass map with the builtin creatures
pub(crate) fn grass_state(width: i32, height: i32) -> GameState {
    let map = LogicalMap::filled(width, height, Arc::new(Tile::new("grass", "Grass", 1.0, 0.0)))
        .expect("valid map");
    let creatures = CreatureRegistry::builtin().expect("builtin creatures");
    GameState::new(Arc::new(map), Arc::new(creatures), GameConfig::default())
}

/// Two swordsmen on opposing teams on a 12x12 grass map
///
/// Returns `(state, active unit, enemy unit)`.
pub(crate) fn duel_state(mover: HexCoord, enemy: HexCoord) -> (GameState, UnitId, UnitId) {
    let mut state = grass_state(12, 12);
    let red = state.add_team("Red");
    let blue = state.add_team("Blue");
    let ann = state.add_player("Ann", red, PlayerKind::Human).expect("team exists");
    let bob = state.add_player("Bob", blue, PlayerKind::Ai).expect("team exists");
    let a = state.spawn("swordsman", ann, mover).expect("free tile");
    let b = state.spawn("swordsman", bob, enemy).expect("free tile");
    (state, a, b)
}

/// A template with fixed stats and no randomness
pub(crate) fn brawler(attack: i32, armour: i32, range: i32) -> CreatureTemplate {
    CreatureTemplate {
        id: format!("brawler_{}_{}_{}", attack, armour, range),
        name: "Brawler".into(),
        health: 10,
        attack,
        armour,
        movement: 3.0,
        initiative_rating: 10.0,
        range,
        critical_strike_chance: 0.0,
        attacks_per_turn: 1,
    }
}
