//! Game state: roster, turn order, move/attack rules and combat

pub mod combat;
pub mod game_state;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use combat::{strike_damage, AttackOutcome};
pub use game_state::GameState;
pub use validation::ThreatMap;
