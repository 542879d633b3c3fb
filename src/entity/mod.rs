//! Game entities: creature templates, units, players and teams

pub mod creature;
pub mod player;
pub mod unit;

pub use creature::{CreatureRegistry, CreatureTemplate};
pub use player::{Player, PlayerKind, Team};
pub use unit::{PartialUnitStats, Unit};
