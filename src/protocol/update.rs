//! Update messages exchanged between server and clients
//!
//! Every optional field follows partial-update rules: present means "set to
//! this value", absent means "unchanged". Serialization skips `None` so the
//! distinction survives the wire.

use serde::{Deserialize, Serialize};

use crate::core::constants::QUIT_SENTINEL_ID;
use crate::core::types::{PlayerId, TeamId, UnitId, UpdateId};
use crate::entity::player::{Player, PlayerKind, Team};
use crate::entity::unit::PartialUnitStats;
use crate::map::hex::HexCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinState {
    #[default]
    InProgress,
    Won,
    Draw,
}

/// Result of a strike, attached to the target's update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackInfo {
    pub was_critical: bool,
    pub damage: i32,
}

/// What a unit did (or, from a client, wants to do)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitAction {
    /// Walk along `path`; the first tile is the unit's current position
    Move { path: Vec<HexCoord> },
    Attack {
        #[serde(default)]
        targets: Vec<UnitId>,
    },
    Spell,
    Summon,
    Pass,
    /// Full authoritative description of a unit; server only
    CanonicalState { template: String, owner: PlayerId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitUpdate {
    pub unit: UnitId,
    pub action: UnitAction,
    #[serde(default, skip_serializing_if = "PartialUnitStats::is_empty")]
    pub stats: PartialUnitStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_info: Option<AttackInfo>,
}

impl UnitUpdate {
    pub fn new(unit: UnitId, action: UnitAction) -> Self {
        Self {
            unit,
            action,
            stats: PartialUnitStats::default(),
            attack_info: None,
        }
    }

    pub fn movement(unit: UnitId, path: Vec<HexCoord>) -> Self {
        Self::new(unit, UnitAction::Move { path })
    }

    pub fn attack(unit: UnitId, targets: Vec<UnitId>) -> Self {
        Self::new(unit, UnitAction::Attack { targets })
    }

    pub fn pass(unit: UnitId) -> Self {
        Self::new(unit, UnitAction::Pass)
    }

    pub fn with_stats(mut self, stats: PartialUnitStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_attack_info(mut self, info: AttackInfo) -> Self {
        self.attack_info = Some(info);
        self
    }
}

/// Player fields to change; a player not yet known needs `name` and `team`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PlayerKind>,
}

impl PlayerUpdate {
    /// Every field present
    pub fn full(player: &Player) -> Self {
        Self {
            id: player.id,
            name: Some(player.name.clone()),
            team: Some(player.team),
            kind: Some(player.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: UpdateId,
    #[serde(default)]
    pub end_turn: bool,
    #[serde(default)]
    pub game_start: bool,
    #[serde(default)]
    pub quit: bool,
    /// Replaces the receiver's roster, players and teams wholesale
    #[serde(default)]
    pub snapshot: bool,
    #[serde(default)]
    pub win_state: WinState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_team: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<Team>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub players: Vec<PlayerUpdate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<UnitUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative_counter: Option<f32>,
    /// First reason a sub-action of the batch was refused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Update {
    pub fn new(id: UpdateId) -> Self {
        Self {
            id,
            end_turn: false,
            game_start: false,
            quit: false,
            snapshot: false,
            win_state: WinState::InProgress,
            winning_team: None,
            teams: Vec::new(),
            players: Vec::new(),
            units: Vec::new(),
            initiative_counter: None,
            failure: None,
        }
    }

    /// Stops the receiving peer's loop without touching sequencing
    pub fn quit_sentinel() -> Self {
        Self {
            quit: true,
            ..Self::new(QUIT_SENTINEL_ID)
        }
    }

    pub fn is_quit_sentinel(&self) -> bool {
        self.quit && self.id == QUIT_SENTINEL_ID
    }

    /// Nothing follows this update
    pub fn is_terminal(&self) -> bool {
        self.quit || self.win_state != WinState::InProgress
    }

    pub fn push_unit(&mut self, update: UnitUpdate) {
        self.units.push(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_stats_are_not_serialized() {
        let update = UnitUpdate::pass(UnitId::new());
        let value = serde_json::to_value(&update).unwrap();
        assert!(value.get("stats").is_none());
        assert!(value.get("attack_info").is_none());
        assert_eq!(value["action"]["kind"], "pass");
    }

    #[test]
    fn test_zero_is_distinct_from_absent() {
        let stats = PartialUnitStats {
            move_points: Some(0.0),
            ..Default::default()
        };
        let update = UnitUpdate::movement(UnitId::new(), vec![HexCoord::new(1, 2)]).with_stats(stats);
        let text = serde_json::to_string(&update).unwrap();
        let back: UnitUpdate = serde_json::from_str(&text).unwrap();
        assert_eq!(back.stats.move_points, Some(0.0));
        assert_eq!(back.stats.health, None);
    }

    #[test]
    fn test_hex_coords_are_two_integers() {
        let update = UnitUpdate::movement(UnitId::new(), vec![HexCoord::new(3, -1)]);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["action"]["path"][0], json!({ "x": 3, "y": -1 }));
    }

    #[test]
    fn test_minimal_update_parses() {
        let update: Update = serde_json::from_value(json!({ "id": 4 })).unwrap();
        assert_eq!(update.id, 4);
        assert_eq!(update.win_state, WinState::InProgress);
        assert!(update.units.is_empty());
        assert!(!update.is_terminal());
    }

    #[test]
    fn test_quit_sentinel() {
        let quit = Update::quit_sentinel();
        assert!(quit.is_quit_sentinel());
        assert!(quit.is_terminal());
        assert!(!Update::new(QUIT_SENTINEL_ID).is_quit_sentinel());
    }

    #[test]
    fn test_decided_game_is_terminal() {
        let mut update = Update::new(9);
        update.win_state = WinState::Draw;
        assert!(update.is_terminal());
    }

    #[test]
    fn test_action_kinds_use_snake_case() {
        let update = UnitUpdate::new(
            UnitId::new(),
            UnitAction::CanonicalState {
                template: "archer".into(),
                owner: PlayerId::new(),
            },
        );
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["action"]["kind"], "canonical_state");
        assert_eq!(value["action"]["template"], "archer");
    }
}
