//! Units: mutable combat state on top of a shared creature template

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerId, UnitId};
use crate::entity::creature::CreatureTemplate;
use crate::map::hex::HexCoord;

/// A unit on the map
#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    /// Owning player, resolved through the game state's player map
    pub owner: PlayerId,
    pub position: HexCoord,

    // Combat stats
    pub health: i32,
    pub attack: i32,
    pub armour: i32,
    pub range: i32,
    pub critical_strike_chance: f32,

    // Per-turn budget
    pub move_points: f32,
    pub attacks_remaining: i32,

    /// Turn clock; lowest acts next
    pub initiative: f32,

    pub template: Arc<CreatureTemplate>,
}

impl Unit {
    /// Fresh unit with full stats from its template
    pub fn spawn(template: Arc<CreatureTemplate>, owner: PlayerId, position: HexCoord) -> Self {
        Self::with_id(UnitId::new(), template, owner, position)
    }

    /// Like `spawn`, with a known id (replicas rebuilding a unit)
    pub fn with_id(
        id: UnitId,
        template: Arc<CreatureTemplate>,
        owner: PlayerId,
        position: HexCoord,
    ) -> Self {
        Self {
            id,
            owner,
            position,
            health: template.health,
            attack: template.attack,
            armour: template.armour,
            range: template.range,
            critical_strike_chance: template.critical_strike_chance,
            move_points: template.movement,
            attacks_remaining: template.attacks_per_turn,
            initiative: template.initiative_step(),
            template,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    pub fn set_health(&mut self, health: i32) {
        self.health = health;
    }

    pub fn set_move_points(&mut self, move_points: f32) {
        self.move_points = move_points.max(0.0);
    }

    /// Use up one attack; never goes below zero
    pub fn dec_attacks_this_turn(&mut self) {
        self.attacks_remaining = (self.attacks_remaining - 1).max(0);
    }

    /// Reset the per-turn budget and advance the turn clock
    pub fn complete_turn(&mut self) {
        self.move_points = self.template.movement;
        self.attacks_remaining = self.template.attacks_per_turn;
        self.initiative += self.template.initiative_step();
    }

    /// Every stat, for canonical snapshots
    pub fn full_stats(&self) -> PartialUnitStats {
        PartialUnitStats {
            position: Some(self.position),
            health: Some(self.health),
            attack: Some(self.attack),
            armour: Some(self.armour),
            range: Some(self.range),
            critical_strike_chance: Some(self.critical_strike_chance),
            move_points: Some(self.move_points),
            attacks_remaining: Some(self.attacks_remaining),
            initiative: Some(self.initiative),
        }
    }

    /// Overwrite the stats that are present; absent ones stay as they are
    pub fn apply_stats(&mut self, stats: &PartialUnitStats) {
        if let Some(position) = stats.position {
            self.position = position;
        }
        if let Some(health) = stats.health {
            self.health = health;
        }
        if let Some(attack) = stats.attack {
            self.attack = attack;
        }
        if let Some(armour) = stats.armour {
            self.armour = armour;
        }
        if let Some(range) = stats.range {
            self.range = range;
        }
        if let Some(chance) = stats.critical_strike_chance {
            self.critical_strike_chance = chance;
        }
        if let Some(move_points) = stats.move_points {
            self.move_points = move_points;
        }
        if let Some(attacks) = stats.attacks_remaining {
            self.attacks_remaining = attacks;
        }
        if let Some(initiative) = stats.initiative {
            self.initiative = initiative;
        }
    }
}

/// Stat changes carried by an update: present means "set", absent means
/// "unchanged"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialUnitStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<HexCoord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armour: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_strike_chance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_points: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attacks_remaining: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative: Option<f32>,
}

impl PartialUnitStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Arc<CreatureTemplate> {
        Arc::new(CreatureTemplate {
            id: "pikeman".into(),
            name: "Pikeman".into(),
            health: 15,
            attack: 5,
            armour: 2,
            movement: 3.0,
            initiative_rating: 10.0,
            range: 1,
            critical_strike_chance: 0.0,
            attacks_per_turn: 2,
        })
    }

    #[test]
    fn test_spawn_copies_template() {
        let unit = Unit::spawn(template(), PlayerId::new(), HexCoord::new(2, 3));
        assert_eq!(unit.health, 15);
        assert_eq!(unit.move_points, 3.0);
        assert_eq!(unit.attacks_remaining, 2);
        assert_eq!(unit.initiative, 10.0);
        assert_eq!(unit.position, HexCoord::new(2, 3));
    }

    #[test]
    fn test_dec_attacks_never_negative() {
        let mut unit = Unit::spawn(template(), PlayerId::new(), HexCoord::default());
        unit.dec_attacks_this_turn();
        unit.dec_attacks_this_turn();
        unit.dec_attacks_this_turn();
        assert_eq!(unit.attacks_remaining, 0);
    }

    #[test]
    fn test_complete_turn_resets_and_advances() {
        let mut unit = Unit::spawn(template(), PlayerId::new(), HexCoord::default());
        unit.move_points = 0.0;
        unit.attacks_remaining = 0;
        unit.complete_turn();
        assert_eq!(unit.move_points, 3.0);
        assert_eq!(unit.attacks_remaining, 2);
        assert_eq!(unit.initiative, 20.0);
    }

    #[test]
    fn test_partial_stats_only_touch_present_fields() {
        let mut unit = Unit::spawn(template(), PlayerId::new(), HexCoord::default());
        unit.apply_stats(&PartialUnitStats {
            health: Some(4),
            ..Default::default()
        });
        assert_eq!(unit.health, 4);
        assert_eq!(unit.attack, 5);
        assert_eq!(unit.move_points, 3.0);
    }

    #[test]
    fn test_present_zero_is_not_absent() {
        let stats = PartialUnitStats {
            move_points: Some(0.0),
            ..Default::default()
        };
        assert!(!stats.is_empty());
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"move_points":0.0}"#);
        let empty: PartialUnitStats = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_full_stats_roundtrip_onto_fresh_unit() {
        let mut a = Unit::spawn(template(), PlayerId::new(), HexCoord::new(1, 1));
        a.health = 7;
        a.initiative = 42.0;
        let mut b = Unit::with_id(a.id, template(), a.owner, HexCoord::default());
        b.apply_stats(&a.full_stats());
        assert_eq!(b.position, a.position);
        assert_eq!(b.health, 7);
        assert_eq!(b.initiative, 42.0);
    }
}
