//! Attack resolution
//!
//! Legality is checked by the caller (`check_attack`); this only applies
//! the strike.

use rand::Rng;

use crate::core::constants::CRITICAL_MULTIPLIER;
use crate::core::error::{Result, TacticsError};
use crate::core::types::UnitId;
use crate::state::game_state::GameState;

/// What a single call to `combat` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// The aggressor had no attacks left; nothing changed
    NoAttacksRemaining,
    Hit {
        damage: i32,
        /// Only set when the critical actually dealt damage
        was_critical: bool,
        target_health: i32,
        killed: bool,
    },
}

impl AttackOutcome {
    pub fn damage(&self) -> i32 {
        match self {
            AttackOutcome::NoAttacksRemaining => 0,
            AttackOutcome::Hit { damage, .. } => *damage,
        }
    }
}

/// Damage of one strike before armour, critical already rolled
pub fn strike_damage(attack: i32, armour: i32, critical: bool) -> i32 {
    if attack <= armour {
        return 0;
    }
    let multiplier = if critical { CRITICAL_MULTIPLIER } else { 1 };
    (attack - armour) * multiplier
}

impl GameState {
    /// `aggressor` strikes `target` once
    ///
    /// Uses one of the aggressor's attacks whatever the damage. A target left
    /// with no health is removed from the roster straight away.
    pub fn combat(&mut self, aggressor_id: UnitId, target_id: UnitId) -> Result<AttackOutcome> {
        let aggressor = self.require_unit(aggressor_id)?;
        let (attack, chance) = (aggressor.attack, aggressor.critical_strike_chance);
        let armour = self.require_unit(target_id)?.armour;

        if aggressor.attacks_remaining <= 0 {
            tracing::debug!(unit = ?aggressor_id, "attack skipped, none remaining");
            return Ok(AttackOutcome::NoAttacksRemaining);
        }

        // Always drawn so the rng stream does not depend on the stats
        let critical = self.rng.gen::<f32>() < chance;
        let damage = strike_damage(attack, armour, critical);

        self.unit_mut(aggressor_id)
            .ok_or(TacticsError::UnitNotFound(aggressor_id))?
            .dec_attacks_this_turn();

        let target = self
            .unit_mut(target_id)
            .ok_or(TacticsError::UnitNotFound(target_id))?;
        target.set_health(target.health - damage);
        let target_health = target.health;
        let killed = target.is_dead();

        tracing::debug!(
            aggressor = ?aggressor_id,
            target = ?target_id,
            damage,
            critical,
            target_health,
            "attack resolved"
        );

        if killed {
            self.remove_dead();
            tracing::info!(unit = ?target_id, "unit killed");
        }

        Ok(AttackOutcome::Hit {
            damage,
            was_critical: critical && damage > 0,
            target_health,
            killed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::player::PlayerKind;
    use crate::entity::unit::Unit;
    use crate::map::hex::HexCoord;
    use crate::state::testing::{brawler, grass_state};
    use std::sync::Arc;

    /// Two brawlers side by side, returns (state, aggressor, target)
    fn face_off(attack: i32, armour: i32) -> (GameState, UnitId, UnitId) {
        let mut state = grass_state(6, 6);
        let red = state.add_team("Red");
        let blue = state.add_team("Blue");
        let ann = state.add_player("Ann", red, PlayerKind::Human).unwrap();
        let bob = state.add_player("Bob", blue, PlayerKind::Ai).unwrap();
        let a = state
            .add_unit(Unit::spawn(Arc::new(brawler(attack, 0, 1)), ann, HexCoord::new(2, 2)))
            .unwrap();
        let b = state
            .add_unit(Unit::spawn(Arc::new(brawler(1, armour, 1)), bob, HexCoord::new(2, 3)))
            .unwrap();
        (state, a, b)
    }

    #[test]
    fn test_strike_damage() {
        assert_eq!(strike_damage(5, 2, false), 3);
        assert_eq!(strike_damage(5, 2, true), 6);
        assert_eq!(strike_damage(2, 2, true), 0);
        assert_eq!(strike_damage(1, 4, false), 0);
    }

    #[test]
    fn test_deterministic_damage_without_crits() {
        let (mut state, a, b) = face_off(5, 2);
        let outcome = state.combat(a, b).unwrap();
        assert_eq!(
            outcome,
            AttackOutcome::Hit { damage: 3, was_critical: false, target_health: 7, killed: false }
        );
        assert_eq!(state.unit(a).unwrap().attacks_remaining, 0);
        assert_eq!(state.unit(b).unwrap().health, 7);
    }

    #[test]
    fn test_no_attacks_left_is_a_no_op() {
        let (mut state, a, b) = face_off(5, 2);
        state.combat(a, b).unwrap();
        let outcome = state.combat(a, b).unwrap();
        assert_eq!(outcome, AttackOutcome::NoAttacksRemaining);
        assert_eq!(state.unit(a).unwrap().attacks_remaining, 0);
        assert_eq!(state.unit(b).unwrap().health, 7);
    }

    #[test]
    fn test_armour_absorbs_everything() {
        let (mut state, a, b) = face_off(3, 5);
        let outcome = state.combat(a, b).unwrap();
        assert_eq!(outcome.damage(), 0);
        assert_eq!(state.unit(b).unwrap().health, 10);
        // The attack is still used up
        assert_eq!(state.unit(a).unwrap().attacks_remaining, 0);
    }

    #[test]
    fn test_kill_removes_target() {
        let (mut state, a, b) = face_off(15, 0);
        let outcome = state.combat(a, b).unwrap();
        assert!(matches!(outcome, AttackOutcome::Hit { killed: true, target_health: -5, .. }));
        assert!(state.unit(b).is_none());
        assert_eq!(state.units().len(), 1);
    }

    #[test]
    fn test_certain_critical_doubles() {
        let (mut state, a, b) = face_off(5, 2);
        state.unit_mut(a).unwrap().critical_strike_chance = 1.0;
        let outcome = state.combat(a, b).unwrap();
        assert_eq!(
            outcome,
            AttackOutcome::Hit { damage: 6, was_critical: true, target_health: 4, killed: false }
        );
    }

    #[test]
    fn test_same_seed_same_rolls() {
        let roll = || {
            let (mut state, a, b) = face_off(5, 2);
            state.unit_mut(a).unwrap().critical_strike_chance = 0.5;
            state.unit_mut(a).unwrap().attacks_remaining = 3;
            (0..3).map(|_| state.combat(a, b).unwrap()).collect::<Vec<_>>()
        };
        assert_eq!(roll(), roll());
    }

    #[test]
    fn test_unknown_units() {
        let (mut state, a, _) = face_off(5, 2);
        assert!(matches!(
            state.combat(a, UnitId::new()),
            Err(TacticsError::UnitNotFound(_))
        ));
    }
}
