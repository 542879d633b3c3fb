//! Move and attack legality checks
//!
//! `check_*` functions never mutate. A refusal comes back as
//! `TacticsError::Rejected`; any other error means the state itself is
//! inconsistent (unknown unit, owner or team).

use ahash::AHashSet;

use crate::core::error::{ActionError, Result, TacticsError};
use crate::core::types::UnitId;
use crate::entity::unit::Unit;
use crate::map::hex::HexCoord;
use crate::state::game_state::GameState;

/// Where the enemies of a unit stand and which tiles they control
#[derive(Debug, Clone, Default)]
pub struct ThreatMap {
    pub enemies: AHashSet<HexCoord>,
    pub friends: AHashSet<HexCoord>,
    pub zoc: AHashSet<HexCoord>,
}

impl GameState {
    /// Enemy, friendly and zone-of-control tiles as seen by `unit`
    pub fn threat_map(&self, unit: &Unit) -> Result<ThreatMap> {
        let team = self.team_of(unit)?;
        let mut threats = ThreatMap::default();
        for other in self.units.iter().filter(|u| u.id != unit.id) {
            if self.team_of(other)? == team {
                threats.friends.insert(other.position);
            } else {
                threats.enemies.insert(other.position);
            }
        }
        threats.zoc = threats
            .enemies
            .iter()
            .flat_map(|pos| pos.neighbors())
            .filter(|pos| !threats.enemies.contains(pos))
            .collect();
        Ok(threats)
    }

    /// Cost of moving `unit_id` along `path`, if the move is legal
    ///
    /// `path[0]` must be the unit's own tile and is free. Enemy and ZoC tiles
    /// may not be passed through; a ZoC tile may only end the path. The last
    /// tile must be empty.
    pub fn check_move(&self, unit_id: UnitId, path: &[HexCoord]) -> Result<f32> {
        let unit = self.require_unit(unit_id)?;
        if self.current_unit()?.id != unit_id {
            return Err(ActionError::NotActiveUnit(unit_id).into());
        }

        let (start, last) = match (path.first(), path.last()) {
            (Some(start), Some(last)) => (*start, *last),
            _ => return Err(ActionError::EmptyPath.into()),
        };
        if start != unit.position {
            return Err(ActionError::PathStartMismatch(unit.position).into());
        }

        let threats = self.threat_map(unit)?;
        let mut cost = 0.0;

        for (index, &tile) in path.iter().enumerate() {
            let terminal = index == path.len() - 1;

            if index > 0 {
                if !path[index - 1].is_adjacent(&tile) {
                    return Err(ActionError::PathNotContiguous(tile).into());
                }
                cost += self
                    .map
                    .movement_cost(tile)
                    .ok_or(ActionError::OffMap(tile))?;
            }

            if threats.enemies.contains(&tile) {
                return Err(if terminal {
                    ActionError::DestinationOccupied(tile)
                } else {
                    ActionError::PathBlocked(tile)
                }
                .into());
            }
            if !terminal && threats.zoc.contains(&tile) {
                return Err(ActionError::ZoneOfControl(tile).into());
            }
        }

        if path.len() > 1 && threats.friends.contains(&last) {
            return Err(ActionError::DestinationOccupied(last).into());
        }

        if cost > unit.move_points + self.config.move_epsilon {
            return Err(ActionError::NotEnoughMovement {
                required: cost,
                available: unit.move_points,
            }
            .into());
        }

        Ok(cost)
    }

    /// Check and perform a move; returns the unit's remaining move points
    ///
    /// Nothing changes unless the whole path is legal.
    pub fn validate_move(&mut self, unit_id: UnitId, path: &[HexCoord]) -> Result<f32> {
        let cost = self.check_move(unit_id, path)?;
        let epsilon = self.config.move_epsilon;
        let destination = path[path.len() - 1];

        let unit = self
            .unit_mut(unit_id)
            .ok_or(TacticsError::UnitNotFound(unit_id))?;
        let mut remaining = unit.move_points - cost;
        if remaining < epsilon {
            remaining = 0.0;
        }
        unit.set_move_points(remaining);
        unit.position = destination;

        tracing::debug!(unit = ?unit_id, ?destination, cost, remaining, "unit moved");
        Ok(remaining)
    }

    /// Whether `aggressor` may strike `target` from where they stand
    ///
    /// Ranged attacks need a clear line: any unit on an intervening tile
    /// blocks the shot.
    pub fn check_attack(&self, aggressor: &Unit, target: &Unit) -> Result<()> {
        if aggressor.id == target.id {
            return Err(ActionError::SelfTarget.into());
        }
        if self.team_of(aggressor)? == self.team_of(target)? {
            return Err(ActionError::FriendlyTarget(target.id).into());
        }

        let distance = aggressor.position.distance(&target.position);
        if distance > aggressor.range {
            return Err(ActionError::OutOfRange {
                distance,
                range: aggressor.range,
            }
            .into());
        }

        if aggressor.range > 1 {
            let line = aggressor.position.line_to(&target.position);
            let inner = line.iter().skip(1).take(line.len().saturating_sub(2));
            for &tile in inner {
                if self.unit_at(tile).is_some() {
                    return Err(ActionError::LineBlocked(tile).into());
                }
            }
        }

        Ok(())
    }

    pub fn is_attackable(&self, aggressor: &Unit, target: &Unit) -> bool {
        self.check_attack(aggressor, target).is_ok()
    }
}
