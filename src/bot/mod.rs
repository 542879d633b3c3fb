//! Computer players
//!
//! Bots only see a replica `GameState` and only act through proposals, the
//! same way a human client would.

use ordered_float::OrderedFloat;

use crate::core::error::Result;
use crate::core::types::PlayerId;
use crate::entity::unit::Unit;
use crate::map::hex::HexCoord;
use crate::pathfinding::graph::{build_graph, MovementGraph};
use crate::pathfinding::search::{shortest_distances, shortest_path};
use crate::protocol::update::Update;
use crate::state::game_state::GameState;

/// Something that decides turns for one player
pub trait Controller {
    fn player(&self) -> PlayerId;

    /// Proposal for the active unit, or `None` when it is not this player's
    /// turn (or the game is over)
    fn plan(&mut self, state: &GameState) -> Result<Option<Update>>;
}

/// Walks toward the closest enemy and hits it when it can
///
/// Fully deterministic: ties go to the lowest coordinate.
#[derive(Debug, Clone, Copy)]
pub struct NearestEnemyBot {
    player: PlayerId,
}

impl NearestEnemyBot {
    pub fn new(player: PlayerId) -> Self {
        Self { player }
    }

    fn nearest<'a>(from: HexCoord, units: impl IntoIterator<Item = &'a Unit>) -> Option<&'a Unit> {
        units
            .into_iter()
            .min_by_key(|unit| (from.distance(&unit.position), unit.position))
    }

    /// Attack the closest enemy `unit` can hit from where it stands
    fn pick_target(state: &GameState, unit: &Unit) -> Result<Option<Unit>> {
        let enemies = state.enemies_of(unit)?;
        let target = Self::nearest(
            unit.position,
            enemies.into_iter().filter(|enemy| state.is_attackable(unit, enemy)),
        );
        Ok(target.cloned())
    }

    /// Route toward the free tile next to an enemy that is cheapest to
    /// reach, cut down to what the unit can afford this turn
    ///
    /// Steps dearer than the unit's full allowance are left out, since such
    /// a tile could never be entered. `None` when no step is worth taking.
    fn approach(state: &GameState, unit: &Unit) -> Result<Option<Vec<HexCoord>>> {
        let map = state.map();
        let horizon = map.width.max(map.height) as f32;
        let whole = build_graph(state, unit, horizon)?;

        let mut graph = MovementGraph::new();
        for vertex in whole.vertices() {
            graph.add_vertex(vertex);
            for edge in whole.edges_from(vertex) {
                if edge.cost <= unit.template.movement {
                    graph.add_edge(vertex, edge.to, edge.cost);
                }
            }
        }

        let occupied = |tile: HexCoord| state.unit_at(tile).is_some_and(|other| other.id != unit.id);
        let distances = shortest_distances(&graph, unit.position, f32::INFINITY);
        let goal = state
            .enemies_of(unit)?
            .into_iter()
            .flat_map(|enemy| enemy.position.neighbors())
            .filter(|tile| !occupied(*tile))
            .filter_map(|tile| distances.get(&tile).map(|cost| (OrderedFloat(*cost), tile)))
            .min();
        let Some((_, goal)) = goal else {
            return Ok(None);
        };

        let path = shortest_path(&graph, unit.position, goal);
        let budget = unit.move_points + state.config().move_epsilon;
        let mut spent = 0.0;
        let mut stop = 0;
        for (index, step) in path.windows(2).enumerate() {
            spent += graph.edge_cost(step[0], step[1]).unwrap_or(f32::INFINITY);
            if spent > budget {
                break;
            }
            if !occupied(step[1]) {
                stop = index + 1;
            }
        }

        Ok((stop > 0).then(|| path[..=stop].to_vec()))
    }
}

impl Controller for NearestEnemyBot {
    fn player(&self) -> PlayerId {
        self.player
    }

    fn plan(&mut self, state: &GameState) -> Result<Option<Update>> {
        if state.is_over() {
            return Ok(None);
        }
        let unit = state.current_unit()?;
        if unit.owner != self.player {
            return Ok(None);
        }

        let mut update = state.create_update();

        if let Some(target) = Self::pick_target(state, unit)? {
            tracing::debug!(unit = ?unit.id, target = ?target.id, "bot attacks in place");
            state.unit_attack(&mut update, unit.id, vec![target.id]);
            state.end_turn(&mut update);
            return Ok(Some(update));
        }

        if let Some(path) = Self::approach(state, unit)? {
            // Try the move on a scratch copy to see what is in reach afterwards
            let mut preview = state.clone();
            if preview.validate_move(unit.id, &path).is_ok() {
                tracing::debug!(unit = ?unit.id, destination = ?path[path.len() - 1], steps = path.len() - 1, "bot moves");
                state.unit_move(&mut update, unit.id, path);

                let moved = preview.require_unit(unit.id)?;
                if let Some(target) = Self::pick_target(&preview, moved)? {
                    tracing::debug!(unit = ?unit.id, target = ?target.id, "bot attacks after moving");
                    state.unit_attack(&mut update, unit.id, vec![target.id]);
                }
            }
        }

        state.end_turn(&mut update);
        Ok(Some(update))
    }
}
