//! Movement graph for a single moving unit
//!
//! Vertices are the tiles the mover could stand on or pass through; an edge
//! `a -> b` costs the movement cost of entering `b`. Enemy-occupied tiles are
//! not vertices at all. Tiles adjacent to an enemy (zone of control) are
//! vertices without outgoing edges: a unit may enter one but must stop there.

use std::collections::BTreeSet;

use ahash::{AHashMap, AHashSet};

use crate::core::error::Result;
use crate::entity::unit::Unit;
use crate::map::hex::HexCoord;
use crate::map::logical_map::LogicalMap;
use crate::state::game_state::GameState;

/// Directed, weighted edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: HexCoord,
    pub cost: f32,
}

#[derive(Debug, Clone, Default)]
pub struct MovementGraph {
    edges: AHashMap<HexCoord, Vec<Edge>>,
    friendly: AHashSet<HexCoord>,
    zoc: AHashSet<HexCoord>,
    min_edge_cost: Option<f32>,
}

impl MovementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph over a whole map with no units on it
    pub fn from_map(map: &LogicalMap) -> Self {
        let mut graph = Self::new();
        for coord in map.coords() {
            graph.add_vertex(coord);
            for neighbor in coord.neighbors() {
                if let Some(cost) = map.movement_cost(neighbor) {
                    graph.add_edge(coord, neighbor, cost);
                }
            }
        }
        graph
    }

    pub fn add_vertex(&mut self, coord: HexCoord) {
        self.edges.entry(coord).or_default();
    }

    /// Add an edge; both endpoints become vertices
    pub fn add_edge(&mut self, from: HexCoord, to: HexCoord, cost: f32) {
        self.add_vertex(to);
        self.edges.entry(from).or_default().push(Edge { to, cost });
        self.min_edge_cost = Some(self.min_edge_cost.map_or(cost, |m| m.min(cost)));
    }

    pub fn contains(&self, coord: HexCoord) -> bool {
        self.edges.contains_key(&coord)
    }

    pub fn vertices(&self) -> impl Iterator<Item = HexCoord> + '_ {
        self.edges.keys().copied()
    }

    pub fn vertex_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Outgoing edges of a vertex (empty for unknown or ZoC tiles)
    pub fn edges_from(&self, coord: HexCoord) -> &[Edge] {
        self.edges.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_cost(&self, from: HexCoord, to: HexCoord) -> Option<f32> {
        self.edges_from(from)
            .iter()
            .find(|edge| edge.to == to)
            .map(|edge| edge.cost)
    }

    /// Cheapest edge in the graph; 0 when there are no edges
    pub fn min_edge_cost(&self) -> f32 {
        self.min_edge_cost.unwrap_or(0.0)
    }

    pub fn is_zoc(&self, coord: HexCoord) -> bool {
        self.zoc.contains(&coord)
    }

    pub fn is_friendly_occupied(&self, coord: HexCoord) -> bool {
        self.friendly.contains(&coord)
    }

    /// Drop tiles a unit may pass through but not stop on
    pub fn destinations(&self, reachable: impl IntoIterator<Item = HexCoord>) -> BTreeSet<HexCoord> {
        reachable
            .into_iter()
            .filter(|coord| !self.friendly.contains(coord))
            .collect()
    }
}

/// Inclusive square of tiles clipped to the map
#[derive(Debug, Clone, Copy)]
struct Region {
    min: HexCoord,
    max: HexCoord,
}

impl Region {
    fn around(center: HexCoord, side: i32, map: &LogicalMap) -> Self {
        let half = side / 2;
        let map_max = HexCoord::new(
            map.origin.x + map.width - 1,
            map.origin.y + map.height - 1,
        );
        Self {
            min: HexCoord::new(
                (center.x - half).max(map.origin.x),
                (center.y - half).max(map.origin.y),
            ),
            max: HexCoord::new((center.x + half).min(map_max.x), (center.y + half).min(map_max.y)),
        }
    }

    fn contains(&self, coord: HexCoord) -> bool {
        coord.x >= self.min.x && coord.x <= self.max.x && coord.y >= self.min.y && coord.y <= self.max.y
    }

    fn coords(&self) -> impl Iterator<Item = HexCoord> {
        let Region { min, max } = *self;
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| HexCoord::new(x, y)))
    }
}

/// Build the movement graph for `mover` with a budget of `max_cost`
///
/// Fails only if a unit's owner or team cannot be resolved.
pub fn build_graph(state: &GameState, mover: &Unit, max_cost: f32) -> Result<MovementGraph> {
    let map = state.map();
    // Twice the longer map side already covers the whole map from any tile
    let cap = 2 * map.width.max(map.height);
    let side = (max_cost.max(0.0) * state.config().graph_bound_factor)
        .ceil()
        .min(cap as f32) as i32
        + 1;
    let region = Region::around(mover.position, side, map);

    let threats = state.threat_map(mover)?;

    let mut graph = MovementGraph::new();
    for tile in region.coords() {
        if threats.enemies.contains(&tile) {
            continue;
        }
        graph.add_vertex(tile);

        if threats.friends.contains(&tile) {
            graph.friendly.insert(tile);
        }

        // Entering a ZoC tile is allowed, leaving it is not
        if threats.zoc.contains(&tile) {
            graph.zoc.insert(tile);
            continue;
        }

        for neighbor in tile.neighbors() {
            if !region.contains(neighbor) || threats.enemies.contains(&neighbor) {
                continue;
            }
            if let Some(cost) = map.movement_cost(neighbor) {
                graph.add_edge(tile, neighbor, cost);
            }
        }
    }

    tracing::debug!(
        unit = ?mover.id,
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        zoc = graph.zoc.len(),
        "built movement graph"
    );

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{brawler, duel_state, grass_state};
    use std::sync::Arc;

    #[test]
    fn test_from_map_has_every_tile() {
        let state = grass_state(5, 4);
        let graph = MovementGraph::from_map(state.map());
        assert_eq!(graph.vertex_count(), 20);
        // Interior even-column tile has all six neighbours
        assert_eq!(graph.edges_from(HexCoord::new(2, 2)).len(), 6);
        assert_eq!(graph.min_edge_cost(), 1.0);
    }

    #[test]
    fn test_enemy_tile_is_not_a_vertex() {
        let (state, mover, _enemy) = duel_state(HexCoord::new(2, 2), HexCoord::new(5, 5));
        let unit = state.unit(mover).unwrap();
        let graph = build_graph(&state, unit, 6.0).unwrap();
        assert!(!graph.contains(HexCoord::new(5, 5)));
        for vertex in graph.vertices() {
            assert!(graph.edges_from(vertex).iter().all(|e| e.to != HexCoord::new(5, 5)));
        }
    }

    #[test]
    fn test_zoc_tiles_have_no_outgoing_edges() {
        let (state, mover, _enemy) = duel_state(HexCoord::new(2, 2), HexCoord::new(5, 5));
        let unit = state.unit(mover).unwrap();
        let graph = build_graph(&state, unit, 6.0).unwrap();
        for zoc in HexCoord::new(5, 5).neighbors() {
            assert!(graph.contains(zoc));
            assert!(graph.is_zoc(zoc));
            assert!(graph.edges_from(zoc).is_empty());
        }
        // ...but they can still be entered
        assert_eq!(
            graph.edge_cost(HexCoord::new(5, 3), HexCoord::new(5, 4)),
            Some(1.0)
        );
    }

    #[test]
    fn test_region_is_bounded() {
        let mut state = grass_state(40, 40);
        let team = state.add_team("Solo");
        let player = state
            .add_player("p", team, crate::entity::player::PlayerKind::Human)
            .unwrap();
        let id = state.spawn("swordsman", player, HexCoord::new(20, 20)).unwrap();
        let unit = state.unit(id).unwrap();
        let graph = build_graph(&state, unit, 1.0).unwrap();
        // ceil(1 * 4) + 1 = 5 tiles per side
        assert_eq!(graph.vertex_count(), 25);
        assert!(!graph.contains(HexCoord::new(23, 20)));
    }

    #[test]
    fn test_region_clipped_to_map() {
        let mut state = grass_state(6, 6);
        let team = state.add_team("Solo");
        let player = state
            .add_player("p", team, crate::entity::player::PlayerKind::Human)
            .unwrap();
        let id = state.spawn("swordsman", player, HexCoord::new(0, 0)).unwrap();
        let graph = build_graph(&state, state.unit(id).unwrap(), 10.0).unwrap();
        assert_eq!(graph.vertex_count(), 36);
        assert!(graph.vertices().all(|v| state.map().in_bounds(v)));
    }

    #[test]
    fn test_huge_budget_covers_map_without_overflow() {
        let mut state = grass_state(6, 6);
        let team = state.add_team("Solo");
        let player = state
            .add_player("p", team, crate::entity::player::PlayerKind::Human)
            .unwrap();
        let mut template = brawler(3, 0, 1);
        template.movement = 1.0e9;
        let id = state
            .add_unit(Unit::spawn(Arc::new(template), player, HexCoord::new(2, 2)))
            .unwrap();

        let graph = build_graph(&state, state.unit(id).unwrap(), 1.0e9).unwrap();
        assert_eq!(graph.vertex_count(), 36);
        assert_eq!(state.reachable_tiles(id).unwrap().len(), 36);

        let graph = build_graph(&state, state.unit(id).unwrap(), f32::INFINITY).unwrap();
        assert_eq!(graph.vertex_count(), 36);
    }

    #[test]
    fn test_friendly_tile_is_passable_but_not_a_destination() {
        let (mut state, mover, _enemy) = duel_state(HexCoord::new(2, 2), HexCoord::new(9, 9));
        let owner = state.unit(mover).unwrap().owner;
        state.spawn("swordsman", owner, HexCoord::new(2, 3)).unwrap();

        let graph = build_graph(&state, state.unit(mover).unwrap(), 3.0).unwrap();
        assert!(graph.contains(HexCoord::new(2, 3)));
        assert!(graph.is_friendly_occupied(HexCoord::new(2, 3)));
        assert!(!graph.edges_from(HexCoord::new(2, 3)).is_empty());

        let destinations = graph.destinations([HexCoord::new(2, 3), HexCoord::new(2, 4)]);
        assert!(!destinations.contains(&HexCoord::new(2, 3)));
        assert!(destinations.contains(&HexCoord::new(2, 4)));
    }
}
