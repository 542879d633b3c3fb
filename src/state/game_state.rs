//! The authoritative game state
//!
//! Owns the map, the initiative-ordered roster, players and teams, and the
//! update counter. The roster is kept sorted ascending by initiative after
//! every mutation; the unit at the front is the only one allowed to act.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::GameConfig;
use crate::core::error::{Result, TacticsError};
use crate::core::types::{PlayerId, TeamId, UnitId, UpdateId};
use crate::entity::creature::CreatureRegistry;
use crate::entity::player::{Player, PlayerKind, Team};
use crate::entity::unit::Unit;
use crate::map::hex::HexCoord;
use crate::map::logical_map::LogicalMap;
use crate::pathfinding::graph::{build_graph, MovementGraph};
use crate::pathfinding::search::{reachable, shortest_path};
use crate::protocol::update::WinState;

#[derive(Debug, Clone)]
pub struct GameState {
    pub(crate) map: Arc<LogicalMap>,
    pub(crate) creatures: Arc<CreatureRegistry>,
    pub(crate) units: Vec<Unit>,
    pub(crate) players: BTreeMap<PlayerId, Player>,
    pub(crate) teams: BTreeMap<TeamId, Team>,
    pub(crate) update_counter: UpdateId,
    pub(crate) initiative_counter: f32,
    pub(crate) win_state: WinState,
    pub(crate) winning_team: Option<TeamId>,
    pub(crate) config: GameConfig,
    pub(crate) rng: ChaCha8Rng,
}

impl GameState {
    pub fn new(map: Arc<LogicalMap>, creatures: Arc<CreatureRegistry>, config: GameConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            map,
            creatures,
            units: Vec::new(),
            players: BTreeMap::new(),
            teams: BTreeMap::new(),
            update_counter: 0,
            initiative_counter: 0.0,
            win_state: WinState::InProgress,
            winning_team: None,
            config,
            rng,
        }
    }

    /// A state on the same map, creatures and config with nobody in it
    ///
    /// Clients start from this and fill it in from the opening snapshot.
    pub fn empty_replica(&self) -> Self {
        Self::new(
            Arc::clone(&self.map),
            Arc::clone(&self.creatures),
            self.config.clone(),
        )
    }

    // === ACCESSORS ===

    pub fn map(&self) -> &LogicalMap {
        &self.map
    }

    pub fn creatures(&self) -> &CreatureRegistry {
        &self.creatures
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Roster in turn order
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    pub fn update_counter(&self) -> UpdateId {
        self.update_counter
    }

    pub fn initiative_counter(&self) -> f32 {
        self.initiative_counter
    }

    pub fn win_state(&self) -> WinState {
        self.win_state
    }

    pub fn winning_team(&self) -> Option<TeamId> {
        self.winning_team
    }

    pub fn is_over(&self) -> bool {
        self.win_state != WinState::InProgress
    }

    // === PLAYERS & TEAMS ===

    pub fn add_team(&mut self, name: &str) -> TeamId {
        let team = Team::new(name);
        let id = team.id;
        self.teams.insert(id, team);
        id
    }

    pub fn add_player(&mut self, name: &str, team: TeamId, kind: PlayerKind) -> Result<PlayerId> {
        if !self.teams.contains_key(&team) {
            return Err(TacticsError::TeamNotFound(team));
        }
        let player = Player::new(name, team, kind);
        let id = player.id;
        self.players.insert(id, player);
        Ok(id)
    }

    /// Player that owns a unit
    pub fn owner_of(&self, unit: &Unit) -> Result<&Player> {
        self.players
            .get(&unit.owner)
            .ok_or(TacticsError::PlayerNotFound(unit.owner))
    }

    pub fn team_of(&self, unit: &Unit) -> Result<TeamId> {
        self.owner_of(unit).map(|player| player.team)
    }

    /// Units on a different team than `unit`
    pub fn enemies_of(&self, unit: &Unit) -> Result<Vec<&Unit>> {
        let team = self.team_of(unit)?;
        let mut enemies = Vec::new();
        for other in &self.units {
            if self.team_of(other)? != team {
                enemies.push(other);
            }
        }
        Ok(enemies)
    }

    // === ROSTER ===

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Like `unit`, but a missing unit is an error
    pub fn require_unit(&self, id: UnitId) -> Result<&Unit> {
        self.unit(id).ok_or(TacticsError::UnitNotFound(id))
    }

    pub fn unit_at(&self, coord: HexCoord) -> Option<&Unit> {
        self.units.iter().find(|u| u.position == coord)
    }

    /// The unit whose turn it is
    pub fn current_unit(&self) -> Result<&Unit> {
        self.units.first().ok_or(TacticsError::EmptyRoster)
    }

    /// Put a new unit on the map
    ///
    /// Its initiative is seeded from the initiative already consumed, so it
    /// slots in behind units that are due sooner.
    pub fn spawn(&mut self, template_id: &str, owner: PlayerId, position: HexCoord) -> Result<UnitId> {
        let template = self.creatures.require(template_id)?;
        let mut unit = Unit::spawn(template, owner, position);
        unit.initiative = self.initiative_counter + unit.template.initiative_step();
        self.add_unit(unit)
    }

    /// Insert an already built unit into turn order, keeping its initiative
    pub fn add_unit(&mut self, unit: Unit) -> Result<UnitId> {
        if !self.players.contains_key(&unit.owner) {
            return Err(TacticsError::PlayerNotFound(unit.owner));
        }
        if !self.map.in_bounds(unit.position) {
            return Err(TacticsError::OutOfBounds(unit.position));
        }
        if self.unit_at(unit.position).is_some() {
            return Err(TacticsError::TileOccupied(unit.position));
        }

        let id = unit.id;
        tracing::debug!(unit = ?id, creature = %unit.template.id, position = ?unit.position, "unit added");
        self.insert_sorted(unit);
        Ok(id)
    }

    /// Insert behind every unit with the same or lower initiative
    fn insert_sorted(&mut self, unit: Unit) {
        let index = self
            .units
            .partition_point(|u| u.initiative <= unit.initiative);
        self.units.insert(index, unit);
    }

    /// Stable sort by initiative; ties keep their relative order
    pub(crate) fn sort_roster(&mut self) {
        self.units
            .sort_by(|a, b| a.initiative.total_cmp(&b.initiative));
    }

    pub fn roster_is_sorted(&self) -> bool {
        self.units
            .windows(2)
            .all(|pair| pair[0].initiative <= pair[1].initiative)
    }

    /// Drop units with no health left
    pub(crate) fn remove_dead(&mut self) -> Vec<UnitId> {
        let dead: Vec<UnitId> = self
            .units
            .iter()
            .filter(|u| u.is_dead())
            .map(|u| u.id)
            .collect();
        self.units.retain(|u| !u.is_dead());
        dead
    }

    /// Finish the active unit's turn and advance turn order
    pub fn end_unit_turn(&mut self) -> Result<UnitId> {
        if self.units.is_empty() {
            return Err(TacticsError::EmptyRoster);
        }

        let mut unit = self.units.remove(0);
        unit.complete_turn();
        let id = unit.id;
        self.units.push(unit);
        self.sort_roster();
        self.initiative_counter = self.units[0].initiative;

        tracing::debug!(ended = ?id, next = ?self.units[0].id, "unit turn ended");
        Ok(id)
    }

    // === MOVEMENT QUERIES ===

    /// Movement graph for a unit using its remaining move points
    pub fn movement_graph(&self, unit_id: UnitId) -> Result<MovementGraph> {
        let unit = self.require_unit(unit_id)?;
        build_graph(self, unit, unit.move_points)
    }

    /// Tiles the unit could end its move on this turn
    pub fn reachable_tiles(&self, unit_id: UnitId) -> Result<BTreeSet<HexCoord>> {
        let unit = self.require_unit(unit_id)?;
        let graph = build_graph(self, unit, unit.move_points)?;
        let tiles = reachable(&graph, unit.position, unit.move_points);
        Ok(graph.destinations(tiles))
    }

    /// Cheapest path for a unit to `destination`, empty if there is none
    pub fn path_to(&self, unit_id: UnitId, destination: HexCoord) -> Result<Vec<HexCoord>> {
        let unit = self.require_unit(unit_id)?;
        let graph = build_graph(self, unit, unit.move_points)?;
        Ok(shortest_path(&graph, unit.position, destination))
    }

    // === VICTORY ===

    /// Draw on an empty roster, a win when only one team is left
    pub fn check_victory(&self) -> Result<(WinState, Option<TeamId>)> {
        let Some(first) = self.units.first() else {
            return Ok((WinState::Draw, None));
        };
        let team = self.team_of(first)?;
        for unit in &self.units[1..] {
            if self.team_of(unit)? != team {
                return Ok((WinState::InProgress, None));
            }
        }
        Ok((WinState::Won, Some(team)))
    }

    pub(crate) fn stamp_victory(&mut self) -> Result<()> {
        let (state, team) = self.check_victory()?;
        if state != WinState::InProgress && self.win_state == WinState::InProgress {
            tracing::info!(?state, ?team, "game decided");
        }
        self.win_state = state;
        self.winning_team = team;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{duel_state, grass_state};

    #[test]
    fn test_spawn_slots_by_initiative() {
        let mut state = grass_state(10, 10);
        let team = state.add_team("Red");
        let player = state.add_player("Ann", team, PlayerKind::Human).unwrap();

        // knight rating 8 -> 12.5, scout rating 16 -> 6.25
        let knight = state.spawn("knight", player, HexCoord::new(1, 1)).unwrap();
        let scout = state.spawn("scout", player, HexCoord::new(2, 1)).unwrap();

        assert_eq!(state.current_unit().unwrap().id, scout);
        assert_eq!(state.units()[1].id, knight);
        assert!(state.roster_is_sorted());
    }

    #[test]
    fn test_spawn_equal_initiative_goes_last() {
        let mut state = grass_state(10, 10);
        let team = state.add_team("Red");
        let player = state.add_player("Ann", team, PlayerKind::Human).unwrap();
        let first = state.spawn("swordsman", player, HexCoord::new(1, 1)).unwrap();
        let second = state.spawn("swordsman", player, HexCoord::new(2, 1)).unwrap();
        assert_eq!(state.units()[0].id, first);
        assert_eq!(state.units()[1].id, second);
    }

    #[test]
    fn test_spawn_rejects_bad_input() {
        let mut state = grass_state(5, 5);
        let team = state.add_team("Red");
        let player = state.add_player("Ann", team, PlayerKind::Human).unwrap();
        state.spawn("swordsman", player, HexCoord::new(1, 1)).unwrap();

        assert!(matches!(
            state.spawn("swordsman", player, HexCoord::new(1, 1)),
            Err(TacticsError::TileOccupied(_))
        ));
        assert!(matches!(
            state.spawn("swordsman", player, HexCoord::new(9, 9)),
            Err(TacticsError::OutOfBounds(_))
        ));
        assert!(matches!(
            state.spawn("dragon", player, HexCoord::new(2, 2)),
            Err(TacticsError::CreatureNotFound(_))
        ));
        assert!(matches!(
            state.spawn("swordsman", PlayerId::new(), HexCoord::new(2, 2)),
            Err(TacticsError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn test_add_player_needs_team() {
        let mut state = grass_state(5, 5);
        assert!(matches!(
            state.add_player("Ann", TeamId::new(), PlayerKind::Ai),
            Err(TacticsError::TeamNotFound(_))
        ));
    }

    #[test]
    fn test_end_unit_turn_rotates_roster() {
        let (mut state, first, second) = duel_state(HexCoord::new(1, 1), HexCoord::new(8, 8));
        assert_eq!(state.current_unit().unwrap().id, first);

        let ended = state.end_unit_turn().unwrap();
        assert_eq!(ended, first);
        assert_eq!(state.current_unit().unwrap().id, second);
        assert!(state.roster_is_sorted());
        assert_eq!(state.initiative_counter(), state.units()[0].initiative);

        // The unit that just acted got its budget back
        let unit = state.unit(first).unwrap();
        assert_eq!(unit.move_points, unit.template.movement);
        assert_eq!(unit.initiative, 2.0 * unit.template.initiative_step());
    }

    #[test]
    fn test_end_unit_turn_on_empty_roster() {
        let mut state = grass_state(3, 3);
        assert!(matches!(state.end_unit_turn(), Err(TacticsError::EmptyRoster)));
    }

    #[test]
    fn test_fast_units_act_more_often() {
        let mut state = grass_state(10, 10);
        let team = state.add_team("Red");
        let player = state.add_player("Ann", team, PlayerKind::Human).unwrap();
        let scout = state.spawn("scout", player, HexCoord::new(1, 1)).unwrap();
        state.spawn("knight", player, HexCoord::new(3, 3)).unwrap();

        let mut scout_turns = 0;
        for _ in 0..12 {
            if state.end_unit_turn().unwrap() == scout {
                scout_turns += 1;
            }
            assert!(state.roster_is_sorted());
        }
        // 16 vs 8 rating: scout acts twice as often
        assert_eq!(scout_turns, 8);
    }

    #[test]
    fn test_victory_states() {
        let (mut state, first, second) = duel_state(HexCoord::new(1, 1), HexCoord::new(8, 8));
        assert_eq!(state.check_victory().unwrap(), (WinState::InProgress, None));

        let winner_team = state.team_of(state.unit(first).unwrap()).unwrap();
        state.units.retain(|u| u.id != second);
        assert_eq!(
            state.check_victory().unwrap(),
            (WinState::Won, Some(winner_team))
        );

        state.units.clear();
        assert_eq!(state.check_victory().unwrap(), (WinState::Draw, None));
    }

    #[test]
    fn test_reachable_tiles_exclude_friends() {
        let (mut state, mover, _enemy) = duel_state(HexCoord::new(2, 2), HexCoord::new(9, 9));
        let owner = state.unit(mover).unwrap().owner;
        state.spawn("swordsman", owner, HexCoord::new(2, 3)).unwrap();

        let tiles = state.reachable_tiles(mover).unwrap();
        assert!(!tiles.contains(&HexCoord::new(2, 3)));
        // Reachable by walking through the friend
        assert!(tiles.contains(&HexCoord::new(2, 4)));
        assert!(tiles.contains(&HexCoord::new(2, 5)));
    }

    #[test]
    fn test_path_to_walks_around_enemy_zoc() {
        let enemy_pos = HexCoord::new(4, 4);
        let (state, mover, _enemy) = duel_state(HexCoord::new(4, 2), enemy_pos);
        let path = state.path_to(mover, HexCoord::new(4, 6)).unwrap();

        assert_eq!(path.first(), Some(&HexCoord::new(4, 2)));
        assert_eq!(path.last(), Some(&HexCoord::new(4, 6)));
        assert!(!path.contains(&enemy_pos));
        for zoc in enemy_pos.neighbors() {
            assert!(!path.contains(&zoc));
        }
        // Longer than the 3 points a swordsman has
        assert!(path.len() > 4);
        assert!(!state.reachable_tiles(mover).unwrap().contains(&HexCoord::new(4, 6)));
    }
}
