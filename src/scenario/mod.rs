//! Skirmish setups: map layout, teams, players and starting units

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::config::GameConfig;
use crate::core::error::{Result, TacticsError};
use crate::entity::creature::CreatureRegistry;
use crate::entity::player::PlayerKind;
use crate::map::hex::HexCoord;
use crate::map::logical_map::LogicalMap;
use crate::map::tile::TileRegistry;
use crate::state::game_state::GameState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Overrides the configured rng seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub map: MapSpec,
    #[serde(rename = "team")]
    pub teams: Vec<TeamSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSpec {
    #[serde(default)]
    pub origin: HexCoord,
    /// Rows of whitespace-separated tile ids
    pub layout: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSpec {
    pub name: String,
    #[serde(rename = "player")]
    pub players: Vec<PlayerSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub name: String,
    #[serde(default)]
    pub kind: PlayerKind,
    #[serde(default, rename = "unit")]
    pub units: Vec<SpawnSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnSpec {
    pub creature: String,
    pub position: HexCoord,
}

/// Creatures handed out round-robin by `Scenario::open_field`
const OPEN_FIELD_LINEUP: [&str; 4] = ["swordsman", "archer", "knight", "scout"];

impl Scenario {
    /// The scenario shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(include_str!("../../data/scenarios/duel.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(content)?;
        scenario.validate().map_err(TacticsError::Config)?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Grass map with two all-bot teams facing each other across it
    pub fn open_field(width: i32, height: i32, units_per_side: usize) -> Result<Self> {
        if width < 4 || height < 2 {
            return Err(TacticsError::Config(format!(
                "open field must be at least 4x2, got {}x{}",
                width, height
            )));
        }
        let rows = height as usize;
        if units_per_side == 0 || units_per_side > rows {
            return Err(TacticsError::Config(format!(
                "{} units per side do not fit in {} rows",
                units_per_side, rows
            )));
        }

        let row = vec!["grass"; width as usize].join(" ");
        let layout = vec![row; rows].join("\n");

        let side = |name: &str, x: i32| TeamSpec {
            name: name.to_string(),
            players: vec![PlayerSpec {
                name: format!("{} Bot", name),
                kind: PlayerKind::Ai,
                units: (0..units_per_side)
                    .map(|i| SpawnSpec {
                        creature: OPEN_FIELD_LINEUP[i % OPEN_FIELD_LINEUP.len()].to_string(),
                        position: HexCoord::new(x, (i * rows / units_per_side) as i32),
                    })
                    .collect(),
            }],
        };

        Ok(Self {
            name: format!("Open field {}x{}", width, height),
            seed: None,
            map: MapSpec {
                origin: HexCoord::default(),
                layout,
            },
            teams: vec![side("Red", 1), side("Blue", width - 2)],
        })
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.teams.len() < 2 {
            return Err(format!(
                "scenario '{}' needs at least two teams, has {}",
                self.name,
                self.teams.len()
            ));
        }
        for team in &self.teams {
            if team.players.is_empty() {
                return Err(format!("team '{}' has no players", team.name));
            }
        }
        Ok(())
    }

    /// Lay out the map and spawn every unit
    ///
    /// Fails on unknown tile or creature ids and on spawns that are off the
    /// map or share a tile.
    pub fn build(
        &self,
        tiles: &TileRegistry,
        creatures: Arc<CreatureRegistry>,
        mut config: GameConfig,
    ) -> Result<GameState> {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.validate().map_err(TacticsError::Config)?;

        let map = LogicalMap::from_layout(tiles, &self.map.layout, self.map.origin)?;
        let mut state = GameState::new(Arc::new(map), creatures, config);

        for team_spec in &self.teams {
            let team = state.add_team(&team_spec.name);
            for player_spec in &team_spec.players {
                let player = state.add_player(&player_spec.name, team, player_spec.kind)?;
                for spawn in &player_spec.units {
                    state.spawn(&spawn.creature, player, spawn.position)?;
                }
            }
        }

        tracing::info!(
            scenario = %self.name,
            width = state.map().width,
            height = state.map().height,
            units = state.units().len(),
            "scenario built"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registries() -> (TileRegistry, Arc<CreatureRegistry>) {
        (
            TileRegistry::builtin().unwrap(),
            Arc::new(CreatureRegistry::builtin().unwrap()),
        )
    }

    #[test]
    fn test_builtin_scenario_builds() {
        let (tiles, creatures) = registries();
        let scenario = Scenario::builtin().unwrap();
        let state = scenario.build(&tiles, creatures, GameConfig::default()).unwrap();
        assert_eq!(state.map().width, 12);
        assert_eq!(state.map().height, 8);
        assert_eq!(state.units().len(), 6);
        assert_eq!(state.teams().count(), 2);
        assert!(state.roster_is_sorted());
        // scout has the highest rating
        assert_eq!(state.current_unit().unwrap().template.id, "scout");
    }

    #[test]
    fn test_seed_override() {
        let (tiles, creatures) = registries();
        let mut scenario = Scenario::builtin().unwrap();
        scenario.seed = Some(99);
        let state = scenario.build(&tiles, creatures, GameConfig::default()).unwrap();
        assert_eq!(state.config().seed, 99);
    }

    #[test]
    fn test_open_field() {
        let (tiles, creatures) = registries();
        let scenario = Scenario::open_field(10, 8, 4).unwrap();
        let state = scenario.build(&tiles, creatures, GameConfig::default()).unwrap();
        assert_eq!(state.units().len(), 8);
        assert!(Scenario::open_field(2, 8, 1).is_err());
        assert!(Scenario::open_field(10, 3, 4).is_err());
    }

    #[test]
    fn test_single_team_is_rejected() {
        let text = r#"
            name = "Lonely"
            [map]
            layout = "grass grass"
            [[team]]
            name = "Red"
            [[team.player]]
            name = "Ann"
        "#;
        assert!(matches!(
            Scenario::from_toml_str(text),
            Err(TacticsError::Config(_))
        ));
    }

    #[test]
    fn test_bad_spawn_fails_build() {
        let (tiles, creatures) = registries();
        let mut scenario = Scenario::open_field(6, 4, 1).unwrap();
        scenario.teams[1].players[0].units[0].position = HexCoord::new(1, 0);
        assert!(matches!(
            scenario.build(&tiles, creatures, GameConfig::default()),
            Err(TacticsError::TileOccupied(_))
        ));
    }
}
