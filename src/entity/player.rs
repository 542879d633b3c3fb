//! Players and teams

use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerId, TeamId};

/// Who is driving a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    #[default]
    Human,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Team membership decides friend or foe
    pub team: TeamId,
    pub kind: PlayerKind,
}

impl Player {
    pub fn new(name: &str, team: TeamId, kind: PlayerKind) -> Self {
        Self {
            id: PlayerId::new(),
            name: name.to_string(),
            team,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

impl Team {
    pub fn new(name: &str) -> Self {
        Self {
            id: TeamId::new(),
            name: name.to_string(),
        }
    }
}
