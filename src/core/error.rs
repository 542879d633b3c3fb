use thiserror::Error;

use crate::core::types::{PlayerId, TeamId, UnitId};
use crate::map::hex::HexCoord;

/// Why a proposed action was refused.
///
/// These are recoverable: the offending sub-action is dropped from the
/// outgoing update and the `Display` text is reported back to the sender.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("unit {0:?} is not the active unit")]
    NotActiveUnit(UnitId),

    #[error("path is empty")]
    EmptyPath,

    #[error("path must start at the unit's position {0:?}")]
    PathStartMismatch(HexCoord),

    #[error("path step to {0:?} is not adjacent to the previous tile")]
    PathNotContiguous(HexCoord),

    #[error("path leaves the map at {0:?}")]
    OffMap(HexCoord),

    #[error("path is blocked by an enemy at {0:?}")]
    PathBlocked(HexCoord),

    #[error("zone of control at {0:?} stops movement")]
    ZoneOfControl(HexCoord),

    #[error("destination {0:?} is already occupied")]
    DestinationOccupied(HexCoord),

    #[error("not enough movement: path costs {required} but only {available} remains")]
    NotEnoughMovement { required: f32, available: f32 },

    #[error("no attacks remaining this turn")]
    NoAttacksRemaining,

    #[error("a unit cannot attack itself")]
    SelfTarget,

    #[error("target {0:?} is on the same team")]
    FriendlyTarget(UnitId),

    #[error("target is {distance} tiles away but range is {range}")]
    OutOfRange { distance: i32, range: i32 },

    #[error("line of fire is blocked at {0:?}")]
    LineBlocked(HexCoord),

    #[error("target {0:?} is no longer on the map")]
    TargetGone(UnitId),

    #[error("canonical state can only be issued by the server")]
    CanonicalFromClient,
}

#[derive(Error, Debug)]
pub enum TacticsError {
    #[error("{0}")]
    Rejected(#[from] ActionError),

    #[error("Unit not found: {0:?}")]
    UnitNotFound(UnitId),

    #[error("Player not found: {0:?}")]
    PlayerNotFound(PlayerId),

    #[error("Team not found: {0:?}")]
    TeamNotFound(TeamId),

    #[error("Tile type not found: {0}")]
    TileNotFound(String),

    #[error("Creature template not found: {0}")]
    CreatureNotFound(String),

    #[error("Roster is empty")]
    EmptyRoster,

    #[error("Coordinate out of bounds: {0:?}")]
    OutOfBounds(HexCoord),

    #[error("Tile already occupied: {0:?}")]
    TileOccupied(HexCoord),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Channel closed")]
    ChannelClosed,
}

impl TacticsError {
    /// True for refusals that leave the rest of a batch intact.
    pub fn is_rejection(&self) -> bool {
        matches!(self, TacticsError::Rejected(_))
    }
}

pub type Result<T> = std::result::Result<T, TacticsError>;
