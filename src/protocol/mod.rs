//! Update messages and the rules for numbering, validating and replaying them

pub mod sequencing;
pub mod update;

pub use update::{AttackInfo, PlayerUpdate, UnitAction, UnitUpdate, Update, WinState};
