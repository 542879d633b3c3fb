//! Hex Tactics - server-authoritative turn-based tactics on a hex grid
//!
//! The core is synchronous: a `GameState` is only ever touched by the loop
//! that owns it. Threads meet at the transport in `net`.

pub mod bot;
pub mod core;
pub mod entity;
pub mod map;
pub mod net;
pub mod pathfinding;
pub mod protocol;
pub mod scenario;
pub mod state;
