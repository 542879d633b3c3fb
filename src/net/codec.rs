//! Wire encoding for updates
//!
//! JSON text, one update per frame. `None` fields are left out so a replica
//! can tell "unchanged" from "set to the default".

use crate::core::error::Result;
use crate::protocol::update::Update;

pub type Frame = Vec<u8>;

pub fn encode(update: &Update) -> Result<Frame> {
    Ok(serde_json::to_vec(update)?)
}

pub fn decode(frame: &[u8]) -> Result<Update> {
    Ok(serde_json::from_slice(frame)?)
}
