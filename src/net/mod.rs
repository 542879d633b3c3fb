//! Transport between peers: channels, framing and the server/client loops

pub mod channel;
pub mod codec;
pub mod peer;

pub use channel::{in_process, ClientEndpoint, ClientId, Envelope, ServerEndpoint};
pub use codec::{decode, encode, Frame};
pub use peer::{ClientPeer, PeerState, ServerPeer};
