//! Server and client loops around a `GameState`
//!
//! Each loop owns its state outright; only encoded frames cross threads.

use std::time::Duration;

use ahash::AHashMap;

use crate::bot::Controller;
use crate::core::error::{Result, TacticsError};
use crate::core::types::{PlayerId, UpdateId};
use crate::net::channel::{ClientEndpoint, ClientId, Envelope, ServerEndpoint};
use crate::net::codec::{decode, encode};
use crate::protocol::update::Update;
use crate::state::game_state::GameState;

/// Where a peer is in the update cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerState {
    AwaitingAction,
    Validating,
    Applying,
    Broadcasting,
    AwaitingUpdate,
    Ended,
}

/// Owns the authoritative state and serves every client
///
/// Without seats any client may propose for the active unit. Once a seat
/// is assigned, only the client seated for the active unit's owner may.
#[derive(Debug)]
pub struct ServerPeer {
    state: GameState,
    endpoint: ServerEndpoint,
    seats: AHashMap<ClientId, PlayerId>,
    peer_state: PeerState,
    idle_polls: u32,
    broadcasts: u64,
}

impl ServerPeer {
    pub fn new(state: GameState, endpoint: ServerEndpoint) -> Self {
        Self {
            state,
            endpoint,
            seats: AHashMap::new(),
            peer_state: PeerState::AwaitingAction,
            idle_polls: 0,
            broadcasts: 0,
        }
    }

    /// Let `client` act for `player`'s units
    pub fn seat(&mut self, client: ClientId, player: PlayerId) -> Result<()> {
        if self.state.player(player).is_none() {
            return Err(TacticsError::PlayerNotFound(player));
        }
        if client >= self.endpoint.client_count() {
            return Err(TacticsError::Config(format!("no client {} to seat", client)));
        }
        tracing::debug!(client, ?player, "client seated");
        self.seats.insert(client, player);
        Ok(())
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    pub fn peer_state(&self) -> PeerState {
        self.peer_state
    }

    /// Updates sent to all clients so far, the opening one included
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts
    }

    /// Send the opening snapshot
    pub fn start(&mut self) -> Result<()> {
        let opening = self.state.begin()?;
        self.broadcast(&opening)
    }

    /// Handle at most one incoming frame
    pub fn step(&mut self) -> Result<PeerState> {
        if self.peer_state == PeerState::Ended {
            return Ok(self.peer_state);
        }

        let timeout = Duration::from_millis(self.state.config().receive_timeout_ms);
        let received = match self.endpoint.recv_timeout(timeout) {
            Err(TacticsError::ChannelClosed) => {
                tracing::info!("every client hung up");
                self.finish(false)?;
                return Ok(self.peer_state);
            }
            other => other?,
        };
        let Some(envelope) = received else {
            self.idle_polls += 1;
            if self.idle_polls >= self.state.config().max_idle_polls {
                tracing::warn!(polls = self.idle_polls, "no proposals arriving, stopping");
                self.finish(false)?;
            }
            return Ok(self.peer_state);
        };
        self.idle_polls = 0;
        self.handle(envelope)?;
        Ok(self.peer_state)
    }

    /// Serve until the game is decided, someone quits or clients go quiet
    pub fn run(&mut self) -> Result<&GameState> {
        self.start()?;
        while self.step()? != PeerState::Ended {}
        Ok(&self.state)
    }

    /// Tell every client to stop and close the links
    pub fn shutdown(&mut self) -> Result<()> {
        if self.peer_state == PeerState::Ended {
            return Ok(());
        }
        tracing::info!(id = self.state.update_counter(), "server shutting down");
        self.finish(true)
    }

    fn handle(&mut self, envelope: Envelope) -> Result<()> {
        self.peer_state = PeerState::Validating;
        let Envelope { from, frame } = envelope;

        let incoming = match decode(&frame) {
            Ok(update) => update,
            Err(err) => {
                tracing::warn!(client = from, %err, "undecodable frame dropped");
                self.peer_state = PeerState::AwaitingAction;
                return Ok(());
            }
        };

        if incoming.is_quit_sentinel() {
            tracing::info!(client = from, "client quit");
            return self.finish(true);
        }

        if !self.may_act(from) {
            tracing::warn!(client = from, seat = ?self.seats.get(&from), "proposal from a client not seated for the active unit");
            self.resync(from, incoming.id)?;
            self.peer_state = PeerState::AwaitingAction;
            return Ok(());
        }

        match self.state.validate_and_apply(&incoming) {
            Ok(Some(outgoing)) => {
                self.peer_state = PeerState::Applying;
                self.broadcast(&outgoing)?;
                if outgoing.is_terminal() {
                    tracing::info!(
                        id = outgoing.id,
                        win_state = ?outgoing.win_state,
                        winner = ?outgoing.winning_team,
                        "game over"
                    );
                    return self.finish(false);
                }
            }
            Ok(None) => self.resync(from, incoming.id)?,
            Err(err) => {
                tracing::error!(client = from, %err, "batch aborted");
                self.resync(from, incoming.id)?;
            }
        }

        self.peer_state = PeerState::AwaitingAction;
        Ok(())
    }

    /// An empty roster is left for validation to report
    fn may_act(&self, client: ClientId) -> bool {
        if self.seats.is_empty() {
            return true;
        }
        match self.state.current_unit() {
            Ok(unit) => self.seats.get(&client) == Some(&unit.owner),
            Err(_) => true,
        }
    }

    fn broadcast(&mut self, update: &Update) -> Result<()> {
        self.peer_state = PeerState::Broadcasting;
        self.endpoint.broadcast(&encode(update)?)?;
        self.broadcasts += 1;
        Ok(())
    }

    /// Bring one client back in line with a full snapshot
    fn resync(&mut self, client: ClientId, stale_id: UpdateId) -> Result<()> {
        tracing::info!(
            client,
            stale_id,
            current = self.state.update_counter(),
            "sending snapshot"
        );
        match self.endpoint.send_to(client, encode(&self.state.snapshot())?) {
            Err(TacticsError::ChannelClosed) => {
                tracing::debug!(client, "client gone, snapshot dropped");
                Ok(())
            }
            other => other,
        }
    }

    fn finish(&mut self, notify: bool) -> Result<()> {
        if notify {
            let quit = encode(&Update::quit_sentinel())?;
            if let Err(err) = self.endpoint.broadcast(&quit) {
                tracing::debug!(%err, "quit not delivered");
            }
        }
        self.endpoint.close();
        self.peer_state = PeerState::Ended;
        Ok(())
    }
}

/// Owns a replica of the game and forwards proposals to the server
#[derive(Debug)]
pub struct ClientPeer {
    state: GameState,
    endpoint: ClientEndpoint,
    peer_state: PeerState,
    /// Id stamped on the proposal still waiting for an answer
    pending: Option<UpdateId>,
    last_failure: Option<String>,
}

impl ClientPeer {
    /// `replica` should share the server's map and creature registry; its
    /// roster is filled in by the opening snapshot
    pub fn new(replica: GameState, endpoint: ClientEndpoint) -> Self {
        Self {
            state: replica,
            endpoint,
            peer_state: PeerState::AwaitingUpdate,
            pending: None,
            last_failure: None,
        }
    }

    pub fn id(&self) -> ClientId {
        self.endpoint.id()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn peer_state(&self) -> PeerState {
        self.peer_state
    }

    pub fn is_ended(&self) -> bool {
        self.peer_state == PeerState::Ended
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    /// Reason the server gave for refusing part of the latest batch
    pub fn take_failure(&mut self) -> Option<String> {
        self.last_failure.take()
    }

    /// Apply everything already received; returns how many updates applied
    pub fn poll(&mut self) -> Result<usize> {
        let mut applied = 0;
        while !self.is_ended() {
            let Some(frame) = self.endpoint.try_recv() else {
                break;
            };
            if self.receive(&frame)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Wait up to `timeout` for the next update, then drain the rest
    pub fn wait(&mut self, timeout: Duration) -> Result<usize> {
        if self.is_ended() {
            return Ok(0);
        }
        let first = match self.endpoint.recv_timeout(timeout) {
            Ok(Some(frame)) => usize::from(self.receive(&frame)?),
            Ok(None) => 0,
            Err(TacticsError::ChannelClosed) => {
                tracing::debug!(client = self.id(), "server closed the link");
                self.peer_state = PeerState::Ended;
                return Ok(0);
            }
            Err(err) => return Err(err),
        };
        Ok(first + self.poll()?)
    }

    pub fn submit(&mut self, proposal: &Update) -> Result<()> {
        self.endpoint.send(encode(proposal)?)?;
        self.pending = Some(proposal.id);
        Ok(())
    }

    /// Ask the server to stop the game
    pub fn quit(&mut self) -> Result<()> {
        self.endpoint.send(encode(&Update::quit_sentinel())?)
    }

    /// Play `controller`'s turns until the game ends
    pub fn run<C: Controller>(&mut self, controller: &mut C) -> Result<()> {
        let timeout = Duration::from_millis(self.state.config().receive_timeout_ms);
        loop {
            self.wait(timeout)?;
            if self.is_ended() {
                return Ok(());
            }
            // Nothing to plan on before the opening snapshot
            if self.is_waiting() || self.state.update_counter() == 0 {
                continue;
            }
            if let Some(proposal) = controller.plan(&self.state)? {
                match self.submit(&proposal) {
                    Err(TacticsError::ChannelClosed) => {
                        self.poll()?;
                        self.peer_state = PeerState::Ended;
                        return Ok(());
                    }
                    other => other?,
                }
            }
        }
    }

    fn receive(&mut self, frame: &[u8]) -> Result<bool> {
        let update = decode(frame)?;
        if update.is_quit_sentinel() {
            tracing::debug!(client = self.id(), "quit received");
            self.peer_state = PeerState::Ended;
            return Ok(false);
        }

        self.peer_state = PeerState::Applying;
        let applied = self.state.apply(&update)?;
        if applied {
            self.pending = None;
            if let Some(failure) = &update.failure {
                tracing::debug!(client = self.id(), %failure, "server refused part of a batch");
                self.last_failure = Some(failure.clone());
            }
        }

        self.peer_state = if update.is_terminal() {
            PeerState::Ended
        } else {
            PeerState::AwaitingUpdate
        };
        Ok(applied)
    }
}
