//! In-process transport: one shared inbox for the server, one per client
//!
//! Every link is a bounded `crossbeam_channel`: a send blocks while the
//! receiver is `capacity` frames behind. Hanging up is dropping your end;
//! the other side drains what was already sent and then sees
//! `ChannelClosed`.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::core::error::{Result, TacticsError};
use crate::net::codec::Frame;

/// Index of a client connection on the server side
pub type ClientId = usize;

/// A frame tagged with the client that sent it
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: ClientId,
    pub frame: Frame,
}

fn recv_with_timeout<T>(receiver: &Receiver<T>, timeout: Duration) -> Result<Option<T>> {
    match receiver.recv_timeout(timeout) {
        Ok(item) => Ok(Some(item)),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => Err(TacticsError::ChannelClosed),
    }
}

#[derive(Debug)]
pub struct ServerEndpoint {
    /// `None` once the server has hung up
    inbox: Option<Receiver<Envelope>>,
    outboxes: Vec<Option<Sender<Frame>>>,
}

impl ServerEndpoint {
    pub fn client_count(&self) -> usize {
        self.outboxes.len()
    }

    pub fn try_recv(&self) -> Option<Envelope> {
        self.inbox.as_ref()?.try_recv().ok()
    }

    /// `Ok(None)` on timeout; `ChannelClosed` once every client is gone
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Envelope>> {
        let inbox = self.inbox.as_ref().ok_or(TacticsError::ChannelClosed)?;
        recv_with_timeout(inbox, timeout)
    }

    pub fn send_to(&self, client: ClientId, frame: Frame) -> Result<()> {
        self.outboxes
            .get(client)
            .and_then(Option::as_ref)
            .ok_or(TacticsError::ChannelClosed)?
            .send(frame)
            .map_err(|_| TacticsError::ChannelClosed)
    }

    /// Send to every client still connected
    ///
    /// Fails only when no client received the frame.
    pub fn broadcast(&self, frame: &Frame) -> Result<()> {
        let mut delivered = 0;
        for (client, outbox) in self.outboxes.iter().enumerate() {
            let sent = outbox
                .as_ref()
                .is_some_and(|outbox| outbox.send(frame.clone()).is_ok());
            if sent {
                delivered += 1;
            } else {
                tracing::debug!(client, "client gone, frame dropped");
            }
        }
        if delivered == 0 && !self.outboxes.is_empty() {
            return Err(TacticsError::ChannelClosed);
        }
        Ok(())
    }

    /// Disconnect everyone; clients drain what was already sent
    pub fn close(&mut self) {
        self.inbox = None;
        for outbox in &mut self.outboxes {
            *outbox = None;
        }
    }
}

#[derive(Debug)]
pub struct ClientEndpoint {
    id: ClientId,
    server: Sender<Envelope>,
    inbox: Receiver<Frame>,
}

impl ClientEndpoint {
    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn send(&self, frame: Frame) -> Result<()> {
        self.server
            .send(Envelope { from: self.id, frame })
            .map_err(|_| TacticsError::ChannelClosed)
    }

    pub fn try_recv(&self) -> Option<Frame> {
        match self.inbox.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv(&self) -> Result<Frame> {
        self.inbox.recv().map_err(|_| TacticsError::ChannelClosed)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Frame>> {
        recv_with_timeout(&self.inbox, timeout)
    }

    /// Hang up; the server skips this client from now on
    pub fn close(self) {}
}

/// Wire up a server with `clients` connected clients
pub fn in_process(clients: usize, capacity: usize) -> (ServerEndpoint, Vec<ClientEndpoint>) {
    let (server_tx, server_rx) = bounded(capacity.max(1));
    let mut outboxes = Vec::with_capacity(clients);
    let mut endpoints = Vec::with_capacity(clients);

    for id in 0..clients {
        let (tx, rx) = bounded(capacity.max(1));
        outboxes.push(Some(tx));
        endpoints.push(ClientEndpoint {
            id,
            server: server_tx.clone(),
            inbox: rx,
        });
    }

    let server = ServerEndpoint {
        inbox: Some(server_rx),
        outboxes,
    };
    (server, endpoints)
}
