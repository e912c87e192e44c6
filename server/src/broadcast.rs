//! Outbound event routing
//!
//! The session never touches sockets. It queues `GameMessage`s on an
//! unbounded channel and the network layer fans them out to the matching
//! connections, one FIFO writer per connection.

use log::{debug, error};
use shared::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;

/// Which connections receive an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Only the triggering connection
    Only(ConnectionId),
    /// Everyone except the triggering connection
    AllExcept(ConnectionId),
    All,
}

impl Target {
    pub fn includes(&self, id: ConnectionId) -> bool {
        match *self {
            Target::Only(target) => target == id,
            Target::AllExcept(excluded) => excluded != id,
            Target::All => true,
        }
    }
}

/// Messages sent from the game session to the network layer
#[derive(Debug, Clone, PartialEq)]
pub struct GameMessage {
    pub target: Target,
    pub event: ServerEvent,
}

#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<GameMessage>,
}

impl Broadcaster {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GameMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) {
        self.queue(Target::Only(id), event);
    }

    pub fn broadcast_except(&self, id: ConnectionId, event: ServerEvent) {
        self.queue(Target::AllExcept(id), event);
    }

    pub fn broadcast(&self, event: ServerEvent) {
        self.queue(Target::All, event);
    }

    fn queue(&self, target: Target, event: ServerEvent) {
        debug!("Queueing {} for {:?}", event.name(), target);
        if let Err(e) = self.tx.send(GameMessage { target, event }) {
            error!("Failed to queue {} event: receiver dropped", e.0.event.name());
        }
    }
}
