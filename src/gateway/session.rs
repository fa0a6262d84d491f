use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Serialized outbound frame. Shared between all recipients of one broadcast.
pub type Payload = Arc<str>;

pub type OutboundSender = mpsc::Sender<Payload>;
pub type OutboundReceiver = mpsc::Receiver<Payload>;

/// Bounded per-session queue between the hub (producer) and the write loop.
pub fn outbound_queue(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Opaque connection identity, unique per accepted socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    /// Advance along `Connecting -> Active -> Closing -> Closed`.
    /// Any state may jump to `Closing`; nothing leaves `Closed`.
    pub fn transition(self, next: SessionState) -> SessionState {
        use SessionState::*;
        match (self, next) {
            (Closed, _) => Closed,
            (Connecting, Active) | (Active, Closing) | (Connecting, Closing) => next,
            (Closing, Closed) => Closed,
            (current, _) => current,
        }
    }
}

/// The connection task's own view of its session.
///
/// The hub keeps the authoritative registry; this mirrors the room the
/// session last asked for so chat can be addressed without a round trip.
/// Only this session's read loop issues membership commands for it, so the
/// two views agree for as long as the session is live.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub user_id: String,
    pub room: Option<String>,
    pub state: SessionState,
}

impl Session {
    pub fn new(user_id: String, room: Option<String>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            room: room.filter(|r| !r.is_empty()),
            state: SessionState::Connecting,
        }
    }

    pub fn set_state(&mut self, next: SessionState) {
        self.state = self.state.transition(next);
    }

    #[cfg(test)]
    pub fn is_closing(&self) -> bool {
        matches!(self.state, SessionState::Closing | SessionState::Closed)
    }
}
