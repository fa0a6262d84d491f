//! The hub: single owner of the session registry and the room index.
//!
//! All membership changes and broadcasts arrive as [`HubCommand`]s on one
//! channel and are applied to completion, one at a time, by the task started
//! in [`Hub::spawn`]. Nothing else touches the maps, so they need no locks,
//! and a broadcast always sees the membership left by the previous command.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use super::rooms::RoomIndex;
use super::session::{OutboundSender, Payload, SessionId};

/// Everything the hub needs to know about a freshly accepted session.
#[derive(Debug)]
pub struct Registration {
    pub session_id: SessionId,
    pub user_id: String,
    pub room: Option<String>,
    pub outbound: OutboundSender,
}

#[derive(Debug)]
pub enum HubCommand {
    Register(Registration),
    Unregister(SessionId),
    JoinRoom { session_id: SessionId, room: String },
    LeaveRoom(SessionId),
    BroadcastAll(Payload),
    BroadcastRoom { room: String, payload: Payload },
    Snapshot(oneshot::Sender<HubSnapshot>),
}

/// Point-in-time copy of the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubSnapshot {
    pub sessions: BTreeMap<SessionId, SessionView>,
    pub rooms: BTreeMap<String, BTreeSet<SessionId>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub user_id: String,
    pub room: Option<String>,
}

#[derive(Debug)]
struct Member {
    user_id: String,
    room: Option<String>,
    outbound: OutboundSender,
}

#[derive(Debug, Default)]
pub struct Hub {
    sessions: HashMap<SessionId, Member>,
    rooms: RoomIndex,
    /// Sessions dropped for a full or closed queue whose connection task has
    /// not yet sent its own `Unregister`.
    evicted: HashSet<SessionId>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the command loop on the current runtime.
    pub fn spawn(command_capacity: usize) -> HubHandle {
        let (tx, rx) = mpsc::channel(command_capacity.max(1));
        tokio::spawn(Hub::new().run(rx));
        HubHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<HubCommand>) {
        tracing::debug!("hub started");
        while let Some(command) = rx.recv().await {
            self.apply(command);
        }
        tracing::debug!(sessions = self.sessions.len(), "hub stopped");
    }

    /// Apply one command to completion.
    pub fn apply(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(registration) => self.register(registration),
            HubCommand::Unregister(session_id) => self.unregister(session_id),
            HubCommand::JoinRoom { session_id, room } => self.join_room(session_id, room),
            HubCommand::LeaveRoom(session_id) => self.leave_room(session_id),
            HubCommand::BroadcastAll(payload) => self.broadcast_all(payload),
            HubCommand::BroadcastRoom { room, payload } => self.broadcast_room(&room, payload),
            HubCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    pub fn snapshot(&self) -> HubSnapshot {
        HubSnapshot {
            sessions: self
                .sessions
                .iter()
                .map(|(id, m)| {
                    (
                        *id,
                        SessionView {
                            user_id: m.user_id.clone(),
                            room: m.room.clone(),
                        },
                    )
                })
                .collect(),
            rooms: self.rooms.to_sorted(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn register(&mut self, registration: Registration) {
        let Registration {
            session_id,
            user_id,
            room,
            outbound,
        } = registration;
        let room = room.filter(|r| !r.is_empty());

        if let Some(ref room) = room {
            self.rooms.insert(room, session_id);
        }
        tracing::info!(
            %session_id,
            user_id = %user_id,
            room = room.as_deref(),
            "session registered"
        );
        let previous = self.sessions.insert(
            session_id,
            Member {
                user_id,
                room,
                outbound,
            },
        );
        debug_assert!(previous.is_none(), "session {session_id} registered twice");
    }

    fn unregister(&mut self, session_id: SessionId) {
        match self.sessions.remove(&session_id) {
            Some(member) => {
                if let Some(ref room) = member.room {
                    self.rooms.remove(room, &session_id);
                }
                tracing::info!(%session_id, user_id = %member.user_id, "session unregistered");
                // Dropping `member` drops the only sender, closing the queue.
            }
            None if self.evicted.remove(&session_id) => {
                tracing::debug!(%session_id, "unregister after eviction");
            }
            None => {
                tracing::error!(%session_id, "unregister for unknown session");
                debug_assert!(false, "unregister for unknown session {session_id}");
            }
        }
    }

    fn join_room(&mut self, session_id: SessionId, room: String) {
        if room.is_empty() {
            tracing::warn!(%session_id, "ignoring join with empty room key");
            return;
        }
        let Some(member) = self.sessions.get_mut(&session_id) else {
            self.ignore_stale(session_id, "join_room");
            return;
        };
        if member.room.as_deref() == Some(room.as_str()) {
            return;
        }
        if let Some(old) = member.room.take() {
            self.rooms.remove(&old, &session_id);
            tracing::info!(%session_id, room = %old, "left room");
        }
        self.rooms.insert(&room, session_id);
        tracing::info!(%session_id, room = %room, "joined room");
        member.room = Some(room);
    }

    fn leave_room(&mut self, session_id: SessionId) {
        let Some(member) = self.sessions.get_mut(&session_id) else {
            self.ignore_stale(session_id, "leave_room");
            return;
        };
        if let Some(old) = member.room.take() {
            self.rooms.remove(&old, &session_id);
            tracing::info!(%session_id, room = %old, "left room");
        }
    }

    fn broadcast_all(&mut self, payload: Payload) {
        let targets: Vec<SessionId> = self.sessions.keys().copied().collect();
        let delivered = self.deliver(&targets, &payload);
        tracing::debug!(recipients = targets.len(), delivered, "broadcast to all");
    }

    fn broadcast_room(&mut self, room: &str, payload: Payload) {
        let Some(members) = self.rooms.members(room) else {
            return;
        };
        let targets: Vec<SessionId> = members.iter().copied().collect();
        let delivered = self.deliver(&targets, &payload);
        tracing::debug!(room, recipients = targets.len(), delivered, "broadcast to room");
    }

    /// Non-blocking push to each target; anyone who can't take it is evicted.
    fn deliver(&mut self, targets: &[SessionId], payload: &Payload) -> usize {
        let mut failed = Vec::new();
        for id in targets {
            let Some(member) = self.sessions.get(id) else {
                continue;
            };
            match member.outbound.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => failed.push((*id, "outbound queue full")),
                Err(TrySendError::Closed(_)) => failed.push((*id, "outbound queue closed")),
            }
        }
        for (id, reason) in &failed {
            self.evict(*id, reason);
        }
        targets.len() - failed.len()
    }

    fn evict(&mut self, session_id: SessionId, reason: &str) {
        let Some(member) = self.sessions.remove(&session_id) else {
            return;
        };
        if let Some(ref room) = member.room {
            self.rooms.remove(room, &session_id);
        }
        self.evicted.insert(session_id);
        tracing::warn!(%session_id, user_id = %member.user_id, reason, "evicting session");
    }

    fn ignore_stale(&self, session_id: SessionId, command: &str) {
        if self.evicted.contains(&session_id) {
            tracing::debug!(%session_id, command, "ignoring command for evicted session");
        } else {
            tracing::warn!(%session_id, command, "ignoring command for unknown session");
        }
    }
}

/// Cloneable sender side of the hub. Every method only enqueues a command.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn command(&self, command: HubCommand) {
        if self.tx.send(command).await.is_err() {
            tracing::error!("hub task is gone; command dropped");
        }
    }

    pub async fn register(&self, registration: Registration) {
        self.command(HubCommand::Register(registration)).await;
    }

    pub async fn unregister(&self, session_id: SessionId) {
        self.command(HubCommand::Unregister(session_id)).await;
    }

    pub async fn join_room(&self, session_id: SessionId, room: impl Into<String>) {
        self.command(HubCommand::JoinRoom {
            session_id,
            room: room.into(),
        })
        .await;
    }

    pub async fn leave_room(&self, session_id: SessionId) {
        self.command(HubCommand::LeaveRoom(session_id)).await;
    }

    /// Deliver to every live session. No dispatch path uses this; it is kept
    /// for server-side announcements.
    pub async fn broadcast_all(&self, payload: impl Into<Payload>) {
        self.command(HubCommand::BroadcastAll(payload.into())).await;
    }

    pub async fn broadcast_room(&self, room: impl Into<String>, payload: impl Into<Payload>) {
        self.command(HubCommand::BroadcastRoom {
            room: room.into(),
            payload: payload.into(),
        })
        .await;
    }

    /// Registry copy taken after every previously sent command has been applied.
    pub async fn snapshot(&self) -> Option<HubSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.command(HubCommand::Snapshot(reply)).await;
        rx.await.ok()
    }
}
