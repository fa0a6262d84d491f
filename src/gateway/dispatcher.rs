use super::events::{Envelope, MessageKind};
use super::hub::{HubCommand, HubHandle};
use super::session::{Payload, Session};

/// Translate one decoded inbound message into the hub command it implies,
/// keeping the session's local room view in step with what it asks for.
///
/// The sender is always stamped from the session. Returns `None` when the
/// message has no effect (chat outside a room, join with an empty key).
pub fn route(session: &mut Session, mut envelope: Envelope) -> Option<HubCommand> {
    envelope.user_id = session.user_id.clone();

    match envelope.kind {
        MessageKind::JoinRoom => {
            if envelope.room_id.is_empty() {
                tracing::warn!(session_id = %session.id, "join_room without room_id");
                return None;
            }
            session.room = Some(envelope.room_id.clone());
            Some(HubCommand::JoinRoom {
                session_id: session.id,
                room: envelope.room_id,
            })
        }
        MessageKind::LeaveRoom => {
            session.room = None;
            Some(HubCommand::LeaveRoom(session.id))
        }
        MessageKind::ChatMessage => {
            let room = session.room.clone()?;
            envelope.room_id = room.clone();
            Some(HubCommand::BroadcastRoom {
                room,
                payload: Payload::from(envelope.encode()),
            })
        }
    }
}

pub async fn dispatch(hub: &HubHandle, session: &mut Session, envelope: Envelope) {
    if let Some(command) = route(session, envelope) {
        hub.command(command).await;
    }
}
