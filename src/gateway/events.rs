use serde::{Deserialize, Serialize};

/// Kind of an application message travelling over the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    JoinRoom,
    LeaveRoom,
    ChatMessage,
}

/// Wire envelope, used in both directions.
///
/// Every field except `type` may be omitted by clients. `user_id` is never
/// trusted from the wire; the session overwrites it before routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub room_id: String,
}

impl Envelope {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> String {
        // Only strings and a unit enum; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Close codes sent to clients when the server ends a session.
pub mod close_code {
    pub const POLICY: u16 = 1008;
    pub const DECODE_ERROR: u16 = 4002;
    pub const SESSION_TIMED_OUT: u16 = 4009;
}
