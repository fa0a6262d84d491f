use serde::{Deserialize, Serialize};

use super::user::User;

/// A directory room with its registered members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub users: Vec<User>,
}

/// Room row before members are loaded.
#[derive(Debug, Clone)]
pub struct RoomRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

impl RoomRow {
    pub fn with_users(self, users: Vec<User>) -> Room {
        Room {
            id: self.id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            users,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRoom {
    pub name: String,
    #[serde(default)]
    pub description: String,
}
