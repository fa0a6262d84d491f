use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::AppError;
use crate::models::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RoomStats {
    pub room_id: String,
    pub members: usize,
}

#[derive(Debug, Serialize)]
pub struct GatewayStats {
    pub sessions: usize,
    pub rooms: Vec<RoomStats>,
    pub started_at: String,
    pub uptime_secs: i64,
}

/// Live view of the hub: connected sessions and occupied rooms.
pub async fn get_stats(
    state: State<AppState>,
) -> Result<Json<DataResponse<GatewayStats>>, AppError> {
    let snapshot = state
        .hub
        .snapshot()
        .await
        .ok_or_else(|| AppError::Internal("hub is not running".to_string()))?;

    let rooms = snapshot
        .rooms
        .iter()
        .map(|(room_id, members)| RoomStats {
            room_id: room_id.clone(),
            members: members.len(),
        })
        .collect();

    Ok(Json(DataResponse::new(GatewayStats {
        sessions: snapshot.sessions.len(),
        rooms,
        started_at: state.started_at.to_rfc3339(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })))
}
