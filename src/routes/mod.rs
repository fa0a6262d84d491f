mod gateway;
mod health;
mod rooms;
mod users;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ping", get(health::ping))
        .route("/version", get(health::version))
        .route("/ws", get(crate::gateway::ws_upgrade))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        // Rooms
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/rooms/{room_id}", get(rooms::get_room))
        .route("/rooms/{room_id}/join/{user_id}", post(rooms::join_room))
        // Live hub state
        .route("/gateway/stats", get(gateway::get_stats))
}
