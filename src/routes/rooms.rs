use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::models::room::{CreateRoom, Room};
use crate::models::DataResponse;
use crate::state::AppState;

pub async fn create_room(
    state: State<AppState>,
    Json(input): Json<CreateRoom>,
) -> Result<(StatusCode, Json<DataResponse<Room>>), AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    let room = db::rooms::create_room(&state.db, &input).await?;
    tracing::info!(room_id = %room.id, "room created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(room))))
}

pub async fn list_rooms(state: State<AppState>) -> Result<Json<DataResponse<Vec<Room>>>, AppError> {
    let rooms = db::rooms::list_rooms(&state.db).await?;
    Ok(Json(DataResponse::new(rooms)))
}

pub async fn get_room(
    state: State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<DataResponse<Room>>, AppError> {
    let room = db::rooms::get_room(&state.db, &room_id).await?;
    Ok(Json(DataResponse::new(room)))
}

pub async fn join_room(
    state: State<AppState>,
    Path((room_id, user_id)): Path<(String, String)>,
) -> Result<Json<DataResponse<Room>>, AppError> {
    db::rooms::add_user(&state.db, &room_id, &user_id).await?;
    let room = db::rooms::get_room(&state.db, &room_id).await?;
    Ok(Json(DataResponse::new(room)))
}
