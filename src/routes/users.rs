use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::models::user::{CreateUser, User};
use crate::models::DataResponse;
use crate::state::AppState;

pub async fn create_user(
    state: State<AppState>,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<DataResponse<User>>), AppError> {
    input
        .validate()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;
    let user = db::users::create_user(&state.db, &input).await?;
    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(user))))
}

pub async fn list_users(state: State<AppState>) -> Result<Json<DataResponse<Vec<User>>>, AppError> {
    let users = db::users::list_users(&state.db).await?;
    Ok(Json(DataResponse::new(users)))
}

pub async fn get_user(
    state: State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DataResponse<User>>, AppError> {
    let user = db::users::get_user(&state.db, &user_id).await?;
    Ok(Json(DataResponse::new(user)))
}
