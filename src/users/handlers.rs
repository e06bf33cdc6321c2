use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{dto::UpdateUserRequest, services};
use crate::{auth::AuthUser, dto::MessageResponse, error::AppResult, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/:id", put(update_user).delete(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::update(&state, user_id, id, payload).await?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    services::delete(&state, user_id, id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}
