use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    CreateMoveRequest, MoveList, NewClipRequest, SearchQuery, TagsQuery, UpdateClipRequest,
    UpdateMoveRequest,
};
use super::repo_types::Move;
use super::services;
use crate::{
    auth::AuthUser,
    dto::MessageResponse,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn move_routes() -> Router<AppState> {
    Router::new()
        .route("/moves", get(list_moves).post(create_move))
        .route("/moves/tags", get(find_by_tags))
        .route("/moves/search", get(search_by_name))
        .route(
            "/moves/:id",
            get(get_move).put(update_move).delete(delete_move),
        )
        .route("/moves/:id/clips", axum::routing::post(add_clip))
        .route(
            "/moves/:id/clips/:clip_id",
            put(update_clip).delete(remove_clip),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_move(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMoveRequest>,
) -> AppResult<impl IntoResponse> {
    let mv = services::create(&state, user_id, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/moves/{}", mv.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(mv)))
}

#[instrument(skip(state))]
pub async fn list_moves(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<MoveList>> {
    let moves = services::list(&state, user_id).await?;
    Ok(Json(moves.into()))
}

#[instrument(skip(state))]
pub async fn find_by_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<TagsQuery>,
) -> AppResult<Json<Vec<Move>>> {
    let moves = services::find_by_tags(&state, user_id, q.tags.as_deref().unwrap_or_default()).await?;
    Ok(Json(moves))
}

#[instrument(skip(state))]
pub async fn search_by_name(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<MoveList>> {
    let query = q
        .q
        .ok_or_else(|| AppError::Validation("q query is required".into()))?;
    let moves = services::search_by_name(&state, user_id, &query).await?;
    Ok(Json(moves.into()))
}

#[instrument(skip(state))]
pub async fn get_move(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Move>> {
    Ok(Json(services::get(&state, user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_move(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMoveRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::update(&state, user_id, id, payload).await?;
    Ok(Json(MessageResponse::new("Move updated successfully")))
}

#[instrument(skip(state))]
pub async fn delete_move(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    services::delete(&state, user_id, id).await?;
    Ok(Json(MessageResponse::new("Move deleted successfully")))
}

#[instrument(skip(state, payload))]
pub async fn add_clip(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewClipRequest>,
) -> AppResult<impl IntoResponse> {
    services::add_clip(&state, user_id, id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Clip added successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_clip(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, clip_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateClipRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::update_clip(&state, user_id, id, clip_id, payload).await?;
    Ok(Json(MessageResponse::new("Clip updated successfully")))
}

#[instrument(skip(state))]
pub async fn remove_clip(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, clip_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<MessageResponse>> {
    services::remove_clip(&state, user_id, id, clip_id).await?;
    Ok(Json(MessageResponse::new("Clip removed successfully")))
}
