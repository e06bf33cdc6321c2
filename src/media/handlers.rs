use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::AuthUser,
    dto::MessageResponse,
    error::{AppError, AppResult},
    state::AppState,
};

const MAX_CLIP_BYTES: usize = 100 * 1024 * 1024;

pub fn media_routes() -> Router<AppState> {
    Router::new()
        .route("/moves/cloudinary-signature", get(upload_signature))
        .route("/moves/cloudinary/delete-clips", delete(delete_clips))
        .route(
            "/moves/cloudinary/upload",
            post(upload_clip).layer(DefaultBodyLimit::max(MAX_CLIP_BYTES)),
        )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadSignature {
    pub signature: String,
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
pub struct ClipRef {
    #[serde(rename = "clipId")]
    pub clip_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteClipsRequest {
    #[serde(default)]
    pub clips: Option<Vec<ClipRef>>,
}

#[instrument(skip(state))]
pub async fn upload_signature(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Json<UploadSignature> {
    let timestamp = OffsetDateTime::now_utc().unix_timestamp();
    Json(UploadSignature {
        signature: state.media.sign_upload_params(timestamp),
        timestamp,
    })
}

/// Proxy upload: multipart field `clip`.
#[instrument(skip(state, mp))]
pub async fn upload_clip(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> AppResult<impl IntoResponse> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        if field.name() != Some("clip") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if data.is_empty() {
            break;
        }
        let media = state.media.upload(data, &content_type).await?;
        info!(%user_id, clip_id = %media.clip_id, "clip uploaded via proxy");
        return Ok((StatusCode::CREATED, Json(media)));
    }
    Err(AppError::Validation("No file uploaded".into()))
}

#[instrument(skip(state, payload))]
pub async fn delete_clips(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<DeleteClipsRequest>,
) -> AppResult<Json<MessageResponse>> {
    let clips = payload
        .clips
        .ok_or_else(|| AppError::Validation("clips not found".into()))?;
    let ids: Vec<String> = clips.into_iter().map(|c| c.clip_id).collect();
    state.media.bulk_delete(&ids).await?;
    info!(%user_id, count = ids.len(), "clips deleted");
    Ok(Json(MessageResponse::new("Clips deleted successfully")))
}
