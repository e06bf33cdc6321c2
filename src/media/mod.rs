//! External video hosting.

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{error::AppResult, state::AppState};

pub mod cloudinary;
pub mod handlers;

/// A clip stored by the media provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub clip_url: String,
    pub clip_id: String,
}

#[async_trait]
pub trait MediaProvider: Send + Sync {
    async fn upload(&self, body: Bytes, content_type: &str) -> AppResult<UploadedMedia>;

    /// Deletes every listed clip in one call. Empty input is a no-op.
    async fn bulk_delete(&self, clip_ids: &[String]) -> AppResult<()>;

    /// Signature the frontend sends with a direct upload made at `timestamp`.
    fn sign_upload_params(&self, timestamp: i64) -> String;
}

pub fn router() -> Router<AppState> {
    handlers::media_routes()
}
