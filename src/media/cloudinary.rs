use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use time::OffsetDateTime;
use tracing::{debug, error, info};

use super::{MediaProvider, UploadedMedia};
use crate::{
    config::MediaConfig,
    error::{AppError, AppResult},
};

/// Cloudinary request signature: parameters sorted by name, empty values
/// dropped, joined as `k=v&k=v`, secret appended, SHA-1 hex.
pub fn api_sign_request(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Clone)]
pub struct Cloudinary {
    http: reqwest::Client,
    cfg: MediaConfig,
}

impl Cloudinary {
    pub fn new(cfg: MediaConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("build cloudinary http client")?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.cfg.api_base.trim_end_matches('/'),
            self.cfg.cloud_name,
            path
        )
    }

    async fn check(res: reqwest::Response, what: &str) -> AppResult<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        error!(%status, body = %body, "cloudinary {what} failed");
        Err(AppError::Provider(format!("{what} failed with status {status}")))
    }
}

#[async_trait]
impl MediaProvider for Cloudinary {
    async fn upload(&self, body: Bytes, content_type: &str) -> AppResult<UploadedMedia> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = api_sign_request(
            &[
                ("folder", self.cfg.folder.clone()),
                ("timestamp", timestamp.clone()),
            ],
            &self.cfg.api_secret,
        );

        let size = body.len();
        let part = Part::bytes(body.to_vec())
            .file_name("clip")
            .mime_str(content_type)
            .map_err(|_| AppError::Validation(format!("Invalid content type: {content_type}")))?;
        let form = Form::new()
            .part("file", part)
            .text("api_key", self.cfg.api_key.clone())
            .text("folder", self.cfg.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let res = self
            .http
            .post(self.endpoint("video/upload"))
            .multipart(form)
            .send()
            .await?;
        let parsed: UploadResponse = Self::check(res, "upload").await?.json().await?;

        info!(clip_id = %parsed.public_id, size, "clip uploaded");
        Ok(UploadedMedia {
            clip_url: parsed.secure_url,
            clip_id: parsed.public_id,
        })
    }

    async fn bulk_delete(&self, clip_ids: &[String]) -> AppResult<()> {
        if clip_ids.is_empty() {
            return Ok(());
        }
        let query: Vec<(&str, &str)> = clip_ids
            .iter()
            .map(|id| ("public_ids[]", id.as_str()))
            .collect();

        let res = self
            .http
            .delete(self.endpoint("resources/video/upload"))
            .basic_auth(&self.cfg.api_key, Some(&self.cfg.api_secret))
            .query(&query)
            .send()
            .await?;
        Self::check(res, "bulk delete").await?;

        debug!(count = clip_ids.len(), "clips deleted");
        Ok(())
    }

    fn sign_upload_params(&self, timestamp: i64) -> String {
        api_sign_request(
            &[
                ("timestamp", timestamp.to_string()),
                ("upload_preset", self.cfg.upload_preset.clone()),
            ],
            &self.cfg.api_secret,
        )
    }
}
