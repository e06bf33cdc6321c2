use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::services::non_blank,
    error::{AppError, AppResult},
    moves::repo_types::{Clip, Move},
};

/// Tags arrive either as `"legs,strength"` or as `["legs", "strength"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Delimited(String),
    List(Vec<String>),
}

impl TagsInput {
    /// Trimmed, non-empty, de-duplicated tags in first-seen order.
    pub fn into_set(self) -> Vec<String> {
        match self {
            Self::Delimited(raw) => parse_tags(&raw),
            Self::List(list) => dedup_tags(list),
        }
    }
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    dedup_tags(raw.split(',').map(str::to_string))
}

fn dedup_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// A clip to attach: either freshly uploaded through the proxy or uploaded
/// directly by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClipRequest {
    #[serde(default)]
    pub clip_url: Option<String>,
    #[serde(default)]
    pub clip_id: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

impl NewClipRequest {
    pub fn into_clip(self, now: OffsetDateTime) -> AppResult<Clip> {
        let (Some(clip_url), Some(clip_id)) = (non_blank(self.clip_url), non_blank(self.clip_id))
        else {
            return Err(AppError::Validation("clipUrl and clipId are required".into()));
        };
        Ok(Clip {
            id: Uuid::new_v4(),
            clip_url,
            clip_id,
            desc: self.desc.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClipRequest {
    #[serde(default)]
    pub clip_url: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
}

/// Fields shared by create and update; `name`, `desc`, `tags` and `finished`
/// are required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
    #[serde(default)]
    pub finished: Option<bool>,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
}

/// `MoveFields` after validation.
#[derive(Debug, Clone)]
pub struct ValidMoveFields {
    pub name: String,
    pub desc: String,
    pub tags: Vec<String>,
    pub finished: bool,
    pub img_url: Option<String>,
    pub start_date: Option<OffsetDateTime>,
}

impl MoveFields {
    pub fn validate(self) -> AppResult<ValidMoveFields> {
        let tags = self.tags.map(TagsInput::into_set).filter(|t| !t.is_empty());
        let (Some(name), Some(desc), Some(tags), Some(finished)) =
            (non_blank(self.name), non_blank(self.desc), tags, self.finished)
        else {
            return Err(AppError::Validation(
                "Request body is missing required fields".into(),
            ));
        };
        Ok(ValidMoveFields {
            name,
            desc,
            tags,
            finished,
            img_url: self.img_url.map(|u| u.trim().to_string()),
            start_date: self.start_date,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMoveRequest {
    #[serde(flatten)]
    pub fields: MoveFields,
    #[serde(default)]
    pub clips: Option<Vec<NewClipRequest>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMoveRequest {
    #[serde(flatten)]
    pub fields: MoveFields,
    /// Appended to the existing clips.
    #[serde(default)]
    pub clip: Option<NewClipRequest>,
}

#[derive(Debug, Deserialize)]
pub struct TagsQuery {
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MoveList {
    pub count: usize,
    pub data: Vec<Move>,
}

impl From<Vec<Move>> for MoveList {
    fn from(data: Vec<Move>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}
