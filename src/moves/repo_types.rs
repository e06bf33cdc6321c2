use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// A video reference embedded in a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: Uuid,
    pub clip_url: String,
    pub clip_id: String, // media provider public id
    #[serde(default)]
    pub desc: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub desc: String,
    pub img_url: String,
    pub clips: Vec<Clip>,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    pub finished: bool,
    #[serde(skip)]
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Move {
    pub fn clip_mut(&mut self, clip_id: Uuid) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == clip_id)
    }

    /// Provider ids of every clip, in clip order.
    pub fn media_ids(&self) -> Vec<String> {
        self.clips.iter().map(|c| c.clip_id.clone()).collect()
    }
}

/// Row as stored in `moves`; clips live in a JSONB column.
#[derive(Debug, FromRow)]
pub struct MoveRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub img_url: String,
    pub clips: Json<Vec<Clip>>,
    pub tags: Vec<String>,
    pub start_date: OffsetDateTime,
    pub finished: bool,
    pub version: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<MoveRow> for Move {
    fn from(r: MoveRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            desc: r.description,
            img_url: r.img_url,
            clips: r.clips.0,
            tags: r.tags,
            start_date: r.start_date,
            finished: r.finished,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMove {
    pub user_id: Uuid,
    pub name: String,
    pub desc: String,
    pub img_url: String,
    pub clips: Vec<Clip>,
    pub tags: Vec<String>,
    pub start_date: Option<OffsetDateTime>, // defaults to creation time
    pub finished: bool,
}
