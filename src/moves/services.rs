use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    moves::{
        dto::{parse_tags, CreateMoveRequest, NewClipRequest, UpdateClipRequest, UpdateMoveRequest},
        repo_types::{Clip, Move, NewMove},
    },
    state::AppState,
};

pub const TAG_SEARCH_LIMIT: i64 = 20;
pub const NAME_SEARCH_LIMIT: i64 = 40;

/// Attempts at a versioned save before giving up on a contended move.
const MAX_SAVE_ATTEMPTS: usize = 3;

pub async fn create(st: &AppState, owner: Uuid, req: CreateMoveRequest) -> AppResult<Move> {
    let fields = req.fields.validate()?;
    let now = OffsetDateTime::now_utc();
    let clips = req
        .clips
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.into_clip(now))
        .collect::<AppResult<Vec<Clip>>>()?;

    let mv = st
        .moves
        .insert(NewMove {
            user_id: owner,
            name: fields.name,
            desc: fields.desc,
            img_url: fields.img_url.unwrap_or_default(),
            clips,
            tags: fields.tags,
            start_date: fields.start_date,
            finished: fields.finished,
        })
        .await?;

    info!(move_id = %mv.id, %owner, clips = mv.clips.len(), "move created");
    Ok(mv)
}

pub async fn list(st: &AppState, owner: Uuid) -> AppResult<Vec<Move>> {
    st.moves.list_by_owner(owner).await
}

pub async fn find_by_tags(st: &AppState, owner: Uuid, raw_tags: &str) -> AppResult<Vec<Move>> {
    let tags = parse_tags(raw_tags);
    if tags.is_empty() {
        return Err(AppError::Validation("tags query is required".into()));
    }
    st.moves.find_by_tags(owner, &tags, TAG_SEARCH_LIMIT).await
}

pub async fn search_by_name(st: &AppState, owner: Uuid, query: &str) -> AppResult<Vec<Move>> {
    st.moves.search_by_name(owner, query, NAME_SEARCH_LIMIT).await
}

pub async fn get(st: &AppState, owner: Uuid, id: Uuid) -> AppResult<Move> {
    let mv = st
        .moves
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Move not found".into()))?;
    if mv.user_id != owner {
        warn!(move_id = %id, %owner, "move owned by another user");
        return Err(AppError::Forbidden("You can only access your own moves".into()));
    }
    Ok(mv)
}

/// Loads the owner's move, applies `f` and saves it with a version check,
/// reloading and reapplying when another writer saved first.
async fn mutate<T, F>(st: &AppState, owner: Uuid, id: Uuid, f: F) -> AppResult<T>
where
    F: Fn(&mut Move) -> AppResult<T>,
{
    for attempt in 1..=MAX_SAVE_ATTEMPTS {
        let mut mv = get(st, owner, id).await?;
        let out = f(&mut mv)?;
        if st.moves.save(&mv).await?.is_some() {
            return Ok(out);
        }
        warn!(move_id = %id, attempt, "concurrent move update, retrying");
    }
    Err(AppError::Conflict(
        "Move was modified concurrently, try again".into(),
    ))
}

pub async fn update(st: &AppState, owner: Uuid, id: Uuid, req: UpdateMoveRequest) -> AppResult<()> {
    let fields = req.fields.validate()?;
    let new_clip = req
        .clip
        .map(|c| c.into_clip(OffsetDateTime::now_utc()))
        .transpose()?;

    mutate(st, owner, id, |mv| {
        mv.name = fields.name.clone();
        mv.desc = fields.desc.clone();
        mv.tags = fields.tags.clone();
        mv.finished = fields.finished;
        if let Some(url) = &fields.img_url {
            mv.img_url = url.clone();
        }
        if let Some(start) = fields.start_date {
            mv.start_date = start;
        }
        if let Some(clip) = &new_clip {
            mv.clips.push(clip.clone());
        }
        Ok(())
    })
    .await?;

    info!(move_id = %id, %owner, "move updated");
    Ok(())
}

/// Deletes the move after a best-effort delete of its remote clips. The
/// delete is versioned: if a clip was added meanwhile, the move is reloaded
/// and the new clips' media goes out in a follow-up batch.
pub async fn delete(st: &AppState, owner: Uuid, id: Uuid) -> AppResult<()> {
    let mut sent: Vec<String> = Vec::new();
    for attempt in 1..=MAX_SAVE_ATTEMPTS {
        let mv = get(st, owner, id).await?;

        let pending: Vec<String> = mv
            .media_ids()
            .into_iter()
            .filter(|m| !sent.contains(m))
            .collect();
        if !pending.is_empty() {
            if let Err(e) = st.media.bulk_delete(&pending).await {
                warn!(error = %e, move_id = %id, count = pending.len(), "clip media delete failed; continuing");
            }
            sent.extend(pending);
        }

        if st.moves.delete(id, mv.version).await? {
            info!(move_id = %id, %owner, clips = sent.len(), "move deleted");
            return Ok(());
        }
        warn!(move_id = %id, attempt, "move changed during delete, retrying");
    }
    Err(AppError::Conflict(
        "Move was modified concurrently, try again".into(),
    ))
}

pub async fn add_clip(st: &AppState, owner: Uuid, id: Uuid, req: NewClipRequest) -> AppResult<Clip> {
    let clip = req.into_clip(OffsetDateTime::now_utc())?;
    mutate(st, owner, id, |mv| {
        mv.clips.push(clip.clone());
        Ok(())
    })
    .await?;
    info!(move_id = %id, clip = %clip.id, "clip added");
    Ok(clip)
}

pub async fn update_clip(
    st: &AppState,
    owner: Uuid,
    id: Uuid,
    clip_id: Uuid,
    req: UpdateClipRequest,
) -> AppResult<Clip> {
    let now = OffsetDateTime::now_utc();
    mutate(st, owner, id, |mv| {
        let clip = mv
            .clip_mut(clip_id)
            .ok_or_else(|| AppError::NotFound("Clip not found".into()))?;
        if let Some(url) = req.clip_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            clip.clip_url = url.to_string();
        }
        if let Some(desc) = &req.desc {
            clip.desc = desc.clone();
        }
        clip.updated_at = now;
        Ok(clip.clone())
    })
    .await
}

pub async fn remove_clip(st: &AppState, owner: Uuid, id: Uuid, clip_id: Uuid) -> AppResult<()> {
    mutate(st, owner, id, |mv| {
        let before = mv.clips.len();
        mv.clips.retain(|c| c.id != clip_id);
        if mv.clips.len() == before {
            return Err(AppError::NotFound("Clip not found".into()));
        }
        Ok(())
    })
    .await?;
    info!(move_id = %id, clip = %clip_id, "clip removed");
    Ok(())
}
