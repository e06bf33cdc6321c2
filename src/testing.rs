//! In-memory stores and a fake media provider for tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User, UserChanges};
use crate::error::{AppError, AppResult};
use crate::media::{MediaProvider, UploadedMedia};
use crate::moves::repo::MoveStore;
use crate::moves::repo_types::{Clip, Move, NewMove};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email == new.email || u.username == new.username)
        {
            return Err(AppError::Conflict("Duplicate value".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            img: new.img,
            from_google: new.from_google,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.username {
            user.username = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.password_hash {
            user.password_hash = Some(v);
        }
        if let Some(v) = changes.img {
            user.img = Some(v);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

/// Keeps insertion order; queries return most recent first like the
/// Postgres store.
#[derive(Default)]
pub struct MemoryMoveStore {
    moves: RwLock<Vec<Move>>,
}

impl MemoryMoveStore {
    async fn owned_newest_first(&self, owner: Uuid) -> Vec<Move> {
        self.moves
            .read()
            .await
            .iter()
            .rev()
            .filter(|m| m.user_id == owner)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MoveStore for MemoryMoveStore {
    async fn insert(&self, new: NewMove) -> AppResult<Move> {
        let now = OffsetDateTime::now_utc();
        let mv = Move {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name,
            desc: new.desc,
            img_url: new.img_url,
            clips: new.clips,
            tags: new.tags,
            start_date: new.start_date.unwrap_or(now),
            finished: new.finished,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.moves.write().await.push(mv.clone());
        Ok(mv)
    }

    async fn list_by_owner(&self, owner: Uuid) -> AppResult<Vec<Move>> {
        Ok(self.owned_newest_first(owner).await)
    }

    async fn find_by_tags(&self, owner: Uuid, tags: &[String], limit: i64) -> AppResult<Vec<Move>> {
        Ok(self
            .owned_newest_first(owner)
            .await
            .into_iter()
            .filter(|m| m.tags.iter().any(|t| tags.contains(t)))
            .take(limit as usize)
            .collect())
    }

    async fn search_by_name(&self, owner: Uuid, query: &str, limit: i64) -> AppResult<Vec<Move>> {
        let needle = query.to_lowercase();
        Ok(self
            .owned_newest_first(owner)
            .await
            .into_iter()
            .filter(|m| m.name.to_lowercase().contains(&needle))
            .take(limit as usize)
            .collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Move>> {
        Ok(self.moves.read().await.iter().find(|m| m.id == id).cloned())
    }

    async fn save(&self, mv: &Move) -> AppResult<Option<Move>> {
        let mut moves = self.moves.write().await;
        let Some(stored) = moves
            .iter_mut()
            .find(|m| m.id == mv.id && m.version == mv.version)
        else {
            return Ok(None);
        };
        *stored = Move {
            version: mv.version + 1,
            updated_at: OffsetDateTime::now_utc(),
            ..mv.clone()
        };
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: Uuid, version: i64) -> AppResult<bool> {
        let mut moves = self.moves.write().await;
        let before = moves.len();
        moves.retain(|m| !(m.id == id && m.version == version));
        Ok(moves.len() != before)
    }
}

/// Wraps `MemoryMoveStore` and plays a concurrent writer: either every save
/// loses its version race, or a clip lands just before the first delete.
#[derive(Default)]
pub struct ContendedMoveStore {
    inner: MemoryMoveStore,
    always_stale: bool,
    clip_before_delete: Mutex<Option<Clip>>,
    saves: AtomicUsize,
}

impl ContendedMoveStore {
    pub fn always_stale() -> Self {
        Self {
            always_stale: true,
            ..Default::default()
        }
    }

    pub fn adding_clip_before_delete(clip: Clip) -> Self {
        Self {
            clip_before_delete: Mutex::new(Some(clip)),
            ..Default::default()
        }
    }

    pub fn save_attempts(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MoveStore for ContendedMoveStore {
    async fn insert(&self, new: NewMove) -> AppResult<Move> {
        self.inner.insert(new).await
    }

    async fn list_by_owner(&self, owner: Uuid) -> AppResult<Vec<Move>> {
        self.inner.list_by_owner(owner).await
    }

    async fn find_by_tags(&self, owner: Uuid, tags: &[String], limit: i64) -> AppResult<Vec<Move>> {
        self.inner.find_by_tags(owner, tags, limit).await
    }

    async fn search_by_name(&self, owner: Uuid, query: &str, limit: i64) -> AppResult<Vec<Move>> {
        self.inner.search_by_name(owner, query, limit).await
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Move>> {
        self.inner.get(id).await
    }

    async fn save(&self, mv: &Move) -> AppResult<Option<Move>> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.always_stale {
            return Ok(None);
        }
        self.inner.save(mv).await
    }

    async fn delete(&self, id: Uuid, version: i64) -> AppResult<bool> {
        let pending = self.clip_before_delete.lock().unwrap().take();
        if let Some(clip) = pending {
            if let Some(mut current) = self.inner.get(id).await? {
                current.clips.push(clip);
                self.inner.save(&current).await?;
            }
        }
        self.inner.delete(id, version).await
    }
}

/// Records every call; `failing()` makes uploads and deletes error after
/// recording.
#[derive(Default)]
pub struct FakeMedia {
    fail: bool,
    uploads: Mutex<Vec<usize>>,
    deleted: Mutex<Vec<Vec<String>>>,
}

impl FakeMedia {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn deleted_batches(&self) -> Vec<Vec<String>> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn upload_sizes(&self) -> Vec<usize> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaProvider for FakeMedia {
    async fn upload(&self, body: Bytes, _content_type: &str) -> AppResult<UploadedMedia> {
        let n = {
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push(body.len());
            uploads.len()
        };
        if self.fail {
            return Err(AppError::Provider("upload refused".into()));
        }
        Ok(UploadedMedia {
            clip_url: format!("https://fake.local/moves/videos/{n}.mp4"),
            clip_id: format!("moves/videos/{n}"),
        })
    }

    async fn bulk_delete(&self, clip_ids: &[String]) -> AppResult<()> {
        self.deleted.lock().unwrap().push(clip_ids.to_vec());
        if self.fail {
            return Err(AppError::Provider("delete refused".into()));
        }
        Ok(())
    }

    fn sign_upload_params(&self, timestamp: i64) -> String {
        format!("sig-{timestamp}")
    }
}
