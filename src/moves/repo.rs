use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::moves::repo_types::{Move, MoveRow, NewMove};

/// Move store. Clips are embedded in their move and persisted with it.
#[async_trait]
pub trait MoveStore: Send + Sync {
    async fn insert(&self, new: NewMove) -> AppResult<Move>;
    /// Most recent first.
    async fn list_by_owner(&self, owner: Uuid) -> AppResult<Vec<Move>>;
    /// Moves whose tag set intersects `tags`.
    async fn find_by_tags(&self, owner: Uuid, tags: &[String], limit: i64) -> AppResult<Vec<Move>>;
    /// Case-insensitive substring match on the name.
    async fn search_by_name(&self, owner: Uuid, query: &str, limit: i64) -> AppResult<Vec<Move>>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Move>>;
    /// Writes `mv` if the stored version still equals `mv.version`, bumping
    /// it. `None` means another writer got there first (or the move is gone).
    async fn save(&self, mv: &Move) -> AppResult<Option<Move>>;
    /// Deletes the move if its stored version still equals `version`.
    /// `false` means it is gone or another writer saved first.
    async fn delete(&self, id: Uuid, version: i64) -> AppResult<bool>;
}

const MOVE_COLUMNS: &str = "id, user_id, name, description, img_url, clips, tags, \
     start_date, finished, version, created_at, updated_at";

/// Escapes `%`, `_` and `\` so `query` matches literally inside `LIKE`.
pub(crate) fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Clone)]
pub struct PgMoveStore {
    db: PgPool,
}

impl PgMoveStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MoveStore for PgMoveStore {
    async fn insert(&self, new: NewMove) -> AppResult<Move> {
        let sql = format!(
            r#"
            INSERT INTO moves (user_id, name, description, img_url, clips, tags, start_date, finished)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()), $8)
            RETURNING {MOVE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MoveRow>(&sql)
            .bind(new.user_id)
            .bind(&new.name)
            .bind(&new.desc)
            .bind(&new.img_url)
            .bind(Json(&new.clips))
            .bind(&new.tags)
            .bind(new.start_date)
            .bind(new.finished)
            .fetch_one(&self.db)
            .await?;
        Ok(row.into())
    }

    async fn list_by_owner(&self, owner: Uuid) -> AppResult<Vec<Move>> {
        let sql = format!(
            "SELECT {MOVE_COLUMNS} FROM moves WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, MoveRow>(&sql)
            .bind(owner)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Move::from).collect())
    }

    async fn find_by_tags(&self, owner: Uuid, tags: &[String], limit: i64) -> AppResult<Vec<Move>> {
        let sql = format!(
            r#"
            SELECT {MOVE_COLUMNS}
              FROM moves
             WHERE user_id = $1 AND tags && $2
             ORDER BY created_at DESC
             LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, MoveRow>(&sql)
            .bind(owner)
            .bind(tags)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Move::from).collect())
    }

    async fn search_by_name(&self, owner: Uuid, query: &str, limit: i64) -> AppResult<Vec<Move>> {
        let sql = format!(
            r#"
            SELECT {MOVE_COLUMNS}
              FROM moves
             WHERE user_id = $1 AND name ILIKE $2 ESCAPE '\'
             ORDER BY created_at DESC
             LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, MoveRow>(&sql)
            .bind(owner)
            .bind(format!("%{}%", escape_like(query)))
            .bind(limit)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Move::from).collect())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Move>> {
        let sql = format!("SELECT {MOVE_COLUMNS} FROM moves WHERE id = $1");
        let row = sqlx::query_as::<_, MoveRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Move::from))
    }

    async fn save(&self, mv: &Move) -> AppResult<Option<Move>> {
        let sql = format!(
            r#"
            UPDATE moves
               SET name        = $3,
                   description = $4,
                   img_url     = $5,
                   clips       = $6,
                   tags        = $7,
                   start_date  = $8,
                   finished    = $9,
                   version     = version + 1,
                   updated_at  = now()
             WHERE id = $1 AND version = $2
            RETURNING {MOVE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MoveRow>(&sql)
            .bind(mv.id)
            .bind(mv.version)
            .bind(&mv.name)
            .bind(&mv.desc)
            .bind(&mv.img_url)
            .bind(Json(&mv.clips))
            .bind(&mv.tags)
            .bind(mv.start_date)
            .bind(mv.finished)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Move::from))
    }

    async fn delete(&self, id: Uuid, version: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM moves WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(version)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_makes_wildcards_literal() {
        assert_eq!(escape_like("squat"), "squat");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
