use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserChanges};
use crate::error::AppResult;

/// Credential store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn create(&self, new: NewUser) -> AppResult<User>;
    /// Returns `None` if no user has this ID.
    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>>;
    /// Returns `false` if no user has this ID.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, img, from_google, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.find_one("username", username).await
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, img, from_google)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.img)
            .bind(new.from_google)
            .fetch_one(&self.db)
            .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET username      = COALESCE($2, username),
                   email         = COALESCE($3, email),
                   password_hash = COALESCE($4, password_hash),
                   img           = COALESCE($5, img),
                   updated_at    = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(&changes.password_hash)
            .bind(&changes.img)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
