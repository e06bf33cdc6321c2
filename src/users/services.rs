use tracing::{info, warn};
use uuid::Uuid;

use super::dto::UpdateUserRequest;
use crate::{
    auth::{
        password::hash_password,
        repo_types::{User, UserChanges},
        services::{is_valid_email, non_blank, normalize_email},
    },
    error::{AppError, AppResult},
    state::AppState,
};

fn ensure_self(caller: Uuid, target: Uuid, action: &str) -> AppResult<()> {
    if caller != target {
        warn!(%caller, %target, "user tried to {action} another account");
        return Err(AppError::Forbidden(format!("You can only {action} your account")));
    }
    Ok(())
}

pub async fn update(
    st: &AppState,
    caller: Uuid,
    target: Uuid,
    req: UpdateUserRequest,
) -> AppResult<User> {
    ensure_self(caller, target, "update")?;

    let email = non_blank(req.email).map(|e| normalize_email(&e));
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(AppError::Validation("Invalid email".into()));
        }
        if let Some(other) = st.users.find_by_email(email).await? {
            if other.id != target {
                return Err(AppError::Conflict("Email already registered".into()));
            }
        }
    }
    let username = non_blank(req.username);
    if let Some(username) = &username {
        if let Some(other) = st.users.find_by_username(username).await? {
            if other.id != target {
                return Err(AppError::Conflict("Username already taken".into()));
            }
        }
    }
    let password_hash = match req.password.filter(|p| !p.is_empty()) {
        Some(p) => Some(hash_password(&p)?),
        None => None,
    };

    let user = st
        .users
        .update(
            target,
            UserChanges {
                username,
                email,
                password_hash,
                img: non_blank(req.img),
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, "user updated");
    Ok(user)
}

/// Deletes the account. The user's moves are left in place.
pub async fn delete(st: &AppState, caller: Uuid, target: Uuid) -> AppResult<()> {
    ensure_self(caller, target, "delete")?;
    if !st.users.delete(target).await? {
        return Err(AppError::NotFound("User not found".into()));
    }
    info!(user_id = %target, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{dto::LoginRequest, dto::SignupRequest, services as auth};

    async fn signup(st: &AppState, name: &str) -> User {
        auth::signup(
            st,
            SignupRequest {
                username: Some(name.into()),
                email: Some(format!("{name}@x.com")),
                password: Some("pw123".into()),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn cannot_touch_another_account() {
        let st = AppState::fake();
        let alice = signup(&st, "alice").await;
        let bob = signup(&st, "bob").await;

        let err = update(&st, bob.id, alice.id, UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = delete(&st, bob.id, alice.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(st.users.find_by_id(alice.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn password_change_is_rehashed() {
        let st = AppState::fake();
        let alice = signup(&st, "alice").await;

        let updated = update(
            &st,
            alice.id,
            alice.id,
            UpdateUserRequest {
                password: Some("new-pw".into()),
                img: Some("https://img/a.png".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_ne!(updated.password_hash.as_deref(), Some("new-pw"));
        assert_eq!(updated.img.as_deref(), Some("https://img/a.png"));
        assert_eq!(updated.username, "alice");

        let login = |pw: &str| LoginRequest {
            email: Some("alice@x.com".into()),
            password: Some(pw.into()),
        };
        assert!(auth::login(&st, login("new-pw")).await.is_ok());
        assert!(auth::login(&st, login("pw123")).await.is_err());
    }

    #[tokio::test]
    async fn update_rejects_taken_username() {
        let st = AppState::fake();
        let alice = signup(&st, "alice").await;
        signup(&st, "bob").await;

        let err = update(
            &st,
            alice.id,
            alice.id,
            UpdateUserRequest {
                username: Some("bob".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_own_account() {
        let st = AppState::fake();
        let alice = signup(&st, "alice").await;
        delete(&st, alice.id, alice.id).await.unwrap();
        assert!(st.users.find_by_id(alice.id).await.unwrap().is_none());
        assert!(matches!(
            delete(&st, alice.id, alice.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
