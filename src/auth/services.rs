use axum::extract::FromRef;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{FederatedSignInRequest, LoginRequest, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult},
    state::AppState,
};

/// A user together with a freshly issued session token.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed, non-empty value or `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Random numeric suffixes tried before falling back to a UUID one.
const USERNAME_SUFFIX_ATTEMPTS: usize = 5;

/// `base` if free, otherwise `base` with a suffix no one has taken yet.
async fn available_username(st: &AppState, base: &str) -> AppResult<String> {
    if st.users.find_by_username(base).await?.is_none() {
        return Ok(base.to_string());
    }
    for _ in 0..USERNAME_SUFFIX_ATTEMPTS {
        let suffix: u32 = rand::thread_rng().gen_range(1000..10000);
        let candidate = format!("{base}{suffix}");
        if st.users.find_by_username(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }
    Ok(format!("{base}-{}", Uuid::new_v4().simple()))
}

pub async fn signup(st: &AppState, req: SignupRequest) -> AppResult<User> {
    let (Some(username), Some(email), Some(password)) = (
        non_blank(req.username),
        non_blank(req.email).map(|e| normalize_email(&e)),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("Missing required fields".into()));
    };

    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }

    if st.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }
    if st.users.find_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already taken");
        return Err(AppError::Conflict("Username already taken".into()));
    }

    let hash = hash_password(&password)?;
    let user = st
        .users
        .create(NewUser {
            username,
            email,
            password_hash: Some(hash),
            img: None,
            from_google: false,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn login(st: &AppState, req: LoginRequest) -> AppResult<Session> {
    let (Some(email), Some(password)) = (
        non_blank(req.email).map(|e| normalize_email(&e)),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("Missing email or password".into()));
    };

    let user = st
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login unknown email");
            AppError::NotFound("User not found".into())
        })?;

    if !verify_password(&password, user.password_hash.as_deref())? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Auth("Invalid password".into()));
    }

    let token = JwtKeys::from_ref(st).sign(user.id, Some(&user.email))?;
    info!(user_id = %user.id, "user logged in");
    Ok(Session { user, token })
}

/// Signs in the account with this email, creating a federated one on first
/// use.
pub async fn federated_sign_in(st: &AppState, req: FederatedSignInRequest) -> AppResult<Session> {
    let email = non_blank(req.email)
        .map(|e| normalize_email(&e))
        .ok_or_else(|| AppError::Validation("Missing email".into()))?;
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }

    let user = match st.users.find_by_email(&email).await? {
        Some(existing) => existing,
        None => {
            let base = non_blank(req.username)
                .or_else(|| non_blank(req.name))
                .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
            let username = available_username(st, &base).await?;
            let created = st
                .users
                .create(NewUser {
                    username,
                    email,
                    password_hash: None,
                    img: non_blank(req.img),
                    from_google: true,
                })
                .await?;
            info!(user_id = %created.id, "federated user created");
            created
        }
    };

    let token = JwtKeys::from_ref(st).sign(user.id, None)?;
    info!(user_id = %user.id, "federated sign-in");
    Ok(Session { user, token })
}
