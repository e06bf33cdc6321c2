//! Error type shared by every service and handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials, or a missing, invalid or expired session token.
    #[error("{0}")]
    Auth(String),

    /// Authenticated, but not the owner of the resource.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique field, or a concurrent modification that could not be
    /// reconciled.
    #[error("{0}")]
    Conflict(String),

    /// Media provider upload/delete failure.
    #[error("media provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            // 23505 = unique_violation
            if db.code().as_deref() == Some("23505") {
                let what = match db.constraint() {
                    Some(c) if c.contains("username") => "Username already taken",
                    Some(c) if c.contains("email") => "Email already registered",
                    _ => "Duplicate value",
                };
                return Self::Conflict(what.into());
            }
        }
        Self::Internal(anyhow::Error::new(e))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        Self::Provider(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
