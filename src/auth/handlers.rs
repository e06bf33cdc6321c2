use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{FederatedSignInRequest, LoginRequest, SignupRequest},
        extractors::{cleared_session_cookie, session_cookie},
        jwt::JwtKeys,
        services::{self, Session},
    },
    dto::MessageResponse,
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/google", post(google))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    let user = services::signup(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let session = services::login(&state, payload).await?;
    Ok(with_session_cookie(&state, session))
}

#[instrument(skip(state, payload))]
pub async fn google(
    State(state): State<AppState>,
    Json(payload): Json<FederatedSignInRequest>,
) -> AppResult<impl IntoResponse> {
    let session = services::federated_sign_in(&state, payload).await?;
    Ok(with_session_cookie(&state, session))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, cleared_session_cookie(&state.config.cookie))]),
        Json(MessageResponse::new("Logged out successfully")),
    )
}

fn with_session_cookie(state: &AppState, session: Session) -> impl IntoResponse {
    let max_age = JwtKeys::from_ref(state).ttl.as_secs();
    let cookie = session_cookie(&state.config.cookie, &session.token, max_age);
    (AppendHeaders([(header::SET_COOKIE, cookie)]), Json(session.user))
}
