use serde::Deserialize;

/// Request body for first-party signup. Fields are optional here so that a
/// missing one is reported as a validation error rather than a body rejection.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Profile forwarded by the frontend after a "sign in with Google" flow.
#[derive(Debug, Deserialize)]
pub struct FederatedSignInRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
}
