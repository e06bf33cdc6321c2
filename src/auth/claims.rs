use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload carried in the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // user ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>, // absent for federated sign-in
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
    pub iss: String,
    pub aud: String,
}
