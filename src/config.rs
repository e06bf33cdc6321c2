use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Attributes of the `access_token` cookie.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub secure: bool,
    pub same_site: String,
}

impl CookieConfig {
    /// Production serves the frontend from another site, so the cookie has to
    /// be cross-site and therefore secure.
    pub fn for_env(app_env: &str) -> Self {
        if app_env.eq_ignore_ascii_case("production") {
            Self {
                secure: true,
                same_site: "None".into(),
            }
        } else {
            Self {
                secure: false,
                same_site: "Lax".into(),
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub api_base: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub upload_preset: String,
    pub folder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub client_origin: Option<String>,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "movetrack".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "movetrack-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let cookie = CookieConfig::for_env(&std::env::var("APP_ENV").unwrap_or_default());
        let media = MediaConfig {
            api_base: std::env::var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|_| "https://api.cloudinary.com/v1_1".into()),
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME")?,
            api_key: std::env::var("CLOUDINARY_API_KEY")?,
            api_secret: std::env::var("CLOUDINARY_API_SECRET")?,
            upload_preset: std::env::var("CLOUDINARY_UPLOAD_PRESET").unwrap_or_default(),
            folder: std::env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "moves/videos".into()),
        };
        let client_origin = std::env::var("CLIENT_ORIGIN")
            .ok()
            .filter(|v| !v.trim().is_empty());
        Ok(Self {
            database_url,
            client_origin,
            jwt,
            cookie,
            media,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_policy_depends_on_environment() {
        let prod = CookieConfig::for_env("production");
        assert!(prod.secure);
        assert_eq!(prod.same_site, "None");

        let dev = CookieConfig::for_env("development");
        assert!(!dev.secure);
        assert_eq!(dev.same_site, "Lax");

        assert!(!CookieConfig::for_env("").secure);
    }
}
