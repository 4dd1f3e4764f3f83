use anyhow::{Context, Result};

/// Client configuration loaded from environment variables.
///
/// The bearer token is owned by the external session layer; this core only
/// reads it. `PORTAL_HTTP_TIMEOUT_SECS` bounds every network call so a hung
/// request cannot leave the client loading forever.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub auth_token: String,
    pub http_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_base_url: require_env("PORTAL_API_BASE_URL")?,
            auth_token: require_env("PORTAL_AUTH_TOKEN")?,
            http_timeout_secs: std::env::var("PORTAL_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .context("PORTAL_HTTP_TIMEOUT_SECS must be a number of seconds")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
