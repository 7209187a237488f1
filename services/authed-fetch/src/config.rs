//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Tokens are seeded from AUTH_ACCESS_TOKEN / AUTH_REFRESH_TOKEN, never
//! stored in the TOML directly to avoid leaking secrets.

use auth_session::{
    DEFAULT_CREDENTIALS_FILE, DEFAULT_LOGIN_REDIRECT, DEFAULT_STALE_CREDENTIAL_STATUS,
    DEFAULT_UNAUTHENTICATED_STATUS,
};
use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub auth: AuthConfig,
}

/// API the authenticated requests go to
#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Token authority and session settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub refresh_url: String,
    /// Server-side logout endpoint, called when the session ends
    #[serde(default)]
    pub logout_url: Option<String>,
    #[serde(default = "default_login_redirect")]
    pub login_redirect: String,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_unauthenticated_status")]
    pub unauthenticated_status: u16,
    #[serde(default = "default_stale_credential_status")]
    pub stale_credential_status: u16,
    #[serde(skip)]
    pub access_token: Option<Secret<String>>,
    #[serde(skip)]
    pub refresh_token: Option<Secret<String>>,
}

fn default_timeout() -> u64 {
    600
}

fn default_login_redirect() -> String {
    DEFAULT_LOGIN_REDIRECT.to_string()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from(DEFAULT_CREDENTIALS_FILE)
}

fn default_unauthenticated_status() -> u16 {
    DEFAULT_UNAUTHENTICATED_STATUS
}

fn default_stale_credential_status() -> u16 {
    DEFAULT_STALE_CREDENTIAL_STATUS
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;

        config.auth.access_token = secret_from_env("AUTH_ACCESS_TOKEN");
        config.auth.refresh_token = secret_from_env("AUTH_REFRESH_TOKEN");

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        require_http_url("upstream.base_url", &self.upstream.base_url)?;
        require_http_url("auth.refresh_url", &self.auth.refresh_url)?;
        if let Some(ref logout_url) = self.auth.logout_url {
            require_http_url("auth.logout_url", logout_url)?;
        }

        if self.upstream.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        require_auth_status("unauthenticated_status", self.auth.unauthenticated_status)?;
        require_auth_status("stale_credential_status", self.auth.stale_credential_status)?;
        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("authed-fetch.toml")
    }
}

fn require_http_url(field: &str, url: &str) -> common::Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "{field} must start with http:// or https://, got: {url}"
        )));
    }
    Ok(())
}

fn require_auth_status(field: &str, code: u16) -> common::Result<()> {
    if !(100..=599).contains(&code) || (200..=299).contains(&code) {
        return Err(common::Error::Config(format!(
            "{field} must be an HTTP status in 100-599 outside 200-299, got: {code}"
        )));
    }
    Ok(())
}

fn secret_from_env(key: &str) -> Option<Secret<String>> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(Secret::new)
}
