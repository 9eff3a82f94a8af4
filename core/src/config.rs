//! Client configuration read from `HELLOSIGN_*` environment variables.
//!
//! | variable | meaning |
//! |---|---|
//! | `HELLOSIGN_API_KEY` | API key (takes precedence) |
//! | `HELLOSIGN_USERNAME` / `HELLOSIGN_PASSWORD` | account email and password |
//! | `HELLOSIGN_BASE_URL` | API root, default `https://api.hellosign.com/v3` |
//! | `HELLOSIGN_USER_AGENT` | `User-Agent` header value |

use serde::Deserialize;

use crate::auth::Credential;
use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://api.hellosign.com/v3";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    concat!("hellosign-rust-sdk/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ClientConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Self::default()
        }
    }

    pub fn with_basic(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..Self::default()
        }
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn from_env() -> Result<Self, ApiError> {
        envy::prefixed("HELLOSIGN_")
            .from_env()
            .map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Read from an explicit set of variables, e.g. in tests.
    pub fn from_vars<I>(vars: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed("HELLOSIGN_")
            .from_iter(vars)
            .map_err(|e| ApiError::Config(e.to_string()))
    }

    /// The API key if set, otherwise username and password.
    pub fn credential(&self) -> Result<Credential, ApiError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(Credential::api_key(key));
        }
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Ok(Credential::basic(username, password))
            }
            _ => Err(ApiError::Config(
                "set HELLOSIGN_API_KEY or HELLOSIGN_USERNAME and HELLOSIGN_PASSWORD".to_string(),
            )),
        }
    }

    /// Base URL without a trailing slash.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            username: None,
            password: None,
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
