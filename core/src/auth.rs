//! Authentication material attached to every outbound request.
//!
//! HelloSign accepts HTTP Basic auth in two shapes: an API key as the user
//! name with an empty password, or an account's email and password.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Immutable credential owned by the client for its whole lifetime.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    Basic { username: String, password: String },
}

impl Credential {
    pub fn api_key(key: &str) -> Self {
        Credential::ApiKey(key.to_string())
    }

    pub fn basic(username: &str, password: &str) -> Self {
        Credential::Basic {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        let pair = match self {
            Credential::ApiKey(key) => format!("{key}:"),
            Credential::Basic { username, password } => format!("{username}:{password}"),
        };
        format!("Basic {}", STANDARD.encode(pair))
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}
