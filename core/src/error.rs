//! Error types for the HelloSign client.
//!
//! # Design
//! `Http` is the error callers match on most: it carries the status code and
//! the API's `error_msg`. An error status whose body does not have that shape
//! gets its own `MalformedErrorBody` variant with the raw text, so a broken
//! error response is still reported as a failure. `Initialization` wraps
//! whatever went wrong while `HelloSignClient::connect` fetched the account.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a status >= 400 and a well-formed error body.
    #[error("{status} error: {message}")]
    Http { status: u16, message: String },

    /// The API answered with a status >= 400 but the body lacked
    /// `error.error_msg`.
    #[error("{status} error with malformed body: {body}")]
    MalformedErrorBody { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A success body could not be decoded into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A success body lacked the top-level field holding the resource.
    #[error("response is missing field `{0}`")]
    MissingField(&'static str),

    /// A downloaded file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is deliberately not supported by this SDK.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    /// Fetching the account while connecting failed.
    #[error("client initialization failed: {0}")]
    Initialization(Box<ApiError>),
}

impl ApiError {
    /// HTTP status carried by the error, looking through `Initialization`.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::MalformedErrorBody { status, .. } => {
                Some(*status)
            }
            ApiError::Initialization(inner) => inner.status(),
            _ => None,
        }
    }
}
