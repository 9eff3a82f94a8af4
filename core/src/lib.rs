//! Blocking client SDK for the HelloSign e-signature API.
//!
//! # Overview
//! `HelloSignClient` exposes one method per supported API operation:
//! accounts, signature requests and their files, embedded signing URLs and
//! reusable forms. Requests go through `Requester`, which attaches the
//! credential and default headers and turns error statuses into `ApiError`.
//!
//! # Design
//! - HTTP requests and responses are plain data (`http`); a `Transport`
//!   executes them, `UreqTransport` by default.
//! - `Requester` keeps the build/parse halves public so the error contract
//!   can be exercised without a network.
//! - Resources (`types`) are structs with optional fields mirroring the
//!   API's JSON.
//! - A client only exists after its account has been fetched; see
//!   `HelloSignClient::connect`.
//!
//! ```no_run
//! use hellosign_core::{ClientConfig, HelloSignClient};
//!
//! let client = HelloSignClient::connect(&ClientConfig::with_api_key("my-key"))?;
//! for request in client.list_signature_requests()? {
//!     println!("{:?}", request.title);
//! }
//! # Ok::<(), hellosign_core::ApiError>(())
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use auth::Credential;
pub use client::HelloSignClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{merge_params, validate_multipart, FilePart, HttpMethod, HttpRequest, HttpResponse, Params, RequestBody};
pub use request::{check_status, parse_json, Requester};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Account, CcRole, Document, Embedded, Quotas, ReusableForm, Signature, SignatureRequest, SignerRole,
};
