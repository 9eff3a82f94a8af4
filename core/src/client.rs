//! Entry point exposing one method per HelloSign API operation.
//!
//! # Design
//! `HelloSignClient` owns a `Requester`, the API root and a cached
//! `Account`. It can only be obtained through `connect` (or
//! `with_transport`), which fetches the account first, so holding a client
//! means the credential has been accepted by the API. Each operation makes
//! exactly one request and decodes the named field of the response.
//!
//! Account refreshes take `&mut self`; everything else takes `&self`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::Params;
use crate::request::Requester;
use crate::transport::{Transport, UreqTransport};
use crate::types::{Account, Embedded, ReusableForm, SignatureRequest};

const ACCOUNT_CREATE_PATH: &str = "/account/create";
const ACCOUNT_PATH: &str = "/account";
const SIGNATURE_REQUEST_PATH: &str = "/signature_request/";
const SIGNATURE_REQUEST_LIST_PATH: &str = "/signature_request/list";
const SIGNATURE_REQUEST_FILES_PATH: &str = "/signature_request/files/";
const SIGNATURE_REQUEST_FINAL_COPY_PATH: &str = "/signature_request/final_copy/";
const EMBEDDED_SIGN_URL_PATH: &str = "/embedded/sign_url/";
const REUSABLE_FORM_PATH: &str = "/reusable_form/";
const REUSABLE_FORM_LIST_PATH: &str = "/reusable_form/list";

#[derive(Debug)]
pub struct HelloSignClient<T = UreqTransport> {
    requester: Requester<T>,
    api_root: String,
    account: Account,
}

impl HelloSignClient<UreqTransport> {
    /// Connect over HTTP and fetch the account.
    pub fn connect(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_transport(UreqTransport::new(), config)
    }

    /// `connect` with configuration read from `HELLOSIGN_*` variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::connect(&ClientConfig::from_env()?)
    }
}

impl<T: Transport> HelloSignClient<T> {
    /// Connect through `transport` and fetch the account.
    ///
    /// A missing credential is reported as `ApiError::Config`; any failure
    /// of the account fetch as `ApiError::Initialization`.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Result<Self, ApiError> {
        let credential = config.credential()?;
        let mut client = Self {
            requester: Requester::new(transport, credential, &config.user_agent),
            api_root: config.api_root().to_string(),
            account: Account::default(),
        };
        client
            .refresh_account_info()
            .map_err(|e| ApiError::Initialization(Box::new(e)))?;
        info!(
            account_id = client.account.account_id.as_deref().unwrap_or_default(),
            api_root = %client.api_root,
            "connected to HelloSign"
        );
        Ok(client)
    }

    /// The account cached by the last fetch or update.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Status code of the most recent request.
    pub fn last_status(&self) -> u16 {
        self.requester.last_status()
    }

    /// Create a new HelloSign account. The cached account is unchanged.
    pub fn create_account(&self, email_address: &str, password: &str) -> Result<Account, ApiError> {
        require("email_address", email_address)?;
        require("password", password)?;
        let data = params([("email_address", email_address), ("password", password)]);
        let body = self
            .requester
            .post(&self.url(ACCOUNT_CREATE_PATH), &data, &[], &Params::new())?;
        extract(body, "account")
    }

    /// Re-fetch the account, replacing the cached one wholesale.
    pub fn refresh_account_info(&mut self) -> Result<&Account, ApiError> {
        let body = self
            .requester
            .get(&self.url(ACCOUNT_PATH), &Params::new(), &Params::new())?;
        self.account = extract(body, "account")?;
        Ok(&self.account)
    }

    /// Set the account's callback URL and cache the account the API returns.
    pub fn update_account_info(&mut self, callback_url: &str) -> Result<&Account, ApiError> {
        let data = params([("callback_url", callback_url)]);
        let body = self
            .requester
            .post(&self.url(ACCOUNT_PATH), &data, &[], &Params::new())?;
        self.account = extract(body, "account")?;
        info!(callback_url, "account updated");
        Ok(&self.account)
    }

    pub fn get_signature_request(&self, signature_request_id: &str) -> Result<SignatureRequest, ApiError> {
        require_id("signature_request_id", signature_request_id)?;
        let url = self.url(&format!("{SIGNATURE_REQUEST_PATH}{signature_request_id}"));
        let body = self.requester.get(&url, &Params::new(), &Params::new())?;
        extract(body, "signature_request")
    }

    /// Signature requests in the order the API lists them.
    pub fn list_signature_requests(&self) -> Result<Vec<SignatureRequest>, ApiError> {
        let body = self
            .requester
            .get(&self.url(SIGNATURE_REQUEST_LIST_PATH), &Params::new(), &Params::new())?;
        extract(body, "signature_requests")
    }

    /// Download the request's current PDF to `destination`. Returns the
    /// number of bytes written.
    pub fn download_signature_request_file(
        &self,
        signature_request_id: &str,
        destination: &Path,
    ) -> Result<u64, ApiError> {
        require_id("signature_request_id", signature_request_id)?;
        let url = self.url(&format!("{SIGNATURE_REQUEST_FILES_PATH}{signature_request_id}"));
        self.requester.get_file(&url, destination, &Params::new())
    }

    /// Download the signed final copy to `destination`. Returns the number
    /// of bytes written.
    pub fn download_final_copy(&self, signature_request_id: &str, destination: &Path) -> Result<u64, ApiError> {
        require_id("signature_request_id", signature_request_id)?;
        let url = self.url(&format!("{SIGNATURE_REQUEST_FINAL_COPY_PATH}{signature_request_id}"));
        self.requester.get_file(&url, destination, &Params::new())
    }

    pub fn get_embedded_sign_url(&self, signature_id: &str) -> Result<Embedded, ApiError> {
        require_id("signature_id", signature_id)?;
        let url = self.url(&format!("{EMBEDDED_SIGN_URL_PATH}{signature_id}"));
        let body = self.requester.get(&url, &Params::new(), &Params::new())?;
        extract(body, "embedded")
    }

    /// Not supported by this SDK; always fails without sending anything.
    pub fn create_unclaimed_draft(&self, _data: &Params) -> Result<Value, ApiError> {
        Err(ApiError::NotImplemented("unclaimed_draft/create"))
    }

    pub fn get_reusable_form(&self, reusable_form_id: &str) -> Result<ReusableForm, ApiError> {
        require_id("reusable_form_id", reusable_form_id)?;
        let url = self.url(&format!("{REUSABLE_FORM_PATH}{reusable_form_id}"));
        let body = self.requester.get(&url, &Params::new(), &Params::new())?;
        extract(body, "reusable_form")
    }

    /// One page of reusable forms, in the order the API lists them. Pages
    /// start at 1.
    pub fn list_reusable_forms(&self, page: u32) -> Result<Vec<ReusableForm>, ApiError> {
        if page == 0 {
            return Err(ApiError::InvalidArgument("page starts at 1".to_string()));
        }
        let page = page.to_string();
        let body = self.requester.get(
            &self.url(REUSABLE_FORM_LIST_PATH),
            &Params::new(),
            &params([("page", page.as_str())]),
        )?;
        extract(body, "reusable_forms")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }
}

fn require(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidArgument(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Identifiers are appended to the path as one segment, so anything that
/// could leave that segment is rejected.
fn require_id(name: &str, value: &str) -> Result<(), ApiError> {
    require(name, value)?;
    let leaves_segment = |c: char| "/?#%\\".contains(c) || c.is_whitespace() || c.is_control();
    if value == "." || value == ".." || value.contains(leaves_segment) {
        return Err(ApiError::InvalidArgument(format!("{name} is not a valid identifier: {value:?}")));
    }
    Ok(())
}

fn params<const N: usize>(pairs: [(&str, &str); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Take `field` out of a response body and decode it.
fn extract<R: DeserializeOwned>(mut body: Value, field: &'static str) -> Result<R, ApiError> {
    let value = body
        .get_mut(field)
        .map(Value::take)
        .ok_or(ApiError::MissingField(field))?;
    serde_json::from_value(value).map_err(|e| ApiError::Deserialization(format!("{field}: {e}")))
}
