//! Resource records returned by the HelloSign API.
//!
//! # Design
//! Each resource is a plain struct whose fields mirror the API's JSON keys.
//! Every field is optional (collections default to empty) and unknown keys
//! are ignored, so a response with fewer or extra fields still decodes while
//! a renamed field shows up as a compile error at the use site. `Default`
//! gives the empty resource.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The authenticated account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: Option<String>,
    pub email_address: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_paid_hs: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_paid_hf: Option<bool>,
    pub callback_url: Option<String>,
    pub role_code: Option<String>,
    pub quotas: Option<Quotas>,
}

/// Remaining allowances; `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotas {
    pub api_signature_requests_left: Option<i64>,
    pub documents_left: Option<i64>,
    pub templates_left: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub signature_request_id: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub test_mode: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_complete: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_declined: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub has_error: Option<bool>,
    pub requester_email_address: Option<String>,
    pub signing_url: Option<String>,
    pub details_url: Option<String>,
    pub files_url: Option<String>,
    pub final_copy_uri: Option<String>,
    /// Unix timestamp.
    pub created_at: Option<i64>,
    #[serde(default)]
    pub cc_email_addresses: Vec<String>,
    /// Free-form key/value data attached by the sender.
    pub metadata: Option<Value>,
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

/// One signer's slot on a signature request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub signature_id: Option<String>,
    pub signer_email_address: Option<String>,
    pub signer_name: Option<String>,
    pub order: Option<u32>,
    /// e.g. `awaiting_signature`, `signed`, `declined`.
    pub status_code: Option<String>,
    pub signed_at: Option<i64>,
    pub last_viewed_at: Option<i64>,
    pub last_reminded_at: Option<i64>,
    #[serde(default, deserialize_with = "flag")]
    pub has_pin: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReusableForm {
    pub reusable_form_id: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_creator: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub can_edit: Option<bool>,
    #[serde(default)]
    pub signer_roles: Vec<SignerRole>,
    #[serde(default)]
    pub cc_roles: Vec<CcRole>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerRole {
    pub name: Option<String>,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcRole {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: Option<String>,
    pub index: Option<u32>,
}

/// A short-lived URL for signing inside an iframe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedded {
    pub sign_url: Option<String>,
    pub expires_at: Option<i64>,
}

/// The API has sent boolean flags both as JSON booleans and as 0/1.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(D::Error::custom(format!("invalid flag value {n}"))),
        },
        Some(other) => Err(D::Error::custom(format!("invalid flag value {other}"))),
    }
}
