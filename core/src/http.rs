//! HTTP exchange types described as plain data.
//!
//! # Design
//! The request wrapper builds `HttpRequest` values and interprets
//! `HttpResponse` values without touching the network; a `Transport`
//! executes the round-trip in between. Bodies are owned bytes so file
//! downloads and JSON responses share one response type.
//!
//! Parameters and headers are `BTreeMap`s: keys are case-sensitive and the
//! merged output has a stable order, which keeps query strings and form
//! bodies reproducible in tests.

use std::collections::BTreeMap;

use crate::error::ApiError;

/// Case-sensitive string mapping used for headers, query parameters and
/// form fields.
pub type Params = BTreeMap<String, String>;

/// HTTP method for a request. The API only needs reads and form posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// One file attached to a multipart POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name, e.g. `file[0]`.
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(field: &str, filename: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            field: field.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded` fields.
    Form(Params),
    /// `multipart/form-data`: text fields first, then file parts.
    Multipart {
        boundary: String,
        fields: Params,
        files: Vec<FilePart>,
    },
}

impl RequestBody {
    /// Value for the `Content-Type` header, if the body has one.
    pub fn content_type(&self) -> Option<String> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Form(_) => Some("application/x-www-form-urlencoded".to_string()),
            RequestBody::Multipart { boundary, .. } => {
                Some(format!("multipart/form-data; boundary={boundary}"))
            }
        }
    }
}

/// An HTTP request described as plain data.
///
/// `headers` already include authentication; `query` is appended to `url`
/// by the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Params,
    pub query: Params,
    pub body: RequestBody,
}

/// An HTTP response described as plain data.
///
/// Status codes of 4xx/5xx are carried here as data; interpreting them is
/// the request wrapper's job.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Convenience constructor for a JSON body.
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Combine library-wide defaults with call-specific values.
///
/// Every key from both maps is present in the result; on a collision the
/// value from `overrides` wins.
pub fn merge_params(defaults: &Params, overrides: &Params) -> Params {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Reject line breaks in anything that ends up in a part header: text field
/// names, file field names, file names and file content types.
pub fn validate_multipart(fields: &Params, files: &[FilePart]) -> Result<(), ApiError> {
    let names = fields.keys().map(|name| ("field name", name.as_str()));
    let parts = files.iter().flat_map(|file| {
        [
            ("file field name", file.field.as_str()),
            ("file name", file.filename.as_str()),
            ("file content type", file.content_type.as_str()),
        ]
    });
    for (what, value) in names.chain(parts) {
        if value.contains(|c: char| c == '\r' || c == '\n') {
            return Err(ApiError::InvalidArgument(format!("{what} contains a line break: {value:?}")));
        }
    }
    Ok(())
}

/// Encode a multipart body: each text field, then each file part, then the
/// closing delimiter. Lines end in CRLF.
pub fn encode_multipart(boundary: &str, fields: &Params, files: &[FilePart]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in fields {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        out.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape_quoted(name))
                .as_bytes(),
        );
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    for file in files {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                escape_quoted(&file.field),
                escape_quoted(&file.filename)
            )
            .as_bytes(),
        );
        out.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        out.extend_from_slice(&file.bytes);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    out
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
