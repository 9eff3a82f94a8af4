//! Authenticated request wrapper for the HelloSign API.
//!
//! # Design
//! `Requester` owns the credential and the library-wide default headers and
//! query parameters. Like the rest of the crate it keeps a pure half and an
//! I/O half: `build_get`/`build_post` produce `HttpRequest` values and
//! `check_status`/`parse_json` interpret `HttpResponse` values, while
//! `get`/`post`/`get_file` run them through the `Transport`.
//!
//! Every call is a single exchange. The only thing kept between calls is the
//! last status code, for observability.

use std::path::Path;
use std::sync::atomic::{AtomicU16, Ordering};

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::Credential;
use crate::error::ApiError;
use crate::http::{merge_params, validate_multipart, FilePart, HttpMethod, HttpRequest, HttpResponse, Params, RequestBody};
use crate::transport::Transport;

#[derive(Debug)]
pub struct Requester<T> {
    transport: T,
    credential: Credential,
    default_headers: Params,
    default_parameters: Params,
    last_status: AtomicU16,
}

impl<T: Transport> Requester<T> {
    pub fn new(transport: T, credential: Credential, user_agent: &str) -> Self {
        let mut default_headers = Params::new();
        default_headers.insert("User-Agent".to_string(), user_agent.to_string());
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        Self {
            transport,
            credential,
            default_headers,
            default_parameters: Params::new(),
            last_status: AtomicU16::new(0),
        }
    }

    /// Query parameters sent with every GET unless a call overrides them.
    pub fn with_default_parameters(mut self, parameters: Params) -> Self {
        self.default_parameters = parameters;
        self
    }

    /// Status code of the most recent exchange, 0 before the first one.
    pub fn last_status(&self) -> u16 {
        self.last_status.load(Ordering::Relaxed)
    }

    pub fn build_get(&self, url: &str, headers: &Params, parameters: &Params) -> HttpRequest {
        self.read_request(url, headers, merge_params(&self.default_parameters, parameters))
    }

    /// GET for a file download. Default query parameters are not sent.
    pub fn build_download(&self, url: &str, headers: &Params) -> HttpRequest {
        self.read_request(url, headers, Params::new())
    }

    /// Form-encoded unless `files` is non-empty, in which case the data
    /// fields and files travel as one multipart body.
    ///
    /// Part names, file names and content types go into multipart headers,
    /// so line breaks in them are rejected.
    pub fn build_post(
        &self,
        url: &str,
        data: &Params,
        files: &[FilePart],
        headers: &Params,
    ) -> Result<HttpRequest, ApiError> {
        let body = if files.is_empty() {
            RequestBody::Form(data.clone())
        } else {
            validate_multipart(data, files)?;
            RequestBody::Multipart {
                boundary: format!("hellosign-{}", Uuid::new_v4().simple()),
                fields: data.clone(),
                files: files.to_vec(),
            }
        };
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            headers: self.request_headers(headers),
            query: Params::new(),
            body,
        })
    }

    /// Authenticated GET returning the parsed JSON body.
    pub fn get(&self, url: &str, headers: &Params, parameters: &Params) -> Result<Value, ApiError> {
        let response = self.send(&self.build_get(url, headers, parameters))?;
        parse_json(response)
    }

    /// Authenticated POST returning the parsed JSON body.
    pub fn post(
        &self,
        url: &str,
        data: &Params,
        files: &[FilePart],
        headers: &Params,
    ) -> Result<Value, ApiError> {
        let response = self.send(&self.build_post(url, data, files, headers)?)?;
        parse_json(response)
    }

    /// Authenticated GET whose raw body is written to `destination`,
    /// creating or truncating it. Returns the number of bytes written.
    ///
    /// Nothing is written when the response carries an error status. A
    /// failed write may leave a partial file behind.
    pub fn get_file(&self, url: &str, destination: &Path, headers: &Params) -> Result<u64, ApiError> {
        let response = self.send(&self.build_download(url, headers))?;
        std::fs::write(destination, &response.body).map_err(|source| ApiError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        debug!(path = %destination.display(), bytes = response.body.len(), "file downloaded");
        Ok(response.body.len() as u64)
    }

    fn read_request(&self, url: &str, headers: &Params, query: Params) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: self.request_headers(headers),
            query,
            body: RequestBody::Empty,
        }
    }

    fn request_headers(&self, headers: &Params) -> Params {
        let mut merged = merge_params(&self.default_headers, headers);
        merged.insert("Authorization".to_string(), self.credential.authorization_header());
        merged
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.transport.execute(request)?;
        self.last_status.store(response.status, Ordering::Relaxed);
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            "hellosign request"
        );
        if let Err(e) = check_status(&response) {
            warn!(method = request.method.as_str(), url = %request.url, error = %e, "hellosign request failed");
            return Err(e);
        }
        Ok(response)
    }
}

/// Map a status >= 400 to an error built from the API's error body.
pub fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status < 400 {
        return Ok(());
    }
    let message = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| body["error"]["error_msg"].as_str().map(str::to_string));
    match message {
        Some(message) => Err(ApiError::Http {
            status: response.status,
            message,
        }),
        None => Err(ApiError::MalformedErrorBody {
            status: response.status,
            body: response.body_text(),
        }),
    }
}

/// Check the status, then decode the body as JSON without altering it.
pub fn parse_json(response: HttpResponse) -> Result<Value, ApiError> {
    check_status(&response)?;
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::FakeTransport;

    fn requester(transport: &FakeTransport) -> Requester<&FakeTransport> {
        Requester::new(transport, Credential::api_key("key"), "test-agent")
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn build_get_merges_headers_and_parameters() {
        let transport = FakeTransport::new();
        let r = requester(&transport).with_default_parameters(params(&[("page", "1"), ("page_size", "20")]));

        let req = r.build_get(
            "https://api.example/v3/account",
            &params(&[("User-Agent", "override"), ("X-Trace", "t")]),
            &params(&[("page", "3")]),
        );

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://api.example/v3/account");
        assert_eq!(req.headers["User-Agent"], "override");
        assert_eq!(req.headers["Accept"], "application/json");
        assert_eq!(req.headers["X-Trace"], "t");
        assert_eq!(req.headers["Authorization"], "Basic a2V5Og==");
        assert_eq!(req.query, params(&[("page", "3"), ("page_size", "20")]));
        assert_eq!(req.body, RequestBody::Empty);
    }

    #[test]
    fn authorization_cannot_be_overridden_per_call() {
        let transport = FakeTransport::new();
        let req = requester(&transport).build_get(
            "u",
            &params(&[("Authorization", "Bearer nope")]),
            &Params::new(),
        );
        assert_eq!(req.headers["Authorization"], "Basic a2V5Og==");
    }

    #[test]
    fn build_post_without_files_is_form() {
        let transport = FakeTransport::new();
        let data = params(&[("email_address", "a@b.c")]);
        let req = requester(&transport).build_post("u", &data, &[], &Params::new()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body, RequestBody::Form(data));
        assert!(req.query.is_empty());
    }

    #[test]
    fn build_post_with_files_is_multipart() {
        let transport = FakeTransport::new();
        let data = params(&[("title", "NDA")]);
        let files = vec![FilePart::new("file[0]", "nda.pdf", "application/pdf", b"%PDF".to_vec())];
        let req = requester(&transport).build_post("u", &data, &files, &Params::new()).unwrap();
        match req.body {
            RequestBody::Multipart {
                boundary,
                fields,
                files: sent,
            } => {
                assert!(boundary.starts_with("hellosign-"));
                assert_eq!(fields, data);
                assert_eq!(sent, files);
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }

    #[test]
    fn post_with_line_break_in_part_name_sends_nothing() {
        let transport = FakeTransport::new().respond(200, "{}");
        let data = params(&[("a\r\nX-Injected: 1", "v")]);
        let files = vec![FilePart::new("file[0]", "nda.pdf", "application/pdf", b"%PDF".to_vec())];
        let err = requester(&transport)
            .post("u", &data, &files, &Params::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn get_returns_body_unaltered_and_records_status() {
        let body = json!({"account": {"account_id": "a1", "quotas": {"documents_left": null}}, "warnings": []});
        let transport = FakeTransport::new().respond(200, &body.to_string());
        let r = requester(&transport);
        assert_eq!(r.last_status(), 0);

        let value = r.get("u", &Params::new(), &Params::new()).unwrap();

        assert_eq!(value, body);
        assert_eq!(r.last_status(), 200);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn post_error_carries_status_and_message() {
        let transport = FakeTransport::new().respond(402, r#"{"error": {"error_msg": "Payment required"}}"#);
        let err = requester(&transport)
            .post("u", &Params::new(), &[], &Params::new())
            .unwrap_err();

        assert!(matches!(&err, ApiError::Http { status: 402, message } if message == "Payment required"));
        let text = err.to_string();
        assert!(text.contains("402"));
        assert!(text.contains("Payment required"));
    }

    #[test]
    fn error_status_without_error_msg_is_malformed() {
        let transport = FakeTransport::new()
            .respond(500, "<html>bad gateway</html>")
            .respond(404, r#"{"error": {"error_name": "not_found"}}"#);
        let r = requester(&transport);

        let err = r.get("u", &Params::new(), &Params::new()).unwrap_err();
        assert!(matches!(&err, ApiError::MalformedErrorBody { status: 500, body } if body == "<html>bad gateway</html>"));
        assert_eq!(r.last_status(), 500);

        let err = r.get("u", &Params::new(), &Params::new()).unwrap_err();
        assert!(matches!(err, ApiError::MalformedErrorBody { status: 404, .. }));
        assert_eq!(r.last_status(), 404);
    }

    #[test]
    fn status_399_is_success() {
        assert!(check_status(&HttpResponse::json(399, "{}")).is_ok());
        assert!(check_status(&HttpResponse::json(400, "{}")).is_err());
    }

    #[test]
    fn success_with_non_json_body_fails_to_deserialize() {
        let transport = FakeTransport::new().respond(200, "not json");
        let err = requester(&transport)
            .get("u", &Params::new(), &Params::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn transport_failure_propagates() {
        let transport = FakeTransport::new().fail("connection refused");
        let r = requester(&transport);
        let err = r.get("u", &Params::new(), &Params::new()).unwrap_err();
        assert!(matches!(err, ApiError::Transport(msg) if msg == "connection refused"));
        assert_eq!(r.last_status(), 0);
    }

    #[test]
    fn get_file_writes_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let transport = FakeTransport::new()
            .respond_bytes(200, b"0123456789".to_vec())
            .respond_bytes(200, b"abc".to_vec());
        let r = requester(&transport);

        assert_eq!(r.get_file("u", &path, &Params::new()).unwrap(), 10);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123456789");

        assert_eq!(r.get_file("u", &path, &Params::new()).unwrap(), 3);
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn get_file_error_status_leaves_destination_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let transport = FakeTransport::new().respond(404, r#"{"error": {"error_msg": "Not found"}}"#);

        let err = requester(&transport)
            .get_file("u", &path, &Params::new())
            .unwrap_err();

        assert!(matches!(err, ApiError::Http { status: 404, .. }));
        assert!(!path.exists());
    }

    #[test]
    fn get_file_write_failure_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("doc.pdf");
        let transport = FakeTransport::new().respond_bytes(200, b"pdf".to_vec());

        let err = requester(&transport)
            .get_file("u", &path, &Params::new())
            .unwrap_err();

        assert!(matches!(&err, ApiError::Io { path: p, .. } if p == &path));
    }

    #[test]
    fn get_file_sends_no_default_query() {
        let transport = FakeTransport::new().respond_bytes(200, Vec::new());
        let dir = tempfile::tempdir().unwrap();
        let r = requester(&transport).with_default_parameters(params(&[("page", "1")]));
        r.get_file("u", &dir.path().join("f"), &Params::new()).unwrap();
        assert!(transport.requests()[0].query.is_empty());
    }
}
