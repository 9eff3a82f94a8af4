//! Execution of one HTTP exchange.
//!
//! # Design
//! `Transport` is the seam between the request wrapper and the network. It
//! turns an `HttpRequest` into an `HttpResponse` and reports only failures
//! that prevented a response. Error statuses come back as data so the
//! wrapper stays the single place that interprets them.

use crate::error::ApiError;
use crate::http::{encode_multipart, HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Executes a single request and returns the response as data.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let result = match (request.method, &request.body) {
            (HttpMethod::Get, _) => with_parts(self.agent.get(&request.url), request).call(),
            (HttpMethod::Post, RequestBody::Empty) => {
                with_parts(self.agent.post(&request.url), request).send_empty()
            }
            (HttpMethod::Post, RequestBody::Form(fields)) => {
                with_parts(self.agent.post(&request.url), request)
                    .send_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            }
            (HttpMethod::Post, RequestBody::Multipart { boundary, fields, files }) => {
                let payload = encode_multipart(boundary, fields, files);
                let mut builder = with_parts(self.agent.post(&request.url), request);
                if let Some(content_type) = request.body.content_type() {
                    builder = builder.content_type(content_type);
                }
                builder.send(&payload[..])
            }
        };

        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // Downloads can exceed ureq's default in-memory body limit.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_parts<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (name, value) in &request.query {
        builder = builder.query(name, value);
    }
    builder
}
