//! The I/O seam between `ApiClient` and the network.
//!
//! # Design
//! `Transport` executes one `HttpRequest` and returns the raw `HttpResponse`
//! for every status code; only failures to obtain a response at all are
//! errors. Those are classified here, at the boundary: `Connect` when the
//! server could not be reached, `Other` for everything else, including a
//! connection that drops while the body is being read.

use log::debug;
use thiserror::Error;

use crate::http::{is_json_content_type, HttpMethod, HttpRequest, HttpResponse};

/// A failure to obtain any HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, host not found, connect timeout and the like.
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport failed: {0}")]
    Other(String),
}

/// Executes HTTP requests on behalf of `ApiClient`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent is configured so 4xx/5xx responses come back as data rather
/// than `Err`, leaving status interpretation to the client. No timeout is
/// set beyond ureq's own defaults.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
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
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("{} {}", request.method.as_str(), request.url);

        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), request).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), request).call(),
            HttpMethod::Post | HttpMethod::Patch => {
                let builder = match request.method {
                    HttpMethod::Post => self.agent.post(url),
                    _ => self.agent.patch(url),
                };
                let builder = with_headers(builder, request);
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(classify_connect)?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let content_type = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str());
        let body = if body_is_needed(status, content_type) {
            response.body_mut().read_to_string().map_err(classify_body)?
        } else {
            String::new()
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// The client never parses a 204 or a non-JSON body, so neither is read.
/// This keeps an oversized HTML error page from failing the read.
fn body_is_needed(status: u16, content_type: Option<&str>) -> bool {
    status != 204 && is_json_content_type(content_type)
}

/// Failures before a response arrived.
fn classify_connect(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Io(_)
        | ureq::Error::HostNotFound
        | ureq::Error::ConnectionFailed
        | ureq::Error::Timeout(_) => TransportError::Connect(err.to_string()),
        other => TransportError::Other(other.to_string()),
    }
}

/// Failures after the status line arrived. The server was reached, so none
/// of these is a connect failure.
fn classify_body(err: ureq::Error) -> TransportError {
    TransportError::Other(format!("reading response body: {err}"))
}
