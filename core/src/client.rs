//! Token-bearing HTTP client for the task API.
//!
//! # Design
//! `ApiClient` owns the base URL, the session token and an injected
//! `Transport`. A call to `request` is split into three steps:
//! `build_request` (pure: URL, default and caller headers, bearer token),
//! `Transport::execute` (the only I/O), and `parse_response` (pure: 204,
//! content-type, status and body normalization). Every failure leaves as one
//! `ApiError` kind.
//!
//! The token is the only mutable state. It sits behind an `RwLock` and is
//! read once per request while the request is built, so a concurrent
//! `set_token` never affects a request already on the wire.

use std::sync::{Arc, RwLock};

use log::{debug, warn};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, GENERIC_ERROR_MESSAGE};
use crate::http::{HttpRequest, HttpResponse, RequestOptions};
use crate::storage::{TokenStore, TOKEN_KEY};
use crate::transport::{Transport, TransportError};
use crate::types::ErrorBody;

pub struct ApiClient {
    base_url: String,
    token: RwLock<Option<String>>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token().is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client and restores any token previously persisted in
    /// `store`. A store that cannot be read starts the client signed out.
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        let token = match store.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("could not restore session token: {e}");
                None
            }
        };
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(token),
            transport,
            store,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replaces the session token and persists it, or clears both the
    /// in-memory token and the persisted copy when `token` is `None`. An
    /// empty token counts as `None`.
    ///
    /// A new token is held in memory only once it has been persisted, so a
    /// failed write leaves the previous session in place. Clearing always
    /// signs out in memory, even if the persisted copy cannot be removed.
    pub fn set_token(&self, token: Option<&str>) -> Result<(), ApiError> {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.store.set(TOKEN_KEY, token)?;
                self.replace_token(Some(token.to_string()));
            }
            None => {
                self.replace_token(None);
                self.store.remove(TOKEN_KEY)?;
            }
        }
        Ok(())
    }

    fn replace_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Sends one request to `base_url + endpoint` and decodes the JSON reply
    /// as `T`.
    ///
    /// A 204 reply yields `T` built from an empty JSON object without reading
    /// the body; use `EmptyBody` when no payload is expected.
    pub fn request<T: DeserializeOwned>(&self, endpoint: &str, options: RequestOptions) -> Result<T, ApiError> {
        let request = self.build_request(endpoint, options);
        let response = self.transport.execute(&request).map_err(|e| {
            warn!("{} {} failed: {e}", request.method.as_str(), request.url);
            match e {
                TransportError::Connect(_) => ApiError::ServerUnreachable,
                TransportError::Other(msg) => ApiError::Unexpected(msg),
            }
        })?;
        debug!("{} {} -> {}", request.method.as_str(), request.url, response.status);
        parse_response(response)
    }

    /// Resolves the URL and merges headers: `Content-Type: application/json`,
    /// then `Authorization: Bearer <token>` when signed in, then the caller's
    /// headers, each replacing any earlier header of the same name.
    pub fn build_request(&self, endpoint: &str, options: RequestOptions) -> HttpRequest {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = self.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        for (name, value) in options.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }
        HttpRequest {
            method: options.method,
            url: format!("{}{endpoint}", self.base_url),
            headers,
            body: options.body,
        }
    }
}

/// Normalizes a raw response into `T` or an `ApiError`.
///
/// Order matters: 204 short-circuits before anything else, and a non-JSON
/// content type is rejected before the status is even looked at.
pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    if response.status == 204 {
        return T::deserialize(serde_json::Value::Object(serde_json::Map::new()))
            .map_err(|e| ApiError::Unexpected(format!("204 No Content cannot produce the expected type: {e}")));
    }

    if !response.is_json() {
        warn!("response with status {} is not JSON", response.status);
        return Err(ApiError::ServerMisbehaving);
    }

    if !response.is_success() {
        let body: Option<ErrorBody> = serde_json::from_str(&response.body).ok();
        let (message, code) = match body {
            Some(ErrorBody { message, code }) => (message, code),
            None => (None, None),
        };
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
        return Err(ApiError::Application {
            status: response.status,
            message,
            code,
        });
    }

    serde_json::from_str(&response.body).map_err(|e| ApiError::Unexpected(format!("invalid response body: {e}")))
}

/// Serializes a request payload, reporting failure as `Unexpected`.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Unexpected(format!("could not encode request: {e}")))
}
