//! Error types for the task API client.
//!
//! # Design
//! Every failure that leaves `ApiClient::request` is normalized into one of
//! four kinds. The kind is decided where the failure happens (transport,
//! content-type check, status check), never by inspecting message text.
//! `ServerUnreachable` and `ServerMisbehaving` carry fixed, user-facing
//! messages; `Application` carries the server's own message verbatim.

use thiserror::Error;

use crate::storage::StoreError;

pub const SERVER_UNREACHABLE_MESSAGE: &str =
    "Cannot connect to the server. Please make sure the backend server is running.";

pub const SERVER_MISBEHAVING_MESSAGE: &str =
    "Server is not responding properly. Please check if the backend server is running.";

/// Used when a non-2xx response carries no usable `message`.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Errors returned by `ApiClient` and the services built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never reached the server (connection refused, DNS, ...).
    #[error("{}", SERVER_UNREACHABLE_MESSAGE)]
    ServerUnreachable,

    /// A response arrived but was not JSON.
    #[error("{}", SERVER_MISBEHAVING_MESSAGE)]
    ServerMisbehaving,

    /// The server answered with a non-2xx status and a JSON error body.
    #[error("{message}")]
    Application {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// Anything else: payload encoding, body decoding, token persistence.
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    /// HTTP status of an `Application` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Unexpected(format!("token storage failed: {err}"))
    }
}
