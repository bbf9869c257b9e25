//! Blocking API client core for the task service.
//!
//! # Overview
//! `ApiClient` is the single access point to the remote API: it resolves the
//! base URL, attaches the bearer token and normalizes every failure into an
//! `ApiError`. `AuthService` and `TaskService` are thin domain layers on top
//! of one shared client.
//!
//! # Design
//! - Nothing is global. `Services::from_config` (or the constructors it
//!   calls) builds one `Arc<ApiClient>` and the services that share it, and
//!   consumers receive them explicitly.
//! - Network I/O sits behind the `Transport` trait and token persistence
//!   behind `TokenStore`, so tests swap in scripted or in-memory versions.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod storage;
pub mod tasks;
pub mod transport;
pub mod types;

use std::sync::Arc;

pub use auth::AuthService;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
pub use storage::{FileStore, MemoryStore, StoreError, TokenStore};
pub use tasks::TaskService;
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{
    AuthResponse, CreateTaskRequest, Credentials, EmptyBody, Task, TaskFilter, TaskPriority, TaskStatus,
    TasksResponse, UpdateTaskRequest,
};

/// The client and the services sharing it, built once at start-up.
#[derive(Debug, Clone)]
pub struct Services {
    pub api: Arc<ApiClient>,
    pub auth: AuthService,
    pub tasks: TaskService,
}

impl Services {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            auth: AuthService::new(api.clone()),
            tasks: TaskService::new(api.clone()),
            api,
        }
    }

    /// Uses `UreqTransport`, and a `FileStore` when `token_file` is set or a
    /// `MemoryStore` otherwise.
    pub fn from_config(config: &ClientConfig) -> Self {
        let store: Arc<dyn TokenStore> = match &config.token_file {
            Some(path) => Arc::new(FileStore::new(path.clone())),
            None => Arc::new(MemoryStore::new()),
        };
        let api = ApiClient::new(&config.base_url, Arc::new(UreqTransport::new()), store);
        Self::new(Arc::new(api))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TOKEN_KEY;

    #[test]
    fn services_share_one_client() {
        let services = Services::from_config(&ClientConfig::new("http://localhost:9/api"));
        services.api.set_token(Some("tok1")).unwrap();
        assert!(services.auth.is_authenticated());
        services.auth.logout().unwrap();
        assert_eq!(services.api.token(), None);
    }

    #[test]
    fn from_config_restores_file_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileStore::new(&path).set(TOKEN_KEY, "saved").unwrap();

        let config = ClientConfig::new("http://localhost:9/api").with_token_file(&path);
        let services = Services::from_config(&config);
        assert_eq!(services.auth.token().as_deref(), Some("saved"));
        assert_eq!(services.api.base_url(), "http://localhost:9/api");
    }
}
