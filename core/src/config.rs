//! Client configuration.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "TASK_API_URL";

/// Environment variable naming the file that persists the session token.
pub const TOKEN_FILE_ENV: &str = "TASK_API_TOKEN_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// When `None`, the token lives in memory only.
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_file: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            token_file: None,
        }
    }

    /// Reads `TASK_API_URL` and `TASK_API_TOKEN_FILE`, falling back to the
    /// defaults for unset or empty values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value: &String| !value.trim().is_empty());
        Self {
            base_url: non_empty(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            token_file: non_empty(TOKEN_FILE_ENV).map(PathBuf::from),
        }
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }
}
