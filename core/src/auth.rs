//! Session lifecycle on top of `ApiClient`.

use std::sync::Arc;

use log::error;

use crate::client::{to_json, ApiClient};
use crate::error::ApiError;
use crate::http::{HttpMethod, RequestOptions};
use crate::types::{AuthResponse, Credentials, EmptyBody};

#[derive(Debug, Clone)]
pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Exchanges credentials for a token and stores it on the client.
    ///
    /// Errors are returned as the client reported them. On any error the
    /// previous session, if one existed, is left untouched.
    pub fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.try_login(credentials).inspect_err(|e| error!("login failed: {e}"))
    }

    fn try_login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let options = RequestOptions::new(HttpMethod::Post).with_body(to_json(credentials)?);
        let response: AuthResponse = self.api.request("/auth/login", options)?;
        self.api.set_token(Some(&response.access_token))?;
        Ok(response)
    }

    /// Creates the account, then logs in with the same credentials.
    ///
    /// The register reply is ignored. If the account is created but the
    /// follow-up login fails, the login error is returned as is.
    pub fn register(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let options = RequestOptions::new(HttpMethod::Post).with_body(to_json(credentials)?);
        self.api
            .request::<EmptyBody>("/auth/register", options)
            .inspect_err(|e| error!("registration failed: {e}"))?;
        self.login(credentials)
    }

    /// Forgets the session locally. No request is sent.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.api.set_token(None)
    }

    /// True while a token is held. The token is not checked with the server,
    /// so a revoked token reads as authenticated until a request fails.
    pub fn is_authenticated(&self) -> bool {
        self.api.token().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.api.token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{client_with, FailingStore, FakeTransport};
    use crate::error::SERVER_UNREACHABLE_MESSAGE;
    use crate::transport::TransportError;

    const LOGIN_OK: &str = r#"{"accessToken":"tok1","username":"a","attributes":{"id":"1"}}"#;

    fn service() -> (Arc<FakeTransport>, AuthService) {
        let transport = FakeTransport::new();
        (transport.clone(), AuthService::new(client_with(transport)))
    }

    fn creds() -> Credentials {
        Credentials::new("a@b.com", "x")
    }

    #[test]
    fn login_stores_token() {
        let (transport, auth) = service();
        transport.push_json(200, LOGIN_OK);

        let response = auth.login(&creds()).unwrap();
        assert_eq!(response.access_token, "tok1");
        assert_eq!(response.username, "a");
        assert_eq!(auth.token().as_deref(), Some("tok1"));
        assert!(auth.is_authenticated());

        let req = transport.last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/api/auth/login");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "email": "a@b.com", "password": "x" }));
    }

    #[test]
    fn login_rejection_keeps_server_message() {
        let (transport, auth) = service();
        transport.push_json(401, r#"{"message":"Invalid credentials","code":"UNAUTHORIZED"}"#);

        let err = auth.login(&creds()).unwrap_err();
        assert!(matches!(err, ApiError::Application { status: 401, .. }));
        assert_eq!(err.to_string(), "Invalid credentials");
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn login_with_malformed_reply_keeps_decode_error() {
        let (transport, auth) = service();
        transport.push_json(200, r#"{"token":"tok1"}"#);

        let err = auth.login(&creds()).unwrap_err();
        match err {
            ApiError::Unexpected(msg) => assert!(msg.contains("accessToken"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn login_fails_signed_out_when_token_cannot_be_stored() {
        let transport = FakeTransport::new();
        let api = Arc::new(ApiClient::new(
            "http://localhost:3000/api",
            transport.clone(),
            Arc::new(FailingStore),
        ));
        let auth = AuthService::new(api);
        transport.push_json(200, LOGIN_OK);

        let err = auth.login(&creds()).unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(ref msg) if msg.starts_with("token storage failed")));
        assert!(!auth.is_authenticated());
        assert_eq!(auth.token(), None);
    }

    #[test]
    fn register_then_logs_in() {
        let (transport, auth) = service();
        transport.push_json(201, r#"{"id":1,"email":"a@b.com"}"#);
        transport.push_json(200, LOGIN_OK);

        let response = auth.register(&creds()).unwrap();
        assert_eq!(response.access_token, "tok1");
        assert!(auth.is_authenticated());

        let urls: Vec<String> = transport.sent().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:3000/api/auth/register".to_string(),
                "http://localhost:3000/api/auth/login".to_string(),
            ]
        );
    }

    #[test]
    fn register_surfaces_chained_login_error() {
        let (transport, auth) = service();
        transport.push_json(201, "{}");
        transport.push_json(401, r#"{"message":"Invalid credentials"}"#);

        let err = auth.register(&creds()).unwrap_err();
        assert!(matches!(err, ApiError::Application { status: 401, .. }));
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[test]
    fn register_conflict_skips_login() {
        let (transport, auth) = service();
        transport.push_json(409, r#"{"message":"Email already registered"}"#);

        let err = auth.register(&creds()).unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(transport.sent().len(), 1, "login must not be attempted");
    }

    #[test]
    fn register_unexpected_error_passes_through() {
        let (transport, auth) = service();
        transport.push(Err(TransportError::Other("tls handshake".to_string())));

        let err = auth.register(&creds()).unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(ref msg) if msg == "tls handshake"));
        assert_eq!(transport.sent().len(), 1, "login must not be attempted");
    }

    #[test]
    fn unreachable_server_is_reported_as_such() {
        let (transport, auth) = service();
        transport.push(Err(TransportError::Connect("refused".to_string())));

        let err = auth.login(&creds()).unwrap_err();
        assert!(matches!(err, ApiError::ServerUnreachable));
        assert_eq!(err.to_string(), SERVER_UNREACHABLE_MESSAGE);
    }

    #[test]
    fn logout_clears_token_without_request() {
        let (transport, auth) = service();
        transport.push_json(200, LOGIN_OK);
        auth.login(&creds()).unwrap();

        auth.logout().unwrap();
        assert!(!auth.is_authenticated());
        assert_eq!(auth.token(), None);
        assert_eq!(transport.sent().len(), 1);
    }
}
