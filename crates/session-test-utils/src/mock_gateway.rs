//! In-process gateway double.
//!
//! Returns canned responses or failures, counts calls and records the
//! refresh tokens it was handed. An optional delay on refresh widens the
//! window for concurrency tests.
//!
//! # Example
//!
//! ```rust,ignore
//! let gateway = MockGatewayClient::new()
//!     .with_refresh_response(refresh_response(&valid_id_token()))
//!     .with_refresh_delay(Duration::from_millis(100));
//! ```

use async_trait::async_trait;
use session_core::gateway::{
    AuthRequest, AuthResponse, GatewayClient, GatewayError, GatewayFailure, RefreshRequest,
    RefreshResponse, AUTH_FAILED_CONTEXT, REFRESH_FAILED_CONTEXT,
};
use session_core::secret::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::test_ids::{TEST_REFRESHED_ACCESS_TOKEN, TEST_REQUEST_URI, TEST_SESSION_ID};

/// Mock gateway client for controller tests.
pub struct MockGatewayClient {
    auth_outcome: Result<AuthResponse, GatewayFailure>,
    refresh_outcome: Result<RefreshResponse, GatewayFailure>,
    refresh_delay: Option<Duration>,
    auth_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    refresh_tokens_seen: Mutex<Vec<String>>,
}

impl MockGatewayClient {
    /// Mock returning empty responses to both calls.
    pub fn new() -> Self {
        Self {
            auth_outcome: Ok(AuthResponse::default()),
            refresh_outcome: Ok(RefreshResponse::default()),
            refresh_delay: None,
            auth_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            refresh_tokens_seen: Mutex::new(Vec::new()),
        }
    }

    /// `/auth` answers with a redirect to [`TEST_REQUEST_URI`] for [`TEST_SESSION_ID`].
    pub fn redirecting() -> Self {
        Self::new().with_auth_response(redirect_response(TEST_SESSION_ID, TEST_REQUEST_URI))
    }

    pub fn with_auth_response(mut self, response: AuthResponse) -> Self {
        self.auth_outcome = Ok(response);
        self
    }

    pub fn with_auth_failure(mut self, failure: GatewayFailure) -> Self {
        self.auth_outcome = Err(failure);
        self
    }

    pub fn with_refresh_response(mut self, response: RefreshResponse) -> Self {
        self.refresh_outcome = Ok(response);
        self
    }

    pub fn with_refresh_failure(mut self, failure: GatewayFailure) -> Self {
        self.refresh_outcome = Err(failure);
        self
    }

    /// Sleep before answering each refresh call.
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Total gateway calls of either kind.
    pub fn total_calls(&self) -> usize {
        self.auth_calls() + self.refresh_calls()
    }

    /// Refresh tokens presented to `/refreshToken`, in call order.
    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().unwrap().clone()
    }
}

impl Default for MockGatewayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayClient for MockGatewayClient {
    async fn request_auth(&self, _request: &AuthRequest) -> Result<AuthResponse, GatewayError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.auth_outcome
            .clone()
            .map_err(|failure| GatewayError::new(AUTH_FAILED_CONTEXT, failure))
    }

    async fn refresh_token(
        &self,
        request: &RefreshRequest,
    ) -> Result<RefreshResponse, GatewayError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(request.refresh_token.expose_secret().to_string());

        if let Some(delay) = self.refresh_delay {
            tokio::time::sleep(delay).await;
        }

        self.refresh_outcome
            .clone()
            .map_err(|failure| GatewayError::new(REFRESH_FAILED_CONTEXT, failure))
    }
}

/// `/auth` response requiring a redirect.
pub fn redirect_response(session_id: &str, request_uri: &str) -> AuthResponse {
    AuthResponse {
        session_id: Some(session_id.to_string()),
        request_uri: Some(request_uri.to_string()),
        ..AuthResponse::default()
    }
}

/// `/refreshToken` response carrying `id_token` and [`TEST_REFRESHED_ACCESS_TOKEN`],
/// without a rotated refresh token.
pub fn refresh_response(id_token: &str) -> RefreshResponse {
    RefreshResponse {
        id_token: Some(SecretString::from(id_token)),
        access_token: Some(SecretString::from(TEST_REFRESHED_ACCESS_TOKEN)),
        refresh_token: None,
    }
}
