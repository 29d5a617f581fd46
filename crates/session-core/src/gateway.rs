//! Identity gateway HTTP client.
//!
//! Two remote operations against the configured gateway base address:
//!
//! - `POST {gateway}/auth` starts the redirect-based login bootstrap
//! - `POST {gateway}/refreshToken` exchanges a refresh token for new tokens
//!
//! Both send the `apiKey` header and the project id in the JSON body.
//! Response bodies are flat JSON objects whose fields are all optional.
//!
//! # Security
//!
//! - The API key and every token travel as `SecretString` (never logged)
//! - Error response bodies are logged at trace level only
//! - HTTP timeouts prevent hanging connections
//!
//! The client is stateless with respect to credentials. Evicting a stale
//! refresh token after a failed exchange is the controller's job.

use crate::config::{ConfigError, SessionConfig};
use crate::credentials::CredentialSet;
use crate::secret::{ExposeSecret, SecretString};
use crate::types::AuthInitResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

// =============================================================================
// Constants
// =============================================================================

/// Context attached to every `request_auth` failure.
pub const AUTH_FAILED_CONTEXT: &str = "auth request failed";

/// Context attached to every `refresh_token` failure.
pub const REFRESH_FAILED_CONTEXT: &str = "refresh token update failed";

/// Header carrying the gateway API key.
pub const API_KEY_HEADER: &str = "apiKey";

/// Bootstrap endpoint path.
pub const AUTH_PATH: &str = "/auth";

/// Refresh endpoint path.
pub const REFRESH_PATH: &str = "/refreshToken";

/// Default connection timeout for the HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Error Types
// =============================================================================

/// Underlying cause of a gateway failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayFailure {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Gateway rejected the request (4xx), e.g. an expired refresh token.
    #[error("rejected with status {status}")]
    Rejected { status: u16 },

    /// Gateway returned 5xx.
    #[error("gateway server error: status {status}")]
    ServerError { status: u16 },

    /// Any other non-success status.
    #[error("unexpected status {status}")]
    UnexpectedStatus { status: u16 },

    /// 2xx response whose body could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Gateway failure with a fixed human-readable context.
#[derive(Error, Debug, Clone)]
#[error("{context}: {source}")]
pub struct GatewayError {
    context: &'static str,
    source: GatewayFailure,
}

impl GatewayError {
    #[must_use]
    pub fn new(context: &'static str, source: GatewayFailure) -> Self {
        Self { context, source }
    }

    #[must_use]
    pub fn context(&self) -> &'static str {
        self.context
    }

    #[must_use]
    pub fn failure(&self) -> &GatewayFailure {
        &self.source
    }

    /// HTTP status of the failed response, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.source {
            GatewayFailure::Rejected { status }
            | GatewayFailure::ServerError { status }
            | GatewayFailure::UnexpectedStatus { status } => Some(status),
            GatewayFailure::Transport(_) | GatewayFailure::InvalidResponse(_) => None,
        }
    }
}

// =============================================================================
// Wire Types
// =============================================================================

fn serialize_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Body of `POST /auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub redirect_uri: String,
    pub project_id: String,
}

/// Body of `POST /refreshToken`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(serialize_with = "serialize_secret")]
    pub refresh_token: SecretString,
    pub project_id: String,
}

/// Body of the `/auth` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub request_uri: Option<String>,
    #[serde(default)]
    pub id_token: Option<SecretString>,
    #[serde(default)]
    pub access_token: Option<SecretString>,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
}

impl From<AuthResponse> for AuthInitResult {
    fn from(response: AuthResponse) -> Self {
        let tokens = CredentialSet {
            id_token: response.id_token,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        };
        Self {
            token_refreshed: false,
            request_uri: response.request_uri,
            session_id: response.session_id,
            tokens: (!tokens.is_empty()).then_some(tokens),
        }
    }
}

/// Body of the `/refreshToken` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub id_token: Option<SecretString>,
    #[serde(default)]
    pub access_token: Option<SecretString>,
    #[serde(default)]
    pub refresh_token: Option<SecretString>,
}

impl From<RefreshResponse> for CredentialSet {
    fn from(response: RefreshResponse) -> Self {
        Self {
            id_token: response.id_token,
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        }
    }
}

// =============================================================================
// Client Trait
// =============================================================================

/// Remote operations against the identity gateway (enables mocking).
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Start the identity-provider bootstrap.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` with context [`AUTH_FAILED_CONTEXT`].
    async fn request_auth(&self, request: &AuthRequest) -> Result<AuthResponse, GatewayError>;

    /// Exchange a refresh token for a new credential set.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` with context [`REFRESH_FAILED_CONTEXT`].
    async fn refresh_token(&self, request: &RefreshRequest)
        -> Result<RefreshResponse, GatewayError>;
}

// =============================================================================
// HTTP Client
// =============================================================================

/// reqwest-backed [`GatewayClient`].
#[derive(Clone)]
pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl std::fmt::Debug for HttpGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGatewayClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpGatewayClient {
    /// Build a client from the session configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the HTTP client cannot be built.
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.gateway_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B, context: &'static str) -> Result<T, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);

        debug!(target: "session.gateway", url = %url, "Calling identity gateway");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "session.gateway", error = %e, "Gateway request failed");
                GatewayError::new(context, GatewayFailure::Transport(e.to_string()))
            })?;

        Self::handle_response(response, context).await
    }

    /// Map status codes to failures and parse the success body.
    async fn handle_response<T>(
        response: reqwest::Response,
        context: &'static str,
    ) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                warn!(target: "session.gateway", error = %e, "Failed to parse gateway response");
                GatewayError::new(context, GatewayFailure::InvalidResponse(e.to_string()))
            });
        }

        let code = status.as_u16();
        let failure = if status.is_client_error() {
            let body = response.text().await.unwrap_or_else(|e| {
                trace!(target: "session.gateway", error = %e, "Failed to read error response body");
                "<failed to read body>".to_string()
            });
            warn!(target: "session.gateway", status = %status, "Gateway rejected request");
            trace!(target: "session.gateway", body = %body, "Gateway rejection response body");
            GatewayFailure::Rejected { status: code }
        } else if status.is_server_error() {
            warn!(target: "session.gateway", status = %status, "Gateway returned server error");
            GatewayFailure::ServerError { status: code }
        } else {
            warn!(target: "session.gateway", status = %status, "Unexpected response from gateway");
            GatewayFailure::UnexpectedStatus { status: code }
        };

        Err(GatewayError::new(context, failure))
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    #[instrument(skip_all)]
    async fn request_auth(&self, request: &AuthRequest) -> Result<AuthResponse, GatewayError> {
        self.post(AUTH_PATH, request, AUTH_FAILED_CONTEXT).await
    }

    #[instrument(skip_all)]
    async fn refresh_token(
        &self,
        request: &RefreshRequest,
    ) -> Result<RefreshResponse, GatewayError> {
        self.post(REFRESH_PATH, request, REFRESH_FAILED_CONTEXT).await
    }
}

// =============================================================================
// Tests
// =============================================================================
