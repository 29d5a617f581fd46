//! Session configuration.
//!
//! All inputs are externally supplied: nothing here is computed. The API key
//! is held as a [`SecretString`] and redacted in Debug output.

use crate::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP request timeout for gateway calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound accepted for `SESSION_HTTP_TIMEOUT_SECONDS`.
pub const MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment variable names.
pub const API_KEY_ENV: &str = "SESSION_API_KEY";
pub const CLIENT_ID_ENV: &str = "SESSION_CLIENT_ID";
pub const GATEWAY_URL_ENV: &str = "SESSION_GATEWAY_URL";
pub const REDIRECT_URI_ENV: &str = "SESSION_REDIRECT_URI";
pub const PROJECT_ID_ENV: &str = "SESSION_PROJECT_ID";
pub const HTTP_TIMEOUT_ENV: &str = "SESSION_HTTP_TIMEOUT_SECONDS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid HTTP timeout configuration: {0}")]
    InvalidHttpTimeout(String),

    #[error("Insecure gateway URL: {0}")]
    InsecureGateway(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Configuration for one authentication session.
#[derive(Clone)]
pub struct SessionConfig {
    /// Gateway API key, sent as the `apiKey` header.
    pub api_key: SecretString,

    /// Client identifier; must equal the identity token's `aud` claim.
    pub client_id: String,

    /// Gateway base address, without trailing slash.
    pub gateway_url: String,

    /// Where the identity provider returns control after login.
    pub redirect_uri: String,

    /// Project identifier sent in every gateway request body.
    pub project_id: String,

    /// HTTP request timeout for gateway calls.
    pub http_timeout: Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("api_key", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .field("gateway_url", &self.gateway_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("project_id", &self.project_id)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl SessionConfig {
    /// Create a new configuration with the default HTTP timeout.
    ///
    /// Using an `http://` gateway sends the API key and refresh tokens in
    /// plain text. Use [`SessionConfig::new_secure`] to enforce HTTPS.
    #[must_use]
    pub fn new(
        api_key: SecretString,
        client_id: impl Into<String>,
        gateway_url: impl Into<String>,
        redirect_uri: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        let gateway_url: String = gateway_url.into();
        Self {
            api_key,
            client_id: client_id.into(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            redirect_uri: redirect_uri.into(),
            project_id: project_id.into(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Create a new configuration requiring an HTTPS gateway.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InsecureGateway` if the URL doesn't use HTTPS.
    pub fn new_secure(
        api_key: SecretString,
        client_id: impl Into<String>,
        gateway_url: impl Into<String>,
        redirect_uri: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let gateway_url: String = gateway_url.into();
        if !gateway_url.starts_with("https://") {
            return Err(ConfigError::InsecureGateway(
                "gateway URL must use HTTPS".into(),
            ));
        }
        Ok(Self::new(
            api_key,
            client_id,
            gateway_url,
            redirect_uri,
            project_id,
        ))
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`SessionConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingEnvVar` if a required variable is absent
    /// - `ConfigError::InvalidHttpTimeout` if the timeout is not a positive
    ///   integer no larger than [`MAX_HTTP_TIMEOUT`]
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            vars.get(name)
                .cloned()
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };

        let api_key = SecretString::from(required(API_KEY_ENV)?);
        let client_id = required(CLIENT_ID_ENV)?;
        let gateway_url = required(GATEWAY_URL_ENV)?;
        let redirect_uri = required(REDIRECT_URI_ENV)?;
        let project_id = required(PROJECT_ID_ENV)?;

        let http_timeout = if let Some(value_str) = vars.get(HTTP_TIMEOUT_ENV) {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidHttpTimeout(format!(
                    "{HTTP_TIMEOUT_ENV} must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidHttpTimeout(format!(
                    "{HTTP_TIMEOUT_ENV} must be greater than 0"
                )));
            }

            if value > MAX_HTTP_TIMEOUT.as_secs() {
                return Err(ConfigError::InvalidHttpTimeout(format!(
                    "{HTTP_TIMEOUT_ENV} must not exceed {} seconds, got {value}",
                    MAX_HTTP_TIMEOUT.as_secs()
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_HTTP_TIMEOUT
        };

        Ok(
            Self::new(api_key, client_id, gateway_url, redirect_uri, project_id)
                .with_http_timeout(http_timeout),
        )
    }
}
