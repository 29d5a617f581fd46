//! Session orchestration.
//!
//! [`SessionController`] ties the credential store, the local verifier and the
//! identity gateway into the public lifecycle operations:
//!
//! - [`init_auth`](SessionController::init_auth) - verify, else refresh, else
//!   start the redirect bootstrap
//! - [`confirm_jwt_authentication`](SessionController::confirm_jwt_authentication) -
//!   run `init_auth`, retry verification once after a refresh, redirect when
//!   a login is required
//! - [`get_access_token`](SessionController::get_access_token) - stored token
//!   when the session verifies, otherwise refresh, otherwise fall back to
//!   `confirm_jwt_authentication`
//! - [`logout`](SessionController::logout) - local-only credential wipe
//!
//! # Concurrency
//!
//! One controller manages one session. Refresh exchanges are single-flight:
//! whoever holds the refresh guard re-verifies before calling the gateway, so
//! callers queued behind a successful refresh reuse its result instead of
//! issuing their own exchange. The guard is never held across the redirect
//! fallback.

use crate::config::{ConfigError, SessionConfig};
use crate::credentials::{CredentialSet, CredentialSlot, CredentialStore};
use crate::error::{Result, SessionError};
use crate::gateway::{AuthRequest, GatewayClient, HttpGatewayClient, RefreshRequest};
use crate::navigator::Navigator;
use crate::secret::SecretString;
use crate::types::{AuthInitResult, SessionState};
use crate::verifier::{TokenVerifier, VerificationResult};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// How a successful refresh exchange is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WritePolicy {
    /// All three slots, clear-on-absence.
    Full,
    /// Identity/access tokens; refresh token kept unless rotated.
    Refreshed,
}

/// What the single-flight refresh ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    /// This caller performed the exchange.
    Exchanged,
    /// Another caller refreshed while this one waited for the guard.
    AlreadyFresh,
    /// No refresh token was stored once the guard was held.
    NoRefreshToken,
}

/// Orchestrates one authentication session.
pub struct SessionController {
    config: SessionConfig,
    verifier: TokenVerifier,
    store: Arc<dyn CredentialStore>,
    gateway: Arc<dyn GatewayClient>,
    navigator: Arc<dyn Navigator>,
    refresh_guard: Mutex<()>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller over injected collaborators.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        gateway: Arc<dyn GatewayClient>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let verifier = TokenVerifier::new(config.client_id.clone());
        Self {
            config,
            verifier,
            store,
            gateway,
            navigator,
            refresh_guard: Mutex::new(()),
        }
    }

    /// Create a controller talking to the gateway over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the HTTP client cannot be built.
    pub fn with_http_gateway(
        config: SessionConfig,
        store: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> std::result::Result<Self, ConfigError> {
        let gateway = Arc::new(HttpGatewayClient::new(&config)?);
        Ok(Self::new(config, store, gateway, navigator))
    }

    /// Verify the stored identity token locally.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the store cannot be read.
    pub fn verify(&self) -> Result<VerificationResult> {
        let id_token = self.store.get(CredentialSlot::IdToken)?;
        Ok(self.verifier.verify(id_token.as_deref()))
    }

    /// Whether the stored identity token currently verifies.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the store cannot be read.
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.verify()?.is_authorized())
    }

    /// Derived lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` if the store cannot be read.
    pub fn state(&self) -> Result<SessionState> {
        if self.refresh_guard.try_lock().is_err() {
            return Ok(SessionState::Refreshing);
        }
        if self.verify()?.is_authorized() {
            return Ok(SessionState::Authenticated);
        }
        if self.store.get(CredentialSlot::SessionId)?.is_some() {
            return Ok(SessionState::AwaitingRedirect);
        }
        Ok(SessionState::Unauthenticated)
    }

    /// Start the identity-provider bootstrap. No local state is touched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Gateway` (context "auth request failed").
    #[instrument(skip_all)]
    pub async fn request_auth(&self) -> Result<AuthInitResult> {
        let request = AuthRequest {
            redirect_uri: self.config.redirect_uri.clone(),
            project_id: self.config.project_id.clone(),
        };
        let response = self.gateway.request_auth(&request).await?;
        debug!(
            target: "session.controller",
            has_session_id = response.session_id.is_some(),
            has_request_uri = response.request_uri.is_some(),
            "Auth request completed"
        );
        Ok(response.into())
    }

    /// Exchange the stored refresh token for a new credential set.
    ///
    /// Nothing is written on success; the caller decides how to store the
    /// result. On gateway failure the stored refresh token is removed before
    /// the error is returned, so a stale token is never retried.
    ///
    /// # Errors
    ///
    /// - `SessionError::MissingCredential` if no refresh token is stored
    /// - `SessionError::Gateway` (context "refresh token update failed")
    /// - `SessionError::Store` if the store fails, including during eviction
    #[instrument(skip_all)]
    pub async fn refresh_token(&self) -> Result<CredentialSet> {
        let refresh_token = self
            .store
            .get(CredentialSlot::RefreshToken)?
            .ok_or_else(|| SessionError::MissingCredential("no refresh token stored".into()))?;

        let request = RefreshRequest {
            refresh_token: SecretString::from(refresh_token),
            project_id: self.config.project_id.clone(),
        };

        match self.gateway.refresh_token(&request).await {
            Ok(response) => {
                debug!(target: "session.controller", "Refresh token exchanged");
                Ok(response.into())
            }
            Err(e) => {
                warn!(
                    target: "session.controller",
                    error = %e,
                    "Refresh exchange failed, evicting stored refresh token"
                );
                self.store.remove(CredentialSlot::RefreshToken)?;
                Err(e.into())
            }
        }
    }

    /// Single-flight refresh: re-verify and re-read the refresh token under
    /// the guard, exchange only if still unauthorized, then persist with
    /// `policy`.
    async fn refresh_single_flight(&self, policy: WritePolicy) -> Result<RefreshOutcome> {
        let _guard = self.refresh_guard.lock().await;

        if self.verify()?.is_authorized() {
            debug!(target: "session.controller", "Session refreshed by a concurrent caller");
            return Ok(RefreshOutcome::AlreadyFresh);
        }

        // A concurrent caller may have evicted it after a failed exchange.
        if self.store.get(CredentialSlot::RefreshToken)?.is_none() {
            debug!(target: "session.controller", "No refresh token stored");
            return Ok(RefreshOutcome::NoRefreshToken);
        }

        let credentials = self.refresh_token().await?;
        match policy {
            WritePolicy::Full => self.store.set_credentials(&credentials)?,
            WritePolicy::Refreshed => self.store.set_refreshed(&credentials)?,
        }
        Ok(RefreshOutcome::Exchanged)
    }

    /// Verify, else refresh, else start the redirect bootstrap.
    ///
    /// - Authorized: `{token_refreshed: false}`, store untouched
    /// - Unauthorized with a refresh token: refresh, store the identity and
    ///   access tokens, `{token_refreshed: true}`
    /// - Unauthorized without a refresh token: the `request_auth` result,
    ///   verbatim
    ///
    /// # Errors
    ///
    /// Gateway failures propagate; after a refresh failure the refresh token
    /// has already been evicted.
    #[instrument(skip_all)]
    pub async fn init_auth(&self) -> Result<AuthInitResult> {
        let verification = self.verify()?;
        if verification.is_authorized() {
            return Ok(AuthInitResult::authorized());
        }

        debug!(target: "session.controller", reason = ?verification, "Identity token not usable");

        if self.store.get(CredentialSlot::RefreshToken)?.is_some() {
            match self.refresh_single_flight(WritePolicy::Refreshed).await? {
                RefreshOutcome::Exchanged => return Ok(AuthInitResult::refreshed()),
                RefreshOutcome::AlreadyFresh => return Ok(AuthInitResult::authorized()),
                RefreshOutcome::NoRefreshToken => {}
            }
        }

        self.request_auth().await
    }

    /// One re-verification pass after a refresh. Never loops.
    async fn retry_auth(&self) -> Result<VerificationResult> {
        let verification = self.verify()?;
        if verification.is_authorized() {
            return Ok(verification);
        }

        if self.store.get(CredentialSlot::RefreshToken)?.is_some() {
            self.refresh_single_flight(WritePolicy::Refreshed).await?;
        }
        self.verify()
    }

    /// Confirm the session, redirecting to the identity provider if needed.
    ///
    /// Returns `true` when the session is authenticated. Returns `false` when
    /// control has been handed to the identity provider (the session id is
    /// persisted and the navigator invoked), or when a refreshed session still
    /// fails verification after the single retry.
    ///
    /// In that last case the navigator is *not* invoked and nothing is
    /// persisted: the host sees "not authenticated" without a redirect. The
    /// next call finds the session unauthorized and either refreshes again or,
    /// once the refresh token is gone, starts the bootstrap.
    ///
    /// # Errors
    ///
    /// Gateway and store failures propagate.
    #[instrument(skip_all)]
    pub async fn confirm_jwt_authentication(&self) -> Result<bool> {
        let result = self.init_auth().await?;

        if result.token_refreshed {
            let verification = self.retry_auth().await?;
            if !verification.is_authorized() {
                warn!(
                    target: "session.controller",
                    reason = ?verification,
                    "Session still unauthorized after refresh retry"
                );
                return Ok(false);
            }
        }

        let mut authenticated = true;
        if let Some(tokens) = &result.tokens {
            self.store.set_credentials(tokens)?;
            authenticated = self.verify()?.is_authorized();
        }

        if !result.requires_redirect() {
            if authenticated {
                self.store.set_session_id(None)?;
                info!(target: "session.controller", "Session authenticated");
            }
            return Ok(authenticated);
        }

        self.store.set_session_id(result.session_id.as_deref())?;
        match result.request_uri.as_deref() {
            Some(uri) => {
                info!(target: "session.controller", "Redirecting to identity provider");
                self.navigator.redirect_to(uri);
            }
            None => {
                warn!(target: "session.controller", "Auth response carried a session id but no request URI");
            }
        }
        Ok(false)
    }

    /// Access token for the current session.
    ///
    /// No network call when the stored identity token verifies. Otherwise the
    /// session is refreshed (single-flight); if that fails the controller
    /// falls back to [`confirm_jwt_authentication`](Self::confirm_jwt_authentication),
    /// which may redirect.
    ///
    /// # Errors
    ///
    /// - `SessionError::MissingCredential` if no access token is obtainable
    /// - `SessionError::Store` on storage failure
    /// - Errors from the redirect fallback propagate
    #[instrument(skip_all)]
    pub async fn get_access_token(&self) -> Result<SecretString> {
        if self.verify()?.is_authorized() {
            return self.stored_access_token()?.ok_or_else(|| {
                SessionError::MissingCredential("identity token valid but no access token stored".into())
            });
        }

        match self.refresh_single_flight(WritePolicy::Full).await {
            Ok(RefreshOutcome::NoRefreshToken) => {
                debug!(target: "session.controller", "Nothing to refresh, falling back to re-authentication");
            }
            Ok(RefreshOutcome::Exchanged | RefreshOutcome::AlreadyFresh) => {
                if let Some(token) = self.stored_access_token()? {
                    return Ok(token);
                }
                warn!(target: "session.controller", "Refresh returned no access token");
            }
            Err(SessionError::Store(e)) => return Err(SessionError::Store(e)),
            Err(e) => {
                warn!(
                    target: "session.controller",
                    error = %e,
                    "Refresh failed, falling back to re-authentication"
                );
            }
        }

        let authenticated = self.confirm_jwt_authentication().await?;
        if authenticated {
            if let Some(token) = self.stored_access_token()? {
                return Ok(token);
            }
        }

        Err(SessionError::MissingCredential(if authenticated {
            "session authenticated but no access token stored".into()
        } else {
            "login required".into()
        }))
    }

    /// Clear the credential set and pending session id. Local only.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Store` on storage failure.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        self.store.set_session_id(None)?;
        info!(target: "session.controller", "Session logged out");
        Ok(())
    }

    fn stored_access_token(&self) -> Result<Option<SecretString>> {
        Ok(self
            .store
            .get(CredentialSlot::AccessToken)?
            .map(SecretString::from))
    }
}
