//! Common data types for the session lifecycle.

use crate::credentials::CredentialSet;
use std::fmt;

/// Outcome of one `init_auth` pass, handed to the next orchestration step.
///
/// Never persisted directly; its token fields are written into the store as
/// a side effect by the controller.
#[derive(Debug, Clone, Default)]
pub struct AuthInitResult {
    /// A refresh exchange happened during this pass.
    pub token_refreshed: bool,

    /// Identity-provider login URI the application must navigate to.
    pub request_uri: Option<String>,

    /// Session artifact correlating the pending redirect.
    pub session_id: Option<String>,

    /// Tokens issued directly by the gateway, without a redirect.
    pub tokens: Option<CredentialSet>,
}

impl AuthInitResult {
    /// Result of a pass that found the session already authorized.
    #[must_use]
    pub fn authorized() -> Self {
        Self::default()
    }

    /// Result of a pass that refreshed the credential set.
    #[must_use]
    pub fn refreshed() -> Self {
        Self {
            token_refreshed: true,
            ..Self::default()
        }
    }

    /// Whether the surrounding application still has to hand control to the
    /// identity provider.
    #[must_use]
    pub fn requires_redirect(&self) -> bool {
        self.session_id.is_some() || self.request_uri.is_some()
    }
}

/// Derived lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable identity token and no pending login.
    Unauthenticated,
    /// Bootstrap issued; waiting for the identity provider to return control.
    AwaitingRedirect,
    /// A refresh exchange is in flight.
    Refreshing,
    /// Stored identity token verifies locally.
    Authenticated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AwaitingRedirect => "awaiting_redirect",
            Self::Refreshing => "refreshing",
            Self::Authenticated => "authenticated",
        };
        f.write_str(s)
    }
}
