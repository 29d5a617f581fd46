//! Session error types.
//!
//! A failed local verification is a
//! [`VerificationResult`](crate::verifier::VerificationResult), not an error.

use crate::credentials::StoreError;
use crate::gateway::GatewayError;
use thiserror::Error;

/// Errors surfaced by the session lifecycle operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The identity gateway could not be reached or rejected the request.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The credential store failed to read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No access token could be obtained after verify, refresh and the
    /// redirect fallback.
    #[error("No access token available: {0}")]
    MissingCredential(String),
}

impl SessionError {
    /// Returns `true` if the error originated from the identity gateway.
    #[must_use]
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}

/// Result type alias using `SessionError`
pub type Result<T> = std::result::Result<T, SessionError>;
