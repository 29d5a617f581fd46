//! Local identity-token verification.
//!
//! No network access and no side effects beyond debug logging. Every failure
//! is a [`VerificationResult::Unauthorized`] value carrying the reason,
//! including tokens that cannot be decoded.

use crate::jwt::{decode_claims_unverified, JwtDecodeError};
use thiserror::Error;

/// Why a stored identity token did not verify.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnauthorizedReason {
    #[error("no identity token stored")]
    MissingToken,

    #[error("identity token could not be decoded: {0}")]
    Malformed(JwtDecodeError),

    #[error("identity token audience does not match client id")]
    AudienceMismatch,

    #[error("identity token has expired")]
    Expired,
}

/// Outcome of local verification. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Authorized,
    Unauthorized(UnauthorizedReason),
}

impl VerificationResult {
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }
}

/// Checks audience and expiry of an identity token against the client id.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    expected_audience: String,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(expected_audience: impl Into<String>) -> Self {
        Self {
            expected_audience: expected_audience.into(),
        }
    }

    #[must_use]
    pub fn expected_audience(&self) -> &str {
        &self.expected_audience
    }

    /// Verify against the current wall clock, truncated to whole seconds.
    #[must_use]
    pub fn verify(&self, id_token: Option<&str>) -> VerificationResult {
        self.verify_at(id_token, chrono::Utc::now().timestamp())
    }

    /// Deterministic verification against an explicit `now` (epoch seconds).
    #[must_use]
    pub fn verify_at(&self, id_token: Option<&str>, now: i64) -> VerificationResult {
        let Some(token) = id_token else {
            return VerificationResult::Unauthorized(UnauthorizedReason::MissingToken);
        };

        let claims = match decode_claims_unverified(token) {
            Ok(claims) => claims,
            Err(e) => {
                return VerificationResult::Unauthorized(UnauthorizedReason::Malformed(e));
            }
        };

        if claims.aud != self.expected_audience {
            tracing::debug!(
                target: "session.verifier",
                expected = %self.expected_audience,
                actual = %claims.aud,
                "Identity token rejected: audience mismatch"
            );
            return VerificationResult::Unauthorized(UnauthorizedReason::AudienceMismatch);
        }

        if claims.exp < now {
            tracing::debug!(
                target: "session.verifier",
                exp = claims.exp,
                now = now,
                "Identity token rejected: expired"
            );
            return VerificationResult::Unauthorized(UnauthorizedReason::Expired);
        }

        VerificationResult::Authorized
    }
}
