//! Identity-token claim decoding.
//!
//! Claims are decoded WITHOUT signature verification. The session trusts the
//! gateway that issued the token; this module only extracts the claims the
//! verifier needs (`aud`, `exp`).
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - The `sub` field is redacted in Debug output
//! - Decode failures are typed so the verifier can report them as a reason
//!   instead of raising

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted identity-token size in bytes (8KB).
///
/// Anything larger is rejected before base64 decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding an identity token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtDecodeError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("identity token exceeds {MAX_JWT_SIZE_BYTES} bytes")]
    TokenTooLarge,

    /// Token is not `header.payload.signature` or the payload is not base64url.
    #[error("identity token is not a well-formed JWT")]
    MalformedToken,

    /// Payload JSON is invalid or lacks the `aud`/`exp` claims.
    #[error("identity token claims are invalid: {0}")]
    InvalidClaims(String),
}

// =============================================================================
// Claims Types
// =============================================================================

/// Identity-token claims consumed by the session.
///
/// Unknown claims are ignored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Audience; must equal the configured client identifier.
    pub aud: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Subject - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl fmt::Debug for IdTokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdTokenClaims")
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("iat", &self.iat)
            .finish()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Decode the claim set of an identity token without verifying its signature.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - not three dot-separated parts, or payload is not base64url
/// - `InvalidClaims` - payload is not JSON or lacks `aud`/`exp`
pub fn decode_claims_unverified(token: &str) -> Result<IdTokenClaims, JwtDecodeError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "session.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtDecodeError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "session.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtDecodeError::MalformedToken);
    }

    let payload_part = parts.get(1).ok_or(JwtDecodeError::MalformedToken)?;
    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
        tracing::debug!(target: "session.jwt", error = %e, "Failed to decode JWT payload base64");
        JwtDecodeError::MalformedToken
    })?;

    serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "session.jwt", error = %e, "Failed to parse JWT claims JSON");
        JwtDecodeError::InvalidClaims(e.to_string())
    })
}

// =============================================================================
// Tests
// =============================================================================
