//! Token-lifecycle engine for a front-end authentication session.
//!
//! Verifies a cached identity token locally, refreshes expired credentials
//! through the identity gateway, and falls back to a redirect-based login
//! handshake when no usable credential exists.

#![warn(clippy::pedantic)]

/// Module for session error types
pub mod error;

/// Module for common session data types
pub mod types;

/// Module for session configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for unverified identity-token decoding
pub mod jwt;

/// Module for credential persistence
pub mod credentials;

/// Module for local identity-token verification
pub mod verifier;

/// Module for the identity gateway HTTP client
pub mod gateway;

/// Module for the redirect capability
pub mod navigator;

/// Module for session orchestration (init, confirm, access token, logout)
pub mod controller;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use credentials::{CredentialSet, CredentialSlot, CredentialStore};
pub use error::{Result, SessionError};
pub use gateway::{GatewayClient, GatewayError, HttpGatewayClient};
pub use navigator::Navigator;
pub use types::{AuthInitResult, SessionState};
pub use verifier::{TokenVerifier, UnauthorizedReason, VerificationResult};
