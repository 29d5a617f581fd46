//! Secret types for protecting credentials from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Every token the
//! session handles (identity, access, refresh) and the gateway API key are
//! carried as [`SecretString`], so any struct deriving `Debug` over them gets
//! redacted output for free.
//!
//! # Example
//!
//! ```rust
//! use session_core::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct RefreshRequest {
//!     project_id: String,
//!     refresh_token: SecretString,
//! }
//!
//! let req = RefreshRequest {
//!     project_id: "sample".to_string(),
//!     refresh_token: SecretString::from("r1"),
//! };
//!
//! // Safe: the refresh token is redacted
//! println!("{:?}", req);
//!
//! let raw: &str = req.refresh_token.expose_secret();
//! assert_eq!(raw, "r1");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

/// Wrap an optional borrowed string as an optional secret.
#[must_use]
pub fn secret_opt(value: Option<&str>) -> Option<SecretString> {
    value.map(SecretString::from)
}
