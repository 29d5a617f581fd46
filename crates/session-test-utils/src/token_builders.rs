//! Builder patterns for test identity tokens
//!
//! Tokens are real HS256 JWTs. The engine only decodes the claims segment,
//! so the signature is never checked.

use crate::test_ids::{TEST_CLIENT_ID, TEST_FOREIGN_CLIENT_ID, TEST_SIGNING_SECRET};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

/// Builder for identity tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestIdTokenBuilder::new()
///     .for_audience("web-client")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestIdTokenBuilder {
    aud: String,
    sub: String,
    exp: i64,
    iat: i64,
}

impl TestIdTokenBuilder {
    /// Create a builder for a token valid for one hour for [`TEST_CLIENT_ID`]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            aud: TEST_CLIENT_ID.to_string(),
            sub: "test-user".to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the audience claim
    pub fn for_audience(mut self, aud: &str) -> Self {
        self.aud = aud.to_string();
        self
    }

    /// Set the subject claim
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set an absolute expiration timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn claims(&self) -> serde_json::Value {
        json!({
            "aud": self.aud,
            "sub": self.sub,
            "exp": self.exp,
            "iat": self.iat,
        })
    }

    /// Encode and sign the token
    pub fn build(self) -> String {
        encode(
            &Header::default(),
            &self.claims(),
            &EncodingKey::from_secret(TEST_SIGNING_SECRET),
        )
        .expect("test token encoding should succeed")
    }
}

impl Default for TestIdTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Token that verifies for [`TEST_CLIENT_ID`] for the next hour.
pub fn valid_id_token() -> String {
    TestIdTokenBuilder::new().build()
}

/// Token for [`TEST_CLIENT_ID`] that expired an hour ago.
pub fn expired_id_token() -> String {
    TestIdTokenBuilder::new().expires_in(-3600).build()
}

/// Unexpired token issued for another client.
pub fn foreign_id_token() -> String {
    TestIdTokenBuilder::new()
        .for_audience(TEST_FOREIGN_CLIENT_ID)
        .build()
}
