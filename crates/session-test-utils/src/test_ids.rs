//! Fixed test IDs for deterministic tests
//!
//! All identifiers are constants so failures are reproducible.

use session_core::secret::SecretString;
use session_core::SessionConfig;

// Client / project
pub const TEST_CLIENT_ID: &str = "web-client";
pub const TEST_FOREIGN_CLIENT_ID: &str = "invalidClientId";
pub const TEST_PROJECT_ID: &str = "sample";

// Gateway
pub const TEST_API_KEY: &str = "test-api-key-do-not-use-in-production";
pub const TEST_GATEWAY_URL: &str = "http://gateway.test.invalid";
pub const TEST_REDIRECT_URI: &str = "https://app.test/callback";

// Redirect handshake
pub const TEST_SESSION_ID: &str = "s1";
pub const TEST_REQUEST_URI: &str = "https://idp/login";

// Token values
pub const TEST_REFRESH_TOKEN: &str = "r1";
pub const TEST_ROTATED_REFRESH_TOKEN: &str = "r2";
pub const TEST_ACCESS_TOKEN: &str = "access-1";
pub const TEST_REFRESHED_ACCESS_TOKEN: &str = "access-2";

// Signing secret for test identity tokens (never verified by the engine)
pub const TEST_SIGNING_SECRET: &[u8] = b"test-signing-secret";

/// Configuration using the fixed test values and [`TEST_GATEWAY_URL`].
pub fn test_config() -> SessionConfig {
    test_config_for(TEST_GATEWAY_URL)
}

/// Configuration using the fixed test values against `gateway_url`.
pub fn test_config_for(gateway_url: &str) -> SessionConfig {
    SessionConfig::new(
        SecretString::from(TEST_API_KEY),
        TEST_CLIENT_ID,
        gateway_url,
        TEST_REDIRECT_URI,
        TEST_PROJECT_ID,
    )
}
