//! # Session Test Utilities
//!
//! Shared test utilities for the session lifecycle engine.
//!
//! This crate provides:
//! - Fixed test IDs and configuration (`test_config`)
//! - Identity-token builders (`TestIdTokenBuilder`)
//! - An in-process gateway double (`MockGatewayClient`)
//! - A navigator that records redirects (`RecordingNavigator`)
//! - A wiremock-backed gateway harness (`TestGateway`)
//! - A controller wired to the doubles above (`TestSession`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let session = TestSession::new(
//!         MockGatewayClient::new().with_refresh_response(refresh_response(&valid_id_token())),
//!     );
//!     session.seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);
//!
//!     let token = session.controller.get_access_token().await.unwrap();
//! }
//! ```

pub mod gateway_harness;
pub mod mock_gateway;
pub mod navigator;
pub mod session_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use gateway_harness::*;
pub use mock_gateway::*;
pub use navigator::*;
pub use session_harness::*;
pub use test_ids::*;
pub use token_builders::*;
