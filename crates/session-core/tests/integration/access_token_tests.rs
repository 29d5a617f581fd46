//! Integration tests for `get_access_token`
//!
//! Covers the three sources in order: the stored token of a verified
//! session, a refresh exchange, and the redirect fallback.

use session_core::gateway::GatewayFailure;
use session_core::secret::ExposeSecret;
use session_core::{CredentialSlot, SessionError};
use session_test_utils::*;

/// A verified session returns exactly the stored token and never calls the
/// gateway.
#[tokio::test]
async fn test_authorized_session_uses_stored_token_without_network() -> Result<(), anyhow::Error> {
    let session = TestSession::new(MockGatewayClient::redirecting());
    session
        .seed(CredentialSlot::IdToken, &valid_id_token())
        .seed(CredentialSlot::AccessToken, TEST_ACCESS_TOKEN)
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    for _ in 0..3 {
        let token = session.controller.get_access_token().await?;
        assert_eq!(token.expose_secret(), TEST_ACCESS_TOKEN);
    }

    assert_eq!(session.gateway.total_calls(), 0);

    Ok(())
}

/// An expired session is refreshed and the new access token returned.
#[tokio::test]
async fn test_expired_session_returns_refreshed_token() -> Result<(), anyhow::Error> {
    let session = TestSession::new(
        MockGatewayClient::new().with_refresh_response(refresh_response(&valid_id_token())),
    );
    session
        .seed(CredentialSlot::IdToken, &expired_id_token())
        .seed(CredentialSlot::AccessToken, TEST_ACCESS_TOKEN)
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    let token = session.controller.get_access_token().await?;

    assert_eq!(token.expose_secret(), TEST_REFRESHED_ACCESS_TOKEN);
    assert_eq!(
        session.stored(CredentialSlot::AccessToken).as_deref(),
        Some(TEST_REFRESHED_ACCESS_TOKEN)
    );
    assert_eq!(session.gateway.refresh_calls(), 1);
    assert!(session.controller.is_authenticated()?);

    Ok(())
}

/// A failed refresh falls back to the bootstrap: the navigator is invoked
/// and the caller gets an explicit `MissingCredential`.
#[tokio::test]
async fn test_failed_refresh_falls_back_to_redirect() -> Result<(), anyhow::Error> {
    let session = TestSession::new(
        MockGatewayClient::redirecting()
            .with_refresh_failure(GatewayFailure::Rejected { status: 401 }),
    );
    session
        .seed(CredentialSlot::IdToken, &expired_id_token())
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    let err = session.controller.get_access_token().await.unwrap_err();

    assert!(matches!(err, SessionError::MissingCredential(_)), "got: {err}");
    assert_eq!(session.stored(CredentialSlot::RefreshToken), None);
    assert_eq!(session.gateway.refresh_calls(), 1);
    assert_eq!(session.gateway.auth_calls(), 1);
    assert_eq!(session.navigator.redirects(), vec![TEST_REQUEST_URI.to_string()]);
    assert_eq!(
        session.stored(CredentialSlot::SessionId).as_deref(),
        Some(TEST_SESSION_ID)
    );

    Ok(())
}

/// With no refresh token there is nothing to exchange: straight to the
/// bootstrap, no refresh call.
#[tokio::test]
async fn test_missing_refresh_token_skips_exchange() -> Result<(), anyhow::Error> {
    let session = TestSession::new(MockGatewayClient::redirecting());
    session.seed(CredentialSlot::IdToken, &expired_id_token());

    let err = session.controller.get_access_token().await.unwrap_err();

    assert!(matches!(err, SessionError::MissingCredential(_)));
    assert_eq!(session.gateway.refresh_calls(), 0);
    assert_eq!(session.gateway.auth_calls(), 1);
    assert_eq!(session.navigator.redirect_count(), 1);

    Ok(())
}

/// A bootstrap failure during the fallback reaches the caller.
#[tokio::test]
async fn test_fallback_gateway_error_propagates() -> Result<(), anyhow::Error> {
    let session = TestSession::new(
        MockGatewayClient::new()
            .with_auth_failure(GatewayFailure::Transport("unreachable".to_string())),
    );

    let err = session.controller.get_access_token().await.unwrap_err();

    assert!(err.is_gateway());
    assert_eq!(session.navigator.redirect_count(), 0);

    Ok(())
}

/// A verified identity token without an access token is reported, not
/// papered over.
#[tokio::test]
async fn test_verified_session_without_access_token() -> Result<(), anyhow::Error> {
    let session = TestSession::new(MockGatewayClient::redirecting());
    session.seed(CredentialSlot::IdToken, &valid_id_token());

    let err = session.controller.get_access_token().await.unwrap_err();

    assert!(matches!(err, SessionError::MissingCredential(_)));
    assert_eq!(session.gateway.total_calls(), 0);

    Ok(())
}
