//! Integration tests for single-flight refresh
//!
//! The mock gateway delays its refresh answer so concurrent callers overlap.

use session_core::gateway::GatewayFailure;
use session_core::secret::ExposeSecret;
use session_core::{CredentialSlot, SessionError, SessionState};
use session_test_utils::*;
use std::time::Duration;

const REFRESH_DELAY: Duration = Duration::from_millis(200);

/// Two simultaneous `get_access_token` calls under an expired token issue
/// exactly one refresh exchange and both receive the new token.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_access_token_calls_refresh_once() -> Result<(), anyhow::Error> {
    // Arrange
    let session = TestSession::new(
        MockGatewayClient::new()
            .with_refresh_response(refresh_response(&valid_id_token()))
            .with_refresh_delay(REFRESH_DELAY),
    );
    session
        .seed(CredentialSlot::IdToken, &expired_id_token())
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    // Act
    let first = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.get_access_token().await }
    });
    let second = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.get_access_token().await }
    });
    let (first, second) = (first.await??, second.await??);

    // Assert
    assert_eq!(session.gateway.refresh_calls(), 1);
    assert_eq!(first.expose_secret(), TEST_REFRESHED_ACCESS_TOKEN);
    assert_eq!(second.expose_secret(), TEST_REFRESHED_ACCESS_TOKEN);

    Ok(())
}

/// Many concurrent `init_auth` calls coalesce the same way; exactly one of
/// them reports having refreshed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_init_auth_reports_single_refresh() -> Result<(), anyhow::Error> {
    let session = TestSession::new(
        MockGatewayClient::new()
            .with_refresh_response(refresh_response(&valid_id_token()))
            .with_refresh_delay(REFRESH_DELAY),
    );
    session
        .seed(CredentialSlot::IdToken, &expired_id_token())
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = session.controller.clone();
            tokio::spawn(async move { controller.init_auth().await })
        })
        .collect();

    let mut refreshed = 0;
    for handle in handles {
        if handle.await??.token_refreshed {
            refreshed += 1;
        }
    }

    assert_eq!(refreshed, 1);
    assert_eq!(session.gateway.refresh_calls(), 1);

    Ok(())
}

/// When the single exchange fails, queued callers do not retry it with the
/// evicted token.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_callers_share_failed_refresh() -> Result<(), anyhow::Error> {
    let session = TestSession::new(
        MockGatewayClient::redirecting()
            .with_refresh_failure(GatewayFailure::Rejected { status: 401 })
            .with_refresh_delay(REFRESH_DELAY),
    );
    session
        .seed(CredentialSlot::IdToken, &expired_id_token())
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    let first = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.get_access_token().await }
    });
    let second = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.get_access_token().await }
    });

    for result in [first.await?, second.await?] {
        assert!(matches!(result, Err(SessionError::MissingCredential(_))));
    }
    assert_eq!(session.gateway.refresh_calls(), 1);
    assert_eq!(session.stored(CredentialSlot::RefreshToken), None);

    Ok(())
}

/// `state()` reports an in-flight exchange.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_is_refreshing_during_exchange() -> Result<(), anyhow::Error> {
    let session = TestSession::new(
        MockGatewayClient::new()
            .with_refresh_response(refresh_response(&valid_id_token()))
            .with_refresh_delay(REFRESH_DELAY),
    );
    session
        .seed(CredentialSlot::IdToken, &expired_id_token())
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    let in_flight = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.init_auth().await }
    });

    tokio::time::sleep(REFRESH_DELAY / 4).await;
    assert_eq!(session.controller.state()?, SessionState::Refreshing);

    in_flight.await??;
    assert_eq!(session.controller.state()?, SessionState::Authenticated);

    Ok(())
}

/// A caller queued behind a failed exchange finds the refresh token evicted
/// and starts the bootstrap instead of failing.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_init_auth_behind_failed_refresh_starts_bootstrap() -> Result<(), anyhow::Error> {
    // Arrange
    let session = TestSession::new(
        MockGatewayClient::redirecting()
            .with_refresh_failure(GatewayFailure::Rejected { status: 401 })
            .with_refresh_delay(REFRESH_DELAY),
    );
    session
        .seed(CredentialSlot::IdToken, &expired_id_token())
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    // Act
    let first = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.init_auth().await }
    });
    let second = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.init_auth().await }
    });
    let results = [first.await?, second.await?];

    // Assert
    let failed = results
        .iter()
        .filter(|result| matches!(result, Err(SessionError::Gateway(_))))
        .count();
    let redirected: Vec<_> = results
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .collect();

    assert_eq!(failed, 1, "exactly one caller sees the refresh failure");
    assert_eq!(redirected.len(), 1, "the other caller starts the bootstrap");
    assert_eq!(redirected[0].session_id.as_deref(), Some(TEST_SESSION_ID));
    assert_eq!(redirected[0].request_uri.as_deref(), Some(TEST_REQUEST_URI));
    assert_eq!(session.gateway.refresh_calls(), 1);
    assert_eq!(session.gateway.auth_calls(), 1);

    Ok(())
}

/// Same race through `confirm_jwt_authentication`: the queued caller
/// redirects to the identity provider.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_confirm_behind_failed_refresh_redirects() -> Result<(), anyhow::Error> {
    let session = TestSession::new(
        MockGatewayClient::redirecting()
            .with_refresh_failure(GatewayFailure::Rejected { status: 401 })
            .with_refresh_delay(REFRESH_DELAY),
    );
    session
        .seed(CredentialSlot::IdToken, &expired_id_token())
        .seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);

    let first = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.confirm_jwt_authentication().await }
    });
    let second = tokio::spawn({
        let controller = session.controller.clone();
        async move { controller.confirm_jwt_authentication().await }
    });
    let results = [first.await?, second.await?];

    assert!(results.iter().any(|result| matches!(result, Ok(false))));
    assert!(!results
        .iter()
        .any(|result| matches!(result, Err(SessionError::MissingCredential(_)))));
    assert_eq!(session.navigator.redirects(), vec![TEST_REQUEST_URI.to_string()]);
    assert_eq!(
        session.stored(CredentialSlot::SessionId).as_deref(),
        Some(TEST_SESSION_ID)
    );
    assert_eq!(session.gateway.refresh_calls(), 1);

    Ok(())
}
