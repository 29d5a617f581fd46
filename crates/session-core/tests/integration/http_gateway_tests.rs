//! End-to-end tests over real HTTP
//!
//! The controller talks to a wiremock gateway through `HttpGatewayClient`
//! and persists into a `FileCredentialStore` in a temporary directory.

use session_core::credentials::FileCredentialStore;
use session_core::gateway::{AUTH_PATH, REFRESH_FAILED_CONTEXT, REFRESH_PATH};
use session_core::secret::ExposeSecret;
use session_core::{CredentialSlot, CredentialStore, SessionController, SessionError};
use session_test_utils::*;
use std::sync::Arc;
use tempfile::TempDir;

struct HttpSession {
    gateway: TestGateway,
    store: Arc<FileCredentialStore>,
    navigator: Arc<RecordingNavigator>,
    controller: SessionController,
    _dir: TempDir,
}

async fn http_session() -> Result<HttpSession, anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let gateway = TestGateway::start().await;
    let store = Arc::new(FileCredentialStore::new(dir.path().join("session.json")));
    let navigator = Arc::new(RecordingNavigator::new());
    let controller =
        SessionController::with_http_gateway(gateway.config(), store.clone(), navigator.clone())?;

    Ok(HttpSession {
        gateway,
        store,
        navigator,
        controller,
        _dir: dir,
    })
}

#[tokio::test]
async fn test_bootstrap_over_http_persists_session_id() -> Result<(), anyhow::Error> {
    let session = http_session().await?;
    session
        .gateway
        .mount_auth_redirect(TEST_SESSION_ID, TEST_REQUEST_URI)
        .await;

    let authenticated = session.controller.confirm_jwt_authentication().await?;

    assert!(!authenticated);
    assert_eq!(
        session.store.get(CredentialSlot::SessionId)?.as_deref(),
        Some(TEST_SESSION_ID)
    );
    assert_eq!(session.navigator.last_redirect().as_deref(), Some(TEST_REQUEST_URI));

    let bodies = session.gateway.received_bodies(AUTH_PATH).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["redirectUri"], TEST_REDIRECT_URI);
    assert!(session.gateway.all_requests_carry_project().await);

    Ok(())
}

#[tokio::test]
async fn test_refresh_over_http_updates_file_store() -> Result<(), anyhow::Error> {
    let session = http_session().await?;
    let new_id_token = valid_id_token();
    session
        .gateway
        .mount_refresh(&new_id_token, TEST_REFRESHED_ACCESS_TOKEN)
        .await;
    session.store.set(CredentialSlot::IdToken, &expired_id_token())?;
    session.store.set(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN)?;

    let result = session.controller.init_auth().await?;

    assert!(result.token_refreshed);

    // A fresh handle on the same file sees the new tokens.
    let reopened = FileCredentialStore::new(session.store.path());
    assert_eq!(reopened.get(CredentialSlot::IdToken)?, Some(new_id_token));
    assert_eq!(
        reopened.get(CredentialSlot::AccessToken)?.as_deref(),
        Some(TEST_REFRESHED_ACCESS_TOKEN)
    );

    let bodies = session.gateway.received_bodies(REFRESH_PATH).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["refreshToken"], TEST_REFRESH_TOKEN);
    assert_eq!(bodies[0]["projectId"], TEST_PROJECT_ID);

    let token = session.controller.get_access_token().await?;
    assert_eq!(token.expose_secret(), TEST_REFRESHED_ACCESS_TOKEN);
    assert_eq!(session.gateway.request_count(REFRESH_PATH).await, 1);

    Ok(())
}

#[tokio::test]
async fn test_http_401_on_refresh_evicts_refresh_token() -> Result<(), anyhow::Error> {
    let session = http_session().await?;
    session.gateway.mount_failure(REFRESH_PATH, 401).await;
    session.store.set(CredentialSlot::IdToken, &expired_id_token())?;
    session.store.set(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN)?;

    let err = session.controller.init_auth().await.unwrap_err();

    assert!(matches!(err, SessionError::Gateway(_)));
    assert!(err.to_string().contains(REFRESH_FAILED_CONTEXT));
    assert_eq!(session.store.get(CredentialSlot::RefreshToken)?, None);
    assert_eq!(
        FileCredentialStore::new(session.store.path()).get(CredentialSlot::RefreshToken)?,
        None,
        "eviction must reach the file"
    );

    Ok(())
}
