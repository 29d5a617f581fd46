//! Controller wired to in-process doubles.
//!
//! # Example
//! ```rust,ignore
//! let session = TestSession::new(MockGatewayClient::redirecting());
//! session.seed(CredentialSlot::RefreshToken, TEST_REFRESH_TOKEN);
//!
//! let authenticated = session.controller.confirm_jwt_authentication().await?;
//! assert_eq!(session.navigator.redirects(), vec![TEST_REQUEST_URI]);
//! ```

use crate::mock_gateway::MockGatewayClient;
use crate::navigator::RecordingNavigator;
use crate::test_ids::test_config;
use session_core::credentials::InMemoryCredentialStore;
use session_core::{CredentialSlot, CredentialStore, SessionController};
use std::sync::Arc;

/// A [`SessionController`] plus handles on each of its collaborators.
pub struct TestSession {
    pub controller: Arc<SessionController>,
    pub store: Arc<InMemoryCredentialStore>,
    pub gateway: Arc<MockGatewayClient>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestSession {
    /// Empty store, the given gateway double, [`test_config`].
    pub fn new(gateway: MockGatewayClient) -> Self {
        let store = Arc::new(InMemoryCredentialStore::new());
        let gateway = Arc::new(gateway);
        let navigator = Arc::new(RecordingNavigator::new());
        let controller = Arc::new(SessionController::new(
            test_config(),
            store.clone(),
            gateway.clone(),
            navigator.clone(),
        ));
        Self {
            controller,
            store,
            gateway,
            navigator,
        }
    }

    /// Write one slot directly into the store.
    pub fn seed(&self, slot: CredentialSlot, value: &str) -> &Self {
        self.store.set(slot, value).unwrap();
        self
    }

    /// Read one slot directly from the store.
    pub fn stored(&self, slot: CredentialSlot) -> Option<String> {
        self.store.get(slot).unwrap()
    }

    /// Snapshot of every slot, in [`CredentialSlot::ALL`] order.
    pub fn snapshot(&self) -> Vec<Option<String>> {
        CredentialSlot::ALL
            .iter()
            .map(|slot| self.stored(*slot))
            .collect()
    }
}
