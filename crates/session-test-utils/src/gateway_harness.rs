//! Wiremock-backed gateway for end-to-end tests over real HTTP.
//!
//! # Example
//! ```rust,ignore
//! let gateway = TestGateway::start().await;
//! gateway.mount_refresh(&valid_id_token(), TEST_REFRESHED_ACCESS_TOKEN).await;
//!
//! let controller = SessionController::with_http_gateway(gateway.config(), store, navigator)?;
//! ```

use crate::test_ids::{test_config_for, TEST_API_KEY, TEST_PROJECT_ID};
use serde_json::{json, Value};
use session_core::gateway::{API_KEY_HEADER, AUTH_PATH, REFRESH_PATH};
use session_core::SessionConfig;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock identity gateway.
pub struct TestGateway {
    server: MockServer,
}

impl TestGateway {
    /// Start a server on a random local port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Session configuration pointing at this server.
    pub fn config(&self) -> SessionConfig {
        test_config_for(&self.server.uri())
    }

    /// `POST /auth` answers with a redirect body.
    pub async fn mount_auth_redirect(&self, session_id: &str, request_uri: &str) {
        self.mount_json(
            AUTH_PATH,
            200,
            json!({ "sessionId": session_id, "requestUri": request_uri }),
        )
        .await;
    }

    /// `POST /refreshToken` answers with an identity and access token.
    pub async fn mount_refresh(&self, id_token: &str, access_token: &str) {
        self.mount_json(
            REFRESH_PATH,
            200,
            json!({ "idToken": id_token, "accessToken": access_token }),
        )
        .await;
    }

    /// `path` answers with `status` and an error body.
    pub async fn mount_failure(&self, path_str: &str, status: u16) {
        self.mount_json(path_str, status, json!({ "error": "test failure" }))
            .await;
    }

    /// Mount a JSON response for `POST {path}` requiring the test API key.
    pub async fn mount_json(&self, path_str: &str, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path(path_str))
            .and(header(API_KEY_HEADER, TEST_API_KEY))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Number of requests received on `path`.
    pub async fn request_count(&self, path_str: &str) -> usize {
        self.received_bodies(path_str).await.len()
    }

    /// JSON bodies received on `path`, in arrival order.
    pub async fn received_bodies(&self, path_str: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == path_str)
            .map(|request| request.body_json::<Value>().unwrap_or(Value::Null))
            .collect()
    }

    /// Whether every received body carried the test project id.
    pub async fn all_requests_carry_project(&self) -> bool {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .all(|request| {
                request
                    .body_json::<Value>()
                    .ok()
                    .and_then(|body| body.get("projectId").cloned())
                    == Some(json!(TEST_PROJECT_ID))
            })
    }
}
