//! Test server harness for E2E testing.
//!
//! Provides `TestGuardServer` for spawning real Token Guard instances that
//! validate tokens against a [`crate::MockIssuer`].

use crate::mock_jwks::local_validator;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use token_guard::auth::{FetcherOptions, TokenValidator};
use token_guard::middleware::AuthState;
use token_guard::routes::{self, AppState};
use token_guard::ValidationConfig;
use tokio::task::JoinHandle;

/// Test harness for spawning Token Guard in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_me_flow_e2e() -> Result<()> {
///     let issuer = MockIssuer::start().await;
///     let server = TestGuardServer::spawn(&issuer.domain(), TEST_AUDIENCE).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGuardServer {
    addr: SocketAddr,
    validator: Arc<TokenValidator>,
    _handle: JoinHandle<()>,
}

impl TestGuardServer {
    /// Spawn a server validating tokens for `domain` and `audience`.
    ///
    /// Keys are fetched over plain HTTP so a local mock issuer can serve them.
    pub async fn spawn(domain: &str, audience: &str) -> Result<Self, anyhow::Error> {
        let validator = Arc::new(local_validator(FetcherOptions {
            http_timeout: Duration::from_secs(5),
            ..FetcherOptions::default()
        }));

        // Not installed globally; many servers share one test process
        let metrics = PrometheusBuilder::new().build_recorder().handle();

        let state = AppState {
            auth: AuthState {
                validator: Arc::clone(&validator),
                config: Arc::new(ValidationConfig::new(domain, audience)),
            },
            metrics,
        };

        let app = routes::build_routes(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            validator,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The validator serving requests, for inspecting its key store.
    pub fn validator(&self) -> &Arc<TokenValidator> {
        &self.validator
    }
}

impl Drop for TestGuardServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
