//! Test server harness for E2E testing
//!
//! Provides `TestIdpServer` for spawning real IdP server instances in tests.

use idp_service::config::Config;
use idp_service::handlers::auth_handler::AppState;
use idp_service::observability::metrics::{init_metrics_recorder, TOKEN_PATH};
use idp_service::routes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the IdP server in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_token_flow_e2e() -> Result<()> {
///     let config = TestConfigBuilder::new().with_client("c1", "s1", &[]).build()?;
///     let server = TestIdpServer::spawn(config).await?;
///
///     let response = server.request_token("c1", "s1").await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestIdpServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    config: Config,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestIdpServer {
    /// Run the service startup sequence and serve it on a random port
    ///
    /// The server will:
    /// - Build the signer and authenticator with `idp_service::initialize`
    /// - Bind to a random available port (127.0.0.1:0), only if startup succeeded
    /// - Start the HTTP server in the background
    ///
    /// `bind_port` in `config` is ignored.
    pub async fn spawn(config: Config) -> Result<Self, anyhow::Error> {
        let state = idp_service::initialize(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize IdP: {}", e))?;

        // The global recorder can only be installed once per process; later
        // servers in the same test binary get a detached one.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        let app = routes::build_routes(Arc::clone(&state), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            config,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the token endpoint URL
    pub fn token_url(&self) -> String {
        format!("{}{}", self.url(), TOKEN_PATH)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the state the router serves (signer, authenticator, issuer)
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// POST a form-encoded token request
    pub async fn request_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let response = self
            .client
            .post(self.token_url())
            .form(&[("client_id", client_id), ("client_secret", client_secret)])
            .send()
            .await?;
        Ok(response)
    }

    /// Shared HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for TestIdpServer {
    fn drop(&mut self) {
        self.state.authenticator.cancel();
        self._handle.abort();
    }
}
