//! # Common Test Utilities
//!
//! `TestApp` spawns the real server on a random port with an in-memory
//! SQLite invoice database and an LLM endpoint served by
//! `httpmock::MockServer`.

// Not every test binary uses every helper.
#![allow(unused)]

use anyhow::Result;
use askdb_server::{
    config,
    router,
    state::{build_app_state, AppState},
};
use axum::serve;
use httpmock::{Mock, MockServer};
use reqwest::Client;
use serde_json::json;
use std::{fs::File, io::Write, net::SocketAddr};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

/// Substring present only in SQL generation prompts.
pub const GENERATION_MARKER: &str = "Return ONLY the SQL query";
/// Substring present only in explanation prompts.
pub const EXPLANATION_MARKER: &str = "Provide a brief, natural language summary";

/// Knobs for the spawned server's configuration.
#[derive(Debug, Clone)]
pub struct TestOptions {
    pub invoices: usize,
    pub expose_error_details: bool,
    pub timeout_secs: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            invoices: 0,
            expose_error_details: true,
            timeout_secs: 5,
        }
    }
}

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    _config_dir: Option<TempDir>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

/// A chat completion body whose only answer is `content`.
pub fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

impl TestApp {
    /// Spawns the server with default options and no invoices.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(TestOptions::default()).await
    }

    /// Spawns the server, seeding `options.invoices` invoices.
    pub async fn spawn_with(options: TestOptions) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start_async().await;

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
database_url: ":memory:"
expose_error_details: {}
llm:
  provider: "local"
  api_url: "{}"
  model_name: "mock-chat-model"
  timeout_secs: {}
"#,
            options.expose_error_details,
            mock_server.url("/v1/chat/completions"),
            options.timeout_secs,
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let config = config::get_config(Some(config_path.to_str().unwrap_or_default()))?;
        let app_state = build_app_state(config).await?;
        askdb_test_utils::seed_storage(
            app_state.client.storage_provider.as_ref(),
            options.invoices,
        )
        .await?;

        Self::serve_state(app_state, mock_server, Some(config_dir)).await
    }

    /// Serves a prebuilt state, for tests that wire their own providers.
    pub async fn spawn_with_state(app_state: AppState) -> Result<Self> {
        let mock_server = MockServer::start_async().await;
        Self::serve_state(app_state, mock_server, None).await
    }

    async fn serve_state(
        app_state: AppState,
        mock_server: MockServer,
        config_dir: Option<TempDir>,
    ) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router_state = app_state.clone();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(router_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Answers SQL generation prompts with `sql`.
    pub async fn mock_generation(&self, sql: &str) -> Mock<'_> {
        let body = completion(sql);
        self.mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/v1/chat/completions")
                    .body_contains(GENERATION_MARKER);
                then.status(200).json_body(body);
            })
            .await
    }

    /// Answers explanation prompts with `text`.
    pub async fn mock_explanation(&self, text: &str) -> Mock<'_> {
        let body = completion(text);
        self.mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/v1/chat/completions")
                    .body_contains(EXPLANATION_MARKER);
                then.status(200).json_body(body);
            })
            .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
