//! # Application State
//!
//! The shared application state (`AppState`) and the logic for building it at
//! startup. Both external clients are constructed exactly once here and
//! shared by every request handler.

use crate::config::AppConfig;
use askdb::{create_ai_provider, create_storage_provider, PromptClient, PromptClientBuilder};
use std::sync::Arc;
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<AppConfig>,
    /// The question-to-answer pipeline.
    pub client: Arc<PromptClient>,
}

/// Builds the shared application state from the configuration.
///
/// Creates the AI provider and the storage provider (a lazy connection pool
/// for PostgreSQL) and wires them into a `PromptClient`.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let ai_provider = create_ai_provider(&config.llm)?;
    let storage_provider =
        create_storage_provider(&config.database_url, config.max_connections).await?;

    info!(
        provider = %config.llm.provider,
        model = %config.llm.model_name,
        storage = storage_provider.name(),
        column_naming = ?config.column_naming,
        enforce_read_only = config.enforce_read_only,
        "Initialized query pipeline."
    );

    let client = PromptClientBuilder::new()
        .ai_provider(ai_provider)
        .storage_provider(storage_provider)
        .column_naming(config.column_naming)
        .enforce_read_only(config.enforce_read_only)
        .build()?;

    Ok(AppState {
        config: Arc::new(config),
        client: Arc::new(client),
    })
}
