//! # Provider Factory
//!
//! Builds the AI and storage providers from configuration so that every
//! consumer (the server, tests) wires the pipeline the same way.

use crate::{
    errors::PromptError,
    providers::{
        ai::{AiProvider, ChatCompletionProvider, GeminiProvider},
        db::{postgres::PostgresProvider, sqlite::SqliteProvider, storage::Storage},
    },
    types::ProviderConfig,
};
use std::time::Duration;
use tracing::info;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

fn required_key(config: &ProviderConfig) -> Result<String, PromptError> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            PromptError::MissingConfiguration(format!(
                "an API key is required for the '{}' provider",
                config.provider
            ))
        })
}

/// Creates an AI provider from a `ProviderConfig`.
///
/// `groq`, `openai` and `local` all speak the chat-completions protocol;
/// `gemini` uses Google's `generateContent` API. Hosted providers require an
/// API key, the local provider requires an explicit `api_url`.
pub fn create_ai_provider(config: &ProviderConfig) -> Result<Box<dyn AiProvider>, PromptError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let model = Some(config.model_name.clone());

    let provider: Box<dyn AiProvider> = match config.provider.to_lowercase().as_str() {
        "groq" | "openai" => {
            let default_url = if config.provider.eq_ignore_ascii_case("groq") {
                GROQ_API_URL
            } else {
                OPENAI_API_URL
            };
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| default_url.to_string());
            let api_key = required_key(config)?;
            info!(provider = %config.provider, url = %api_url, model = %config.model_name, "Configuring chat completion provider");
            Box::new(ChatCompletionProvider::new(
                api_url,
                Some(api_key),
                model,
                timeout,
            )?)
        }
        "local" => {
            let api_url = config.api_url.clone().ok_or_else(|| {
                PromptError::MissingConfiguration(
                    "api_url must be set for the 'local' provider".to_string(),
                )
            })?;
            info!(url = %api_url, model = %config.model_name, "Configuring local chat completion provider");
            Box::new(ChatCompletionProvider::new(
                api_url,
                config.api_key.clone().filter(|k| !k.trim().is_empty()),
                model,
                timeout,
            )?)
        }
        "gemini" => {
            let api_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| GeminiProvider::endpoint_for(&config.model_name));
            let api_key = required_key(config)?;
            info!(url = %api_url, "Configuring Gemini provider");
            Box::new(GeminiProvider::new(api_url, api_key, timeout)?)
        }
        other => {
            return Err(PromptError::MissingConfiguration(format!(
                "unsupported AI provider: '{other}'"
            )))
        }
    };

    Ok(provider)
}

/// The storage backend selected by a database URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Postgres(String),
    Sqlite(String),
}

impl StorageTarget {
    /// Classifies a database URL without connecting to it.
    pub fn parse(database_url: &str) -> Result<Self, PromptError> {
        let url = database_url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(StorageTarget::Postgres(url.to_string()));
        }
        if let Some(path) = url.strip_prefix("sqlite://") {
            return Ok(StorageTarget::Sqlite(path.to_string()));
        }
        if url == ":memory:" || url.ends_with(".db") {
            return Ok(StorageTarget::Sqlite(url.to_string()));
        }
        Err(PromptError::MissingConfiguration(
            "DATABASE_URL must be a postgres:// or sqlite:// URL".to_string(),
        ))
    }
}

/// Creates the storage provider for a database URL.
///
/// PostgreSQL pools connect lazily, so construction never touches the
/// network; SQLite databases are opened immediately.
pub async fn create_storage_provider(
    database_url: &str,
    max_connections: u32,
) -> Result<Box<dyn Storage>, PromptError> {
    match StorageTarget::parse(database_url)? {
        StorageTarget::Postgres(url) => {
            info!(max_connections, "Configuring PostgreSQL connection pool");
            Ok(Box::new(PostgresProvider::connect_lazy(
                &url,
                max_connections,
            )?))
        }
        StorageTarget::Sqlite(path) => {
            info!(path = %path, "Opening SQLite database");
            Ok(Box::new(SqliteProvider::new(&path).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_database_urls() {
        assert_eq!(
            StorageTarget::parse("postgresql://u:p@localhost:5432/db").unwrap(),
            StorageTarget::Postgres("postgresql://u:p@localhost:5432/db".to_string())
        );
        assert_eq!(
            StorageTarget::parse("sqlite://data/invoices.db").unwrap(),
            StorageTarget::Sqlite("data/invoices.db".to_string())
        );
        assert_eq!(
            StorageTarget::parse(":memory:").unwrap(),
            StorageTarget::Sqlite(":memory:".to_string())
        );
        assert!(StorageTarget::parse("mysql://localhost/db").is_err());
    }

    #[test]
    fn hosted_providers_need_a_key() {
        let config = ProviderConfig::default();
        let err = create_ai_provider(&config).unwrap_err();
        assert!(matches!(err, PromptError::MissingConfiguration(_)));

        let config = ProviderConfig {
            provider: "gemini".to_string(),
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(create_ai_provider(&config).is_err());
    }

    #[test]
    fn local_provider_needs_a_url_but_no_key() {
        let config = ProviderConfig {
            provider: "local".to_string(),
            ..Default::default()
        };
        assert!(create_ai_provider(&config).is_err());

        let config = ProviderConfig {
            provider: "local".to_string(),
            api_url: Some("http://localhost:1234/v1/chat/completions".to_string()),
            ..Default::default()
        };
        assert!(create_ai_provider(&config).is_ok());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = ProviderConfig {
            provider: "anthropic-ish".to_string(),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let err = create_ai_provider(&config).unwrap_err();
        assert!(err.to_string().contains("unsupported AI provider"));
    }

    #[tokio::test]
    async fn postgres_storage_is_created_without_connecting() {
        let storage = create_storage_provider("postgres://nobody@127.0.0.1:1/none", 2)
            .await
            .unwrap();
        assert_eq!(storage.dialect(), "PostgreSQL");
    }
}
