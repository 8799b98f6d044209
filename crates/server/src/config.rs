//! # Application Configuration
//!
//! This module defines the configuration structure for the `askdb-server` and
//! provides the logic for loading it from an optional YAML file and
//! environment variables.

use askdb::{ColumnNaming, ProviderConfig};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates that a required setting is absent. Holds the variable name.
    Missing(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::Missing(key) => {
                write!(f, "{key} environment variable is required but not set")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The database connection string. Loaded from `DATABASE_URL` env var.
    #[serde(default)]
    pub database_url: String,
    /// Upper bound on pooled PostgreSQL connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Which column naming convention the schema prompt describes.
    #[serde(default)]
    pub column_naming: ColumnNaming,
    /// When false, error responses carry a generic message instead of the
    /// underlying provider or database error.
    #[serde(default = "default_true")]
    pub expose_error_details: bool,
    /// Validates generated SQL as a single read-only query before execution.
    #[serde(default = "default_true")]
    pub enforce_read_only: bool,
    /// The LLM provider used for generation and explanations.
    #[serde(default)]
    pub llm: ProviderConfig,
}

fn default_port() -> u16 {
    8000
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// True when a database connection string is present.
    pub fn has_database(&self) -> bool {
        !self.database_url.trim().is_empty()
    }

    /// True when the LLM provider has a key, or needs none.
    pub fn has_llm_credentials(&self) -> bool {
        self.llm.provider.eq_ignore_ascii_case("local")
            || self
                .llm
                .api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty())
    }
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Picks the YAML file to load, if any.
///
/// An explicit path wins. Otherwise `config.yml` next to the crate manifest
/// is used when present, then the `config.{LLM_PROVIDER}.yml` template.
fn resolve_config_path(config_path_override: Option<&str>) -> Option<String> {
    if let Some(override_path) = config_path_override {
        return Some(override_path.to_string());
    }

    let base_path = env!("CARGO_MANIFEST_DIR");
    let user_config_path = format!("{base_path}/config.yml");
    if std::path::Path::new(&user_config_path).exists() {
        info!("Loading user-defined configuration from '{user_config_path}'.");
        return Some(user_config_path);
    }

    let provider = env::var("LLM_PROVIDER").unwrap_or_else(|_| "groq".to_string());
    let template_path = format!("{base_path}/config.{provider}.yml");
    if std::path::Path::new(&template_path).exists() {
        info!("'{user_config_path}' not found. Using template '{template_path}' for LLM_PROVIDER='{provider}'.");
        return Some(template_path);
    }

    info!("No configuration file found; using environment variables only.");
    None
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Loads the application configuration from a file and environment variables.
///
/// - Top-level keys like `port` and `database_url` are overridden by `PORT`
///   and `DATABASE_URL`.
/// - Nested keys are overridden by `ASKDB_...` variables (e.g.
///   `ASKDB_LLM__MODEL_NAME`).
/// - A missing LLM key falls back to `GROQ_API_KEY`, then `LLM_API_KEY`.
///
/// Fails with `ConfigError::Missing` when the database URL or the LLM key
/// cannot be found.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let default_provider = non_empty_env("LLM_PROVIDER").unwrap_or_else(|| "groq".to_string());
    let mut builder = ConfigBuilder::builder().set_default("llm.provider", default_provider)?;

    if let Some(path) = resolve_config_path(config_path_override) {
        let content = read_and_substitute(&path)?.ok_or_else(|| {
            ConfigError::General(format!("Config file not found at '{path}'."))
        })?;
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        // Top-level keys such as PORT and DATABASE_URL.
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("ASKDB")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    // Unset `${VAR}` placeholders substitute to empty strings.
    config.llm.api_url = config.llm.api_url.filter(|u| !u.trim().is_empty());

    if config
        .llm
        .api_key
        .as_deref()
        .is_none_or(|k| k.trim().is_empty())
    {
        config.llm.api_key = non_empty_env("GROQ_API_KEY").or_else(|| non_empty_env("LLM_API_KEY"));
    }

    if !config.has_database() {
        return Err(ConfigError::Missing("DATABASE_URL".to_string()));
    }
    if !config.has_llm_credentials() {
        let key = if config.llm.provider.eq_ignore_ascii_case("groq") {
            "GROQ_API_KEY"
        } else {
            "LLM_API_KEY"
        };
        return Err(ConfigError::Missing(key.to_string()));
    }

    Ok(config)
}
