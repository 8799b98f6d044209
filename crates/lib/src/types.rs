use crate::{
    errors::{ErrorKind, PromptError},
    providers::{ai::AiProvider, db::storage::Storage},
    schema::ColumnNaming,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One result record: column name to JSON-safe scalar, in column order.
pub type Row = Map<String, Value>;

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SamplingParams {
    /// Near-deterministic settings used for SQL generation.
    pub const GENERATION: SamplingParams = SamplingParams {
        temperature: 0.1,
        max_tokens: 500,
    };

    /// Looser settings used for the result summary.
    pub const EXPLANATION: SamplingParams = SamplingParams {
        temperature: 0.3,
        max_tokens: 150,
    };
}

/// A reusable configuration for an LLM provider instance.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    /// The type of provider ("groq", "openai", "local" or "gemini").
    #[serde(default = "default_provider")]
    pub provider: String,
    /// The API URL. Derived from the provider type when absent.
    #[serde(default)]
    pub api_url: Option<String>,
    /// The API key; only local providers may leave it empty.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Per-request timeout for the completion call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_model_name() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_url: None,
            api_key: None,
            model_name: default_model_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// The materialized output of one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }
}

/// A successful answer to a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub question: String,
    pub sql: String,
    #[serde(rename = "results")]
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub explanation: String,
}

/// A failed answer. Serializes with the empty defaults clients expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    pub question: String,
    pub error: String,
    pub kind: ErrorKind,
    /// Always `null` on the wire; kept for shape compatibility with answers.
    pub sql: Option<String>,
    pub results: Vec<Row>,
    pub row_count: usize,
}

/// The outcome of `PromptClient::ask`.
#[derive(Debug)]
pub enum PipelineResult {
    Success(QueryAnswer),
    Failure {
        failure: QueryFailure,
        source: PromptError,
    },
}

impl PipelineResult {
    pub(crate) fn failed(question: &str, source: PromptError) -> Self {
        PipelineResult::Failure {
            failure: QueryFailure {
                question: question.to_string(),
                error: source.to_string(),
                kind: source.kind(),
                sql: None,
                results: Vec::new(),
                row_count: 0,
            },
            source,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success(_))
    }

    /// Converts the outcome into a `Result`, keeping the typed error.
    pub fn into_result(self) -> Result<QueryAnswer, PromptError> {
        match self {
            PipelineResult::Success(answer) => Ok(answer),
            PipelineResult::Failure { source, .. } => Err(source),
        }
    }
}

impl Serialize for PipelineResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PipelineResult::Success(answer) => answer.serialize(serializer),
            PipelineResult::Failure { failure, .. } => failure.serialize(serializer),
        }
    }
}

/// The client that turns questions into answers.
///
/// It owns one AI provider and one storage provider, both constructed once at
/// startup and shared by every request.
pub struct PromptClient {
    pub ai_provider: Box<dyn AiProvider>,
    pub storage_provider: Box<dyn Storage>,
    pub(crate) column_naming: ColumnNaming,
    pub(crate) enforce_read_only: bool,
    pub(crate) generation_params: SamplingParams,
    pub(crate) explanation_params: SamplingParams,
}

impl fmt::Debug for PromptClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptClient")
            .field("ai_provider", &self.ai_provider)
            .field("storage_provider", &self.storage_provider.name())
            .field("column_naming", &self.column_naming)
            .field("enforce_read_only", &self.enforce_read_only)
            .finish_non_exhaustive()
    }
}

/// A builder for creating `PromptClient` instances.
pub struct PromptClientBuilder {
    ai_provider: Option<Box<dyn AiProvider>>,
    storage_provider: Option<Box<dyn Storage>>,
    column_naming: ColumnNaming,
    enforce_read_only: bool,
    generation_params: SamplingParams,
    explanation_params: SamplingParams,
}

impl Default for PromptClientBuilder {
    fn default() -> Self {
        Self {
            ai_provider: None,
            storage_provider: None,
            column_naming: ColumnNaming::default(),
            enforce_read_only: true,
            generation_params: SamplingParams::GENERATION,
            explanation_params: SamplingParams::EXPLANATION,
        }
    }
}

impl PromptClientBuilder {
    /// Creates a new `PromptClientBuilder`.
    ///
    /// # Examples
    ///
    /// ```
    /// use askdb::PromptClientBuilder;
    ///
    /// let builder = PromptClientBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the AI provider used for SQL generation and explanations.
    pub fn ai_provider(mut self, ai_provider: Box<dyn AiProvider>) -> Self {
        self.ai_provider = Some(ai_provider);
        self
    }

    /// Sets the storage provider the generated SQL runs against.
    pub fn storage_provider(mut self, storage_provider: Box<dyn Storage>) -> Self {
        self.storage_provider = Some(storage_provider);
        self
    }

    /// Selects which column naming convention the schema prompt describes.
    pub fn column_naming(mut self, column_naming: ColumnNaming) -> Self {
        self.column_naming = column_naming;
        self
    }

    /// Toggles the read-only guard that runs before execution.
    pub fn enforce_read_only(mut self, enforce: bool) -> Self {
        self.enforce_read_only = enforce;
        self
    }

    pub fn generation_params(mut self, params: SamplingParams) -> Self {
        self.generation_params = params;
        self
    }

    pub fn explanation_params(mut self, params: SamplingParams) -> Self {
        self.explanation_params = params;
        self
    }

    /// Builds the `PromptClient`.
    ///
    /// Fails with `PromptError::MissingConfiguration` when either provider
    /// has not been set.
    pub fn build(self) -> Result<PromptClient, PromptError> {
        let ai_provider = self.ai_provider.ok_or_else(|| {
            PromptError::MissingConfiguration("an AI provider is required".to_string())
        })?;
        let storage_provider = self.storage_provider.ok_or_else(|| {
            PromptError::MissingConfiguration("a storage provider is required".to_string())
        })?;

        Ok(PromptClient {
            ai_provider,
            storage_provider,
            column_naming: self.column_naming,
            enforce_read_only: self.enforce_read_only,
            generation_params: self.generation_params,
            explanation_params: self.explanation_params,
        })
    }
}
