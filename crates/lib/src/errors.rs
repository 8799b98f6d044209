use thiserror::Error;

/// Custom error types for the question-to-answer pipeline.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Request to AI provider failed: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("AI provider returned no usable SQL for question: {0}")]
    EmptyQuery(String),
    #[error("Generated SQL was rejected: {0}")]
    SqlRejected(String),
    #[error("Storage provider connection error: {0}")]
    StorageConnection(String),
    #[error("Storage query execution failed: {0}")]
    StorageQueryFailed(String),
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),
    #[error("Failed to serialize result: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

/// The pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required credential or connection string is missing or unusable.
    Configuration,
    /// The LLM call failed or produced unusable text.
    Generation,
    /// The generated statement fell outside the read-only envelope.
    Validation,
    /// The database rejected or failed the statement.
    Execution,
}

impl PromptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PromptError::MissingConfiguration(_) | PromptError::ReqwestClientBuild(_) => {
                ErrorKind::Configuration
            }
            PromptError::AiRequest(_)
            | PromptError::AiDeserialization(_)
            | PromptError::AiApi(_)
            | PromptError::EmptyQuery(_) => ErrorKind::Generation,
            PromptError::SqlRejected(_) => ErrorKind::Validation,
            PromptError::StorageConnection(_)
            | PromptError::StorageQueryFailed(_)
            | PromptError::JsonSerialization(_) => ErrorKind::Execution,
        }
    }

    /// True when the underlying HTTP call to the AI provider timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PromptError::AiRequest(e) if e.is_timeout())
    }
}
