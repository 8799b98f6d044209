use askdb::{ErrorKind, PromptError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates the errors a handler can return, allowing them to
/// be converted into appropriate HTTP responses with a `{"error": ...}` body.
#[derive(Debug)]
pub enum AppError {
    /// A failed pipeline stage, reported as `"{context}: {detail}"`.
    Prompt {
        context: &'static str,
        source: PromptError,
        expose_details: bool,
    },
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl AppError {
    pub fn prompt(context: &'static str, source: PromptError, expose_details: bool) -> Self {
        AppError::Prompt {
            context,
            source,
            expose_details,
        }
    }
}

/// Conversion from `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Generation => StatusCode::BAD_GATEWAY,
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Execution => StatusCode::BAD_REQUEST,
    }
}

fn generic_detail(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Configuration => "the server is not configured correctly",
        ErrorKind::Generation => "the language model request failed",
        ErrorKind::Validation => "the generated SQL was not a permitted read-only query",
        ErrorKind::Execution => "the database could not run the generated query",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Prompt {
                context,
                source,
                expose_details,
            } => {
                error!("{context}: {source:?}");
                let kind = source.kind();
                let detail = if expose_details {
                    source.to_string()
                } else {
                    generic_detail(kind).to_string()
                };
                (status_for(kind), format!("{context}: {detail}"))
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
