//! # Query Handlers
//!
//! `/api/query` runs the full pipeline; `/api/generate-sql` only asks the
//! LLM for SQL and never touches the database.

use super::{AppError, AppState};
use crate::types::{GenerateSqlRequest, GenerateSqlResponse, QueryRequest, QueryResponse};
use askdb::PipelineResult;
use axum::{extract::State, Json};
use tracing::info;

pub const QUERY_FAILED_CONTEXT: &str = "Query processing failed";
pub const GENERATION_FAILED_CONTEXT: &str = "SQL generation failed";

/// Answers a natural-language question about the invoice data.
pub async fn query_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    info!("Received query: '{}'", payload.query);

    match app_state.client.ask(&payload.query).await {
        PipelineResult::Success(answer) => Ok(Json(QueryResponse {
            query: payload.query,
            sql: answer.sql,
            results: answer.rows,
            explanation: answer.explanation,
            conversation_id: payload.conversation_id,
            row_count: answer.row_count,
        })),
        PipelineResult::Failure { source, .. } => Err(AppError::prompt(
            QUERY_FAILED_CONTEXT,
            source,
            app_state.config.expose_error_details,
        )),
    }
}

/// Generates SQL for a question without executing it.
pub async fn generate_sql_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<GenerateSqlRequest>,
) -> Result<Json<GenerateSqlResponse>, AppError> {
    info!("Received SQL generation request: '{}'", payload.query);

    let sql = app_state
        .client
        .generate_sql(&payload.query)
        .await
        .map_err(|e| {
            AppError::prompt(
                GENERATION_FAILED_CONTEXT,
                e,
                app_state.config.expose_error_details,
            )
        })?;

    Ok(Json(GenerateSqlResponse {
        query: payload.query,
        sql,
    }))
}
