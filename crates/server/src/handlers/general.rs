//! # General Route Handlers
//!
//! Root, health check and sample question endpoints. None of them touch the
//! database or the LLM; health reports configuration presence only.

use super::AppState;
use crate::types::{HealthResponse, RootResponse, SampleQueriesResponse};
use askdb::prompts::SAMPLE_QUESTIONS;
use axum::{extract::State, Json};

pub const SERVICE_NAME: &str = "Invoice Query Service";

fn configured(present: bool) -> String {
    let label = if present { "configured" } else { "not configured" };
    label.to_string()
}

/// The handler for the root (`/`) endpoint.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        service: SERVICE_NAME.to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        database: configured(app_state.config.has_database()),
        llm: configured(app_state.config.has_llm_credentials()),
    })
}

/// Returns the fixed list of example questions.
pub async fn sample_queries_handler() -> Json<SampleQueriesResponse> {
    Json(SampleQueriesResponse {
        queries: SAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect(),
    })
}
