//! # Injected Provider Tests
//!
//! Drives the router with a scripted AI provider and a storage provider that
//! records every executed statement, so the tests can assert exactly what
//! reached the database.

mod common;

use anyhow::Result;
use askdb::{
    providers::db::sqlite::SqliteProvider, ColumnNaming, PromptClientBuilder, ProviderConfig,
};
use askdb_server::{config::AppConfig, state::AppState, types::QueryResponse};
use askdb_test_utils::{seed_invoice_db, MockAiProvider, RecordingStorage};
use common::TestApp;
use serde_json::{json, Value};
use std::sync::Arc;

const GENERATION_KEY: &str = "Return ONLY the SQL query";
const EXPLANATION_KEY: &str = "summarizes database query results";

fn test_config() -> AppConfig {
    AppConfig {
        port: 0,
        database_url: ":memory:".to_string(),
        max_connections: 1,
        column_naming: ColumnNaming::QuotedCamelCase,
        expose_error_details: true,
        enforce_read_only: true,
        llm: ProviderConfig {
            provider: "local".to_string(),
            ..Default::default()
        },
    }
}

async fn spawn(
    ai: &MockAiProvider,
    storage: &RecordingStorage<SqliteProvider>,
) -> Result<TestApp> {
    let client = PromptClientBuilder::new()
        .ai_provider(Box::new(ai.clone()))
        .storage_provider(Box::new(storage.clone()))
        .build()?;
    TestApp::spawn_with_state(AppState {
        config: Arc::new(test_config()),
        client: Arc::new(client),
    })
    .await
}

#[tokio::test]
async fn test_query_executes_generated_sql_once() -> Result<()> {
    let storage = RecordingStorage::new(seed_invoice_db(6).await?);
    let ai = MockAiProvider::new();
    ai.add_response(
        GENERATION_KEY,
        r#"SELECT COUNT(*) AS paid FROM invoices WHERE "status" = 'PAID'"#,
    );
    ai.add_response(EXPLANATION_KEY, "Two invoices have been paid.");
    let app = spawn(&ai, &storage).await?;

    let body: QueryResponse = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "How many invoices are paid?"}))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body.results[0]["paid"], json!(2));
    assert_eq!(body.explanation, "Two invoices have been paid.");
    assert_eq!(
        storage.executed(),
        vec![r#"SELECT COUNT(*) AS paid FROM invoices WHERE "status" = 'PAID'"#.to_string()]
    );

    let calls = ai.get_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].user_prompt.contains("How many invoices are paid?"));
    assert!(calls[0].params.temperature < calls[1].params.temperature);
    assert!(calls[1].user_prompt.contains("Results: 1 rows returned"));
    Ok(())
}

#[tokio::test]
async fn test_generate_sql_never_touches_storage() -> Result<()> {
    let storage = RecordingStorage::new(seed_invoice_db(1).await?);
    let ai = MockAiProvider::new();
    ai.add_response(GENERATION_KEY, "```sql\nSELECT \"id\" FROM invoices\n```");
    let app = spawn(&ai, &storage).await?;

    let body: Value = app
        .client
        .post(app.url("/api/generate-sql"))
        .json(&json!({"query": "List invoice ids"}))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["sql"], json!(r#"SELECT "id" FROM invoices"#));
    assert_eq!(storage.execution_count(), 0);
    assert_eq!(ai.get_calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rejected_sql_never_reaches_storage() -> Result<()> {
    let storage = RecordingStorage::new(seed_invoice_db(1).await?);
    let ai = MockAiProvider::new();
    ai.add_response(GENERATION_KEY, "UPDATE invoices SET \"status\" = 'PAID'");
    let app = spawn(&ai, &storage).await?;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "Mark everything as paid"}))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(storage.execution_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_provider_failure_skips_execution() -> Result<()> {
    let storage = RecordingStorage::new(seed_invoice_db(1).await?);
    let ai = MockAiProvider::new();
    ai.add_failure(GENERATION_KEY, "rate limited");
    let app = spawn(&ai, &storage).await?;

    let response = app
        .client
        .post(app.url("/api/query"))
        .json(&json!({"query": "How many invoices?"}))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await?;
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("rate limited"));
    assert_eq!(storage.execution_count(), 0);
    Ok(())
}
