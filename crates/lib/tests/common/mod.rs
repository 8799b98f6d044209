#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared mock providers and fixtures for the `askdb` integration tests.

use askdb::providers::ai::AiProvider;
use askdb::providers::db::{sqlite::SqliteProvider, storage::Storage};
use askdb::{PromptError, QueryResult, SamplingParams};
use async_trait::async_trait;
use dotenvy::dotenv;
use std::fmt::Debug;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Once, RwLock,
};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One scripted reply of the mock AI provider.
#[derive(Clone, Debug)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

/// A recorded call: system prompt, user prompt and sampling parameters.
pub type MockCall = (String, String, SamplingParams);

// --- Mock AI Provider ---

/// Replays scripted replies in order; falls back to a default text once the
/// script runs out.
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    pub call_history: Arc<RwLock<Vec<MockCall>>>,
    replies: Arc<RwLock<Vec<MockReply>>>,
}

impl MockAiProvider {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            replies: Arc::new(RwLock::new(replies.into_iter().rev().collect())),
        }
    }

    /// Shorthand for a provider that answers with the given texts.
    pub fn with_texts(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| MockReply::Text(t.to_string()))
                .collect(),
        )
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.call_history.read().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &SamplingParams,
    ) -> Result<String, PromptError> {
        self.call_history.write().unwrap().push((
            system_prompt.to_string(),
            user_prompt.to_string(),
            *params,
        ));

        match self.replies.write().unwrap().pop() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(PromptError::AiApi(message)),
            None => Ok("Default mock response".to_string()),
        }
    }
}

// --- Counting Storage Provider ---

/// Wraps another storage provider and counts executions.
///
/// `count` covers every execution; `read_only_count` only the ones that came
/// through `execute_read_only`.
#[derive(Clone, Debug)]
pub struct CountingStorage<S> {
    pub inner: S,
    pub executions: Arc<AtomicUsize>,
    pub read_only_executions: Arc<AtomicUsize>,
}

impl<S> CountingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            executions: Arc::new(AtomicUsize::new(0)),
            read_only_executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn read_only_count(&self) -> usize {
        self.read_only_executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: Storage + Clone + 'static> Storage for CountingStorage<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dialect(&self) -> &str {
        self.inner.dialect()
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult, PromptError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_query(sql).await
    }

    async fn execute_read_only(&self, sql: &str) -> Result<QueryResult, PromptError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.read_only_executions.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_read_only(sql).await
    }
}

// --- Fixtures ---

/// DDL for the three invoice tables, using the quoted camelCase columns.
pub const INVOICE_SCHEMA_SQL: &str = r#"
CREATE TABLE invoices ("id" TEXT PRIMARY KEY, "name" TEXT NOT NULL, "status" TEXT NOT NULL, "createdAt" TEXT);
CREATE TABLE extracted_data ("id" TEXT PRIMARY KEY, "invoiceId" TEXT NOT NULL, "vendorName" TEXT, "invoiceNumber" TEXT, "invoiceDate" TEXT, "totalAmount" REAL, "currency" TEXT);
CREATE TABLE line_items ("id" TEXT PRIMARY KEY, "invoiceId" TEXT NOT NULL, "description" TEXT, "quantity" REAL, "unitPrice" REAL, "amount" REAL)
"#;

/// Creates an in-memory invoice database holding `n` invoices, each with one
/// extracted_data row.
pub async fn seed_invoice_db(n: usize) -> SqliteProvider {
    let provider = SqliteProvider::new(":memory:")
        .await
        .expect("Failed to create SqliteProvider");
    provider
        .initialize_with_data(INVOICE_SCHEMA_SQL)
        .await
        .expect("Failed to create invoice tables");

    let mut inserts = String::new();
    for i in 0..n {
        let status = if i % 3 == 0 { "PAID" } else { "PENDING" };
        inserts.push_str(&format!(
            "INSERT INTO invoices (\"id\", \"name\", \"status\", \"createdAt\") VALUES ('inv-{i}', 'invoice-{i}.pdf', '{status}', '2025-10-01T10:00:00');\n\
             INSERT INTO extracted_data (\"id\", \"invoiceId\", \"vendorName\", \"invoiceNumber\", \"invoiceDate\", \"totalAmount\", \"currency\") VALUES ('ed-{i}', 'inv-{i}', 'Vendor {v}', 'N-{i}', '2025-10-01', {amount:.2}, 'USD');\n",
            v = i % 4,
            amount = 100.0 + i as f64,
        ));
    }
    if !inserts.is_empty() {
        provider
            .initialize_with_data(&inserts)
            .await
            .expect("Failed to seed invoices");
    }
    provider
}
