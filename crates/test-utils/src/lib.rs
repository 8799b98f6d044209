use anyhow::Result;
use askdb::errors::PromptError;
use askdb::providers::ai::AiProvider;
use askdb::providers::db::{sqlite::SqliteProvider, storage::Storage};
use askdb::types::{QueryResult, SamplingParams};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

// --- Invoice Fixtures ---

/// DDL for the invoice tables with the quoted camelCase column names.
pub const INVOICE_TABLES_SQL: &[&str] = &[
    r#"CREATE TABLE invoices ("id" TEXT PRIMARY KEY, "name" TEXT NOT NULL, "status" TEXT NOT NULL, "organizationId" TEXT NOT NULL, "createdAt" TEXT NOT NULL)"#,
    r#"CREATE TABLE extracted_data ("id" TEXT PRIMARY KEY, "invoiceId" TEXT NOT NULL, "vendorName" TEXT, "invoiceNumber" TEXT, "invoiceDate" TEXT, "dueDate" TEXT, "totalAmount" REAL, "currency" TEXT)"#,
    r#"CREATE TABLE line_items ("id" TEXT PRIMARY KEY, "invoiceId" TEXT NOT NULL, "description" TEXT, "quantity" REAL, "unitPrice" REAL, "amount" REAL)"#,
];

/// Insert statements for `n` invoices, each with one extracted_data row and
/// one line item. Every third invoice is `PAID`, the rest `PENDING`.
pub fn invoice_rows_sql(n: usize) -> Vec<String> {
    let mut statements = Vec::with_capacity(n * 3);
    for i in 0..n {
        let status = if i % 3 == 0 { "PAID" } else { "PENDING" };
        let amount = 100.0 + i as f64;
        statements.push(format!(
            r#"INSERT INTO invoices ("id", "name", "status", "organizationId", "createdAt") VALUES ('inv-{i}', 'invoice-{i}.pdf', '{status}', 'org-1', '2025-10-01T10:00:00')"#
        ));
        statements.push(format!(
            r#"INSERT INTO extracted_data ("id", "invoiceId", "vendorName", "invoiceNumber", "invoiceDate", "dueDate", "totalAmount", "currency") VALUES ('ed-{i}', 'inv-{i}', 'Vendor {v}', 'N-{i}', '2025-10-01', '2025-10-31', {amount:.2}, 'USD')"#,
            v = i % 4,
        ));
        statements.push(format!(
            r#"INSERT INTO line_items ("id", "invoiceId", "description", "quantity", "unitPrice", "amount") VALUES ('li-{i}', 'inv-{i}', 'Consulting', 1.0, {amount:.2}, {amount:.2})"#
        ));
    }
    statements
}

/// Creates the invoice tables and `n` invoices through any storage provider.
pub async fn seed_storage(storage: &dyn Storage, n: usize) -> Result<()> {
    for statement in INVOICE_TABLES_SQL {
        storage.execute_query(statement).await?;
    }
    for statement in invoice_rows_sql(n) {
        storage.execute_query(&statement).await?;
    }
    Ok(())
}

/// Creates a new, isolated in-memory invoice database with `n` invoices.
pub async fn seed_invoice_db(n: usize) -> Result<SqliteProvider> {
    let provider = SqliteProvider::new(":memory:").await?;
    seed_storage(&provider, n).await?;
    Ok(provider)
}

// --- Mock AI Provider ---

#[derive(Clone, Debug)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// A recorded call to the mock provider.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub user_prompt: String,
    pub params: SamplingParams,
}

#[derive(Clone, Debug)]
pub struct MockAiProvider {
    responses: Arc<Mutex<Vec<(String, Scripted)>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-programs a response for prompts containing `key`.
    ///
    /// The key is matched against the system prompt and then the user
    /// prompt; the first programmed key that matches wins.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.push((key.to_string(), Scripted::Reply(response.to_string())));
    }

    /// Makes prompts containing `key` fail with an API error.
    pub fn add_failure(&self, key: &str, message: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.push((key.to_string(), Scripted::Fail(message.to_string())));
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
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
        self.calls.lock().unwrap().push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            params: *params,
        });

        let responses = self.responses.lock().unwrap();
        let matched = responses
            .iter()
            .find(|(key, _)| system_prompt.contains(key.as_str()))
            .or_else(|| {
                responses
                    .iter()
                    .find(|(key, _)| user_prompt.contains(key.as_str()))
            });

        match matched {
            Some((_, Scripted::Reply(text))) => Ok(text.clone()),
            Some((_, Scripted::Fail(message))) => Err(PromptError::AiApi(message.clone())),
            None => Err(PromptError::AiApi(format!(
                "MockAiProvider: No response programmed for prompt. Got: '{system_prompt}'"
            ))),
        }
    }
}

// --- Recording Storage Provider ---

/// Wraps a storage provider and records every statement it executes.
#[derive(Clone, Debug)]
pub struct RecordingStorage<S> {
    inner: S,
    executed: Arc<Mutex<Vec<String>>>,
}

impl<S> RecordingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }
}

#[async_trait]
impl<S: Storage + Clone + 'static> Storage for RecordingStorage<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dialect(&self) -> &str {
        self.inner.dialect()
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult, PromptError> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.inner.execute_query(sql).await
    }

    async fn execute_read_only(&self, sql: &str) -> Result<QueryResult, PromptError> {
        self.executed.lock().unwrap().push(sql.to_string());
        self.inner.execute_read_only(sql).await
    }
}
