use crate::{errors::PromptError, types::QueryResult};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a storage backend.
///
/// This trait defines a common interface for executing generated SQL against
/// different database providers (e.g., PostgreSQL, SQLite).
#[async_trait]
pub trait Storage: Send + Sync + DynClone + Debug {
    /// Returns the name of the storage provider (e.g., "PostgreSQL", "SQLite").
    fn name(&self) -> &str;

    /// Returns the SQL dialect the provider expects, used in prompts.
    fn dialect(&self) -> &str;

    /// Executes a SQL statement and materializes every row.
    ///
    /// A statement without a result set yields an empty `QueryResult`.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult, PromptError>;

    /// Executes a statement that must not write anything.
    ///
    /// Providers that support read-only sessions enforce it in the database.
    /// The default runs the statement as `execute_query` does.
    async fn execute_read_only(&self, sql: &str) -> Result<QueryResult, PromptError> {
        self.execute_query(sql).await
    }
}

dyn_clone::clone_trait_object!(Storage);
