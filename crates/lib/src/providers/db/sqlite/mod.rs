use crate::{
    errors::PromptError,
    providers::db::{storage::Storage, value::BINARY_PLACEHOLDER},
    types::{QueryResult, Row},
};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Debug};
use tracing::debug;
use turso::{Database, Value as TursoValue};

/// A provider for a local SQLite database using Turso.
///
/// This provider holds a `Database` instance and opens a fresh connection for
/// every query. When cloned, it shares the same underlying database, so an
/// in-memory database can be seeded through one clone and queried through
/// another.
#[derive(Clone)]
pub struct SqliteProvider {
    /// The Turso database instance. It's cloneable and thread-safe.
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path or in-memory.
    ///
    /// Use ":memory:" for a unique, isolated in-memory database.
    pub async fn new(db_path: &str) -> Result<Self, PromptError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        // WAL has no effect on in-memory databases but is safe to request.
        let conn = db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        Ok(Self { db })
    }

    /// Executes a `;`-separated script, e.g. to seed fixtures.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), PromptError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ())
                .await
                .map_err(|e| PromptError::StorageQueryFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

/// Converts a Turso value to a serde_json::Value.
fn turso_value_to_json(v: TursoValue) -> Value {
    match v {
        TursoValue::Null => Value::Null,
        TursoValue::Integer(i) => Value::Number(i.into()),
        TursoValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        TursoValue::Text(s) => Value::String(s),
        TursoValue::Blob(_) => Value::String(BINARY_PLACEHOLDER.to_string()),
    }
}

fn query_failed(e: turso::Error) -> PromptError {
    PromptError::StorageQueryFailed(e.to_string())
}

#[async_trait]
impl Storage for SqliteProvider {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn dialect(&self) -> &str {
        "SQLite"
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult, PromptError> {
        debug!(sql = %sql, "--> Executing SQLite query");

        // A new connection per query; nothing survives a failed statement.
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        let mut stmt = conn.prepare(sql).await.map_err(query_failed)?;

        let column_names: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        if column_names.is_empty() {
            conn.execute(sql, ()).await.map_err(query_failed)?;
            return Ok(QueryResult::default());
        }

        let mut rows = stmt.query(()).await.map_err(query_failed)?;
        let mut results: Vec<Row> = Vec::new();

        while let Some(row) = rows.next().await.map_err(query_failed)? {
            let mut row_map = Row::new();
            for (i, name) in column_names.iter().enumerate() {
                let value = row.get_value(i).map_err(query_failed)?;
                row_map.insert(name.clone(), turso_value_to_json(value));
            }
            results.push(row_map);
        }

        Ok(QueryResult::new(column_names, results))
    }
}
