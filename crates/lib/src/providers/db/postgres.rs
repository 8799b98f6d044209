use crate::{
    errors::PromptError,
    providers::db::{
        storage::Storage,
        value::{ColumnKind, SqlScalar},
    },
    types::{QueryResult, Row},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{
    postgres::{
        types::PgInterval, PgConnection, PgPool, PgPoolOptions, PgRow, PgTypeInfo, PgTypeKind,
        PgValueFormat,
    },
    Column, Executor, Row as _, Statement, TypeInfo, ValueRef,
};
use std::{
    fmt::{self, Debug},
    time::Duration,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// A provider for a PostgreSQL database backed by a `sqlx` connection pool.
///
/// Every query checks out its own connection and runs inside its own
/// transaction, so a failed statement never affects another request.
#[derive(Clone)]
pub struct PostgresProvider {
    pool: PgPool,
}

impl PostgresProvider {
    /// Creates a provider without opening a connection.
    ///
    /// The URL is parsed immediately; connections are established on first
    /// use and returned to the pool after every query.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, PromptError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(database_url)
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs one statement in its own transaction, committing on success and
    /// rolling back on any error.
    ///
    /// A read-only transaction makes PostgreSQL refuse writes that reach the
    /// database through functions, such as `nextval`.
    async fn run_in_transaction(
        &self,
        sql: &str,
        read_only: bool,
    ) -> Result<QueryResult, PromptError> {
        debug!(sql = %sql, read_only, "--> Executing PostgreSQL query");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        let outcome = if read_only {
            match (&mut *tx).execute("SET TRANSACTION READ ONLY").await {
                Ok(_) => run_statement(&mut tx, sql).await,
                Err(e) => Err(query_failed(e)),
            }
        } else {
            run_statement(&mut tx, sql).await
        };

        match outcome {
            Ok(result) => {
                tx.commit().await.map_err(query_failed)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed query also failed");
                }
                Err(e)
            }
        }
    }
}

impl Debug for PostgresProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresProvider")
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}

fn query_failed(e: sqlx::Error) -> PromptError {
    PromptError::StorageQueryFailed(e.to_string())
}

const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_POS_INF: u16 = 0xD000;
const NUMERIC_NEG_INF: u16 = 0xF000;
const NUMERIC_NEG: u16 = 0x4000;

fn be_i16(bytes: &[u8], at: usize) -> Option<i16> {
    Some(i16::from_be_bytes(bytes.get(at..at + 2)?.try_into().ok()?))
}

fn be_i32(bytes: &[u8], at: usize) -> Option<i32> {
    Some(i32::from_be_bytes(bytes.get(at..at + 4)?.try_into().ok()?))
}

/// Decodes a NUMERIC in binary wire format straight to `f64`.
///
/// Used when a value does not fit `Decimal`: NaN, infinities, or more than
/// 28 significant digits.
fn numeric_to_f64(bytes: &[u8]) -> Option<f64> {
    let ndigits = usize::try_from(be_i16(bytes, 0)?).ok()?;
    let weight = i32::from(be_i16(bytes, 2)?);
    let sign = be_i16(bytes, 4)? as u16;

    match sign {
        NUMERIC_NAN => return Some(f64::NAN),
        NUMERIC_POS_INF => return Some(f64::INFINITY),
        NUMERIC_NEG_INF => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if ndigits == 0 {
        return Some(0.0);
    }

    // Base-10000 groups; group `i` is worth 10000^(weight - i).
    let mut mantissa = String::with_capacity(ndigits * 4);
    for i in 0..ndigits {
        mantissa.push_str(&format!("{:04}", be_i16(bytes, 8 + i * 2)?));
    }
    let value: f64 = format!("0.{mantissa}e{}", 4 * (weight + 1)).parse().ok()?;
    Some(if sign == NUMERIC_NEG { -value } else { value })
}

/// Decodes a one-dimensional NUMERIC[] in binary wire format.
fn numeric_array_to_f64s(bytes: &[u8]) -> Option<Vec<Option<f64>>> {
    let ndim = be_i32(bytes, 0)?;
    if ndim == 0 {
        return Some(Vec::new());
    }
    if ndim != 1 {
        return None;
    }
    let len = usize::try_from(be_i32(bytes, 12)?).ok()?;

    let mut at = 20;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        let size = be_i32(bytes, at)?;
        at += 4;
        if size < 0 {
            items.push(None);
            continue;
        }
        let size = usize::try_from(size).ok()?;
        items.push(Some(numeric_to_f64(bytes.get(at..at + size)?)?));
        at += size;
    }
    Some(items)
}

/// Reads a NUMERIC or NUMERIC[] cell that `Decimal` rejected.
fn decode_numeric_fallback(
    row: &PgRow,
    idx: usize,
    array: bool,
) -> Result<SqlScalar, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(SqlScalar::Null);
    }

    let decoded = match raw.format() {
        PgValueFormat::Binary => {
            let bytes = raw.as_bytes().map_err(sqlx::Error::Decode)?;
            if array {
                numeric_array_to_f64s(bytes).map(|items| {
                    SqlScalar::Array(
                        items
                            .into_iter()
                            .map(|v| v.map(SqlScalar::Float).unwrap_or(SqlScalar::Null))
                            .collect(),
                    )
                })
            } else {
                numeric_to_f64(bytes).map(SqlScalar::Float)
            }
        }
        PgValueFormat::Text if !array => {
            let text = raw.as_str().map_err(sqlx::Error::Decode)?;
            text.trim().parse::<f64>().ok().map(SqlScalar::Float)
        }
        PgValueFormat::Text => None,
    };

    Ok(decoded.unwrap_or_else(|| {
        debug!(column = idx, "Unreadable NUMERIC value; emitting null");
        SqlScalar::Null
    }))
}

/// Picks the decoder for a column. Enums are recognized by their type kind
/// because their names are user-defined.
fn column_kind(type_info: &PgTypeInfo) -> ColumnKind {
    match type_info.kind() {
        PgTypeKind::Enum(_) => ColumnKind::Enum,
        _ => ColumnKind::from_pg_type(type_info.name()),
    }
}

/// Decodes one cell according to its reported column type.
fn decode_cell(row: &PgRow, idx: usize, kind: ColumnKind) -> Result<SqlScalar, sqlx::Error> {
    let scalar: SqlScalar = match kind {
        ColumnKind::Bool => row.try_get::<Option<bool>, _>(idx)?.into(),
        ColumnKind::Int2 => row.try_get::<Option<i16>, _>(idx)?.into(),
        ColumnKind::Int4 => row.try_get::<Option<i32>, _>(idx)?.into(),
        ColumnKind::Int8 => row.try_get::<Option<i64>, _>(idx)?.into(),
        ColumnKind::Float4 => row.try_get::<Option<f32>, _>(idx)?.into(),
        ColumnKind::Float8 => row.try_get::<Option<f64>, _>(idx)?.into(),
        ColumnKind::Numeric => match row.try_get::<Option<Decimal>, _>(idx) {
            Ok(value) => value.into(),
            Err(_) => decode_numeric_fallback(row, idx, false)?,
        },
        ColumnKind::Date => row.try_get::<Option<NaiveDate>, _>(idx)?.into(),
        ColumnKind::Time => row.try_get::<Option<NaiveTime>, _>(idx)?.into(),
        ColumnKind::Timestamp => row.try_get::<Option<NaiveDateTime>, _>(idx)?.into(),
        ColumnKind::TimestampTz => row.try_get::<Option<DateTime<Utc>>, _>(idx)?.into(),
        ColumnKind::Interval => row.try_get::<Option<PgInterval>, _>(idx)?.into(),
        ColumnKind::Uuid => row.try_get::<Option<Uuid>, _>(idx)?.into(),
        ColumnKind::Text => row.try_get::<Option<String>, _>(idx)?.into(),
        ColumnKind::Json => row.try_get::<Option<Value>, _>(idx)?.into(),
        ColumnKind::Bytes => match row.try_get::<Option<Vec<u8>>, _>(idx)? {
            Some(_) => SqlScalar::Bytes,
            None => SqlScalar::Null,
        },
        ColumnKind::BoolArray => row.try_get::<Option<Vec<Option<bool>>>, _>(idx)?.into(),
        ColumnKind::Int2Array => row.try_get::<Option<Vec<Option<i16>>>, _>(idx)?.into(),
        ColumnKind::Int4Array => row.try_get::<Option<Vec<Option<i32>>>, _>(idx)?.into(),
        ColumnKind::Int8Array => row.try_get::<Option<Vec<Option<i64>>>, _>(idx)?.into(),
        ColumnKind::Float4Array => row.try_get::<Option<Vec<Option<f32>>>, _>(idx)?.into(),
        ColumnKind::Float8Array => row.try_get::<Option<Vec<Option<f64>>>, _>(idx)?.into(),
        ColumnKind::NumericArray => match row.try_get::<Option<Vec<Option<Decimal>>>, _>(idx) {
            Ok(value) => value.into(),
            Err(_) => decode_numeric_fallback(row, idx, true)?,
        },
        ColumnKind::TextArray => row.try_get::<Option<Vec<Option<String>>>, _>(idx)?.into(),
        ColumnKind::UuidArray => row.try_get::<Option<Vec<Option<Uuid>>>, _>(idx)?.into(),
        // Enum labels travel as UTF-8 text in both wire formats.
        ColumnKind::Enum => row.try_get_unchecked::<Option<String>, _>(idx)?.into(),
        ColumnKind::Other => {
            debug!(column = idx, "Column type has no JSON mapping; emitting null");
            SqlScalar::Null
        }
    };
    Ok(scalar)
}

/// Prepares, runs and materializes one statement on a checked-out connection.
async fn run_statement(conn: &mut PgConnection, sql: &str) -> Result<QueryResult, PromptError> {
    let statement = (&mut *conn).prepare(sql).await.map_err(query_failed)?;

    let columns: Vec<(String, ColumnKind)> = statement
        .columns()
        .iter()
        .map(|c| {
            (
                c.name().to_string(),
                column_kind(c.type_info()),
            )
        })
        .collect();

    if columns.is_empty() {
        // No result descriptor: the statement returns no rows.
        (&mut *conn).execute(sql).await.map_err(query_failed)?;
        return Ok(QueryResult::default());
    }

    let pg_rows = statement
        .query()
        .fetch_all(&mut *conn)
        .await
        .map_err(query_failed)?;

    let mut rows = Vec::with_capacity(pg_rows.len());
    for pg_row in &pg_rows {
        let mut row = Row::new();
        for (idx, (name, kind)) in columns.iter().enumerate() {
            let cell = decode_cell(pg_row, idx, *kind).map_err(query_failed)?;
            row.insert(name.clone(), Value::from(cell));
        }
        rows.push(row);
    }

    Ok(QueryResult::new(
        columns.into_iter().map(|(name, _)| name).collect(),
        rows,
    ))
}

#[async_trait]
impl Storage for PostgresProvider {
    fn name(&self) -> &str {
        "PostgreSQL"
    }

    fn dialect(&self) -> &str {
        "PostgreSQL"
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult, PromptError> {
        self.run_in_transaction(sql, false).await
    }

    async fn execute_read_only(&self, sql: &str) -> Result<QueryResult, PromptError> {
        self.run_in_transaction(sql, true).await
    }
}
