//! # Cell Conversion
//!
//! Database cells are decoded into an explicit `SqlScalar` chosen from the
//! column type the driver reports, then turned into JSON. Fixed-point values
//! become floats, temporal values become ISO-8601 strings and arrays become
//! JSON arrays. Non-finite numbers become null.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::postgres::types::PgInterval;
use uuid::Uuid;

/// Placeholder emitted for binary cells.
pub const BINARY_PLACEHOLDER: &str = "<binary>";

/// Column categories the executor knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Uuid,
    Text,
    Json,
    Bytes,
    BoolArray,
    Int2Array,
    Int4Array,
    Int8Array,
    Float4Array,
    Float8Array,
    NumericArray,
    TextArray,
    UuidArray,
    /// A user-defined enum; its wire value is the label text.
    Enum,
    /// Anything else, emitted as null.
    Other,
}

impl ColumnKind {
    /// Maps a PostgreSQL type name as reported by the driver.
    pub fn from_pg_type(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => ColumnKind::Bool,
            "INT2" | "SMALLINT" => ColumnKind::Int2,
            "INT4" | "INT" | "INTEGER" => ColumnKind::Int4,
            "INT8" | "BIGINT" => ColumnKind::Int8,
            "FLOAT4" | "REAL" => ColumnKind::Float4,
            "FLOAT8" | "DOUBLE PRECISION" => ColumnKind::Float8,
            "NUMERIC" | "DECIMAL" => ColumnKind::Numeric,
            "DATE" => ColumnKind::Date,
            "TIME" => ColumnKind::Time,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            "INTERVAL" => ColumnKind::Interval,
            "UUID" => ColumnKind::Uuid,
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => ColumnKind::Text,
            "JSON" | "JSONB" => ColumnKind::Json,
            "BYTEA" => ColumnKind::Bytes,
            "BOOL[]" => ColumnKind::BoolArray,
            "INT2[]" => ColumnKind::Int2Array,
            "INT4[]" => ColumnKind::Int4Array,
            "INT8[]" => ColumnKind::Int8Array,
            "FLOAT4[]" => ColumnKind::Float4Array,
            "FLOAT8[]" => ColumnKind::Float8Array,
            "NUMERIC[]" => ColumnKind::NumericArray,
            "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "CHAR[]" | "NAME[]" => ColumnKind::TextArray,
            "UUID[]" => ColumnKind::UuidArray,
            _ => ColumnKind::Other,
        }
    }
}

/// A decoded cell before JSON conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlScalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Interval {
        months: i32,
        days: i32,
        microseconds: i64,
    },
    Uuid(Uuid),
    Text(String),
    Json(Value),
    Bytes,
    Array(Vec<SqlScalar>),
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Renders an interval as an ISO-8601 duration, e.g. `P1Y2M3DT4H5M6.5S`.
///
/// Negative components keep their own sign, as PostgreSQL's `iso_8601`
/// interval style does.
pub fn iso_duration(months: i32, days: i32, microseconds: i64) -> String {
    let mut out = String::from("P");
    let (years, months) = (months / 12, months % 12);
    if years != 0 {
        out.push_str(&format!("{years}Y"));
    }
    if months != 0 {
        out.push_str(&format!("{months}M"));
    }
    if days != 0 {
        out.push_str(&format!("{days}D"));
    }

    if microseconds != 0 {
        out.push('T');
        let sign = if microseconds < 0 { "-" } else { "" };
        let abs = microseconds.unsigned_abs();
        let hours = abs / 3_600_000_000;
        let minutes = (abs / 60_000_000) % 60;
        let seconds = (abs / 1_000_000) % 60;
        let fraction = abs % 1_000_000;
        if hours != 0 {
            out.push_str(&format!("{sign}{hours}H"));
        }
        if minutes != 0 {
            out.push_str(&format!("{sign}{minutes}M"));
        }
        if seconds != 0 || fraction != 0 {
            let fraction = if fraction == 0 {
                String::new()
            } else {
                format!(".{fraction:06}").trim_end_matches('0').to_string()
            };
            out.push_str(&format!("{sign}{seconds}{fraction}S"));
        }
    }

    if out.len() == 1 {
        out.push_str("T0S");
    }
    out
}

impl From<SqlScalar> for Value {
    fn from(scalar: SqlScalar) -> Self {
        match scalar {
            SqlScalar::Null => Value::Null,
            SqlScalar::Bool(b) => Value::Bool(b),
            SqlScalar::Int(i) => Value::Number(i.into()),
            SqlScalar::Float(f) => float(f),
            SqlScalar::Decimal(d) => d.to_f64().map(float).unwrap_or(Value::Null),
            SqlScalar::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            SqlScalar::Time(t) => Value::String(t.format("%H:%M:%S%.f").to_string()),
            SqlScalar::Timestamp(ts) => {
                Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            SqlScalar::TimestampTz(ts) => Value::String(ts.to_rfc3339()),
            SqlScalar::Interval {
                months,
                days,
                microseconds,
            } => Value::String(iso_duration(months, days, microseconds)),
            SqlScalar::Uuid(id) => Value::String(id.to_string()),
            SqlScalar::Text(s) => Value::String(s),
            SqlScalar::Json(v) => v,
            SqlScalar::Bytes => Value::String(BINARY_PLACEHOLDER.to_string()),
            SqlScalar::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
        }
    }
}

impl<T: Into<SqlScalar>> From<Option<T>> for SqlScalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlScalar::Null)
    }
}

impl<T: Into<SqlScalar>> From<Vec<T>> for SqlScalar {
    fn from(items: Vec<T>) -> Self {
        SqlScalar::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<PgInterval> for SqlScalar {
    fn from(interval: PgInterval) -> Self {
        SqlScalar::Interval {
            months: interval.months,
            days: interval.days,
            microseconds: interval.microseconds,
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for SqlScalar {
            fn from(v: $ty) -> Self {
                SqlScalar::$variant(v.into())
            }
        })*
    };
}

scalar_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Float,
    Decimal => Decimal,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
    String => Text,
    Value => Json,
}
