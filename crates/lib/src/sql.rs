//! # Generated SQL Handling
//!
//! Cleanup of raw model output and the read-only guard that every generated
//! statement passes before it reaches the database.

use crate::{errors::PromptError, schema::SchemaDescriptor};
use sqlparser::ast::{Expr, ObjectName, Query, SetExpr, Statement, Visit, Visitor};
use sqlparser::dialect::{dialect_from_str, Dialect, GenericDialect};
use sqlparser::parser::Parser;
use std::collections::HashSet;
use std::ops::ControlFlow;

const FENCE: &str = "```";

/// Functions that change state or hold resources even inside a SELECT.
const DENIED_FUNCTIONS: &[&str] = &[
    "nextval",
    "setval",
    "set_config",
    "pg_sleep",
    "pg_sleep_for",
    "pg_sleep_until",
    "pg_terminate_backend",
    "pg_cancel_backend",
    "pg_reload_conf",
    "pg_rotate_logfile",
    "pg_notify",
    "pg_read_file",
    "pg_read_binary_file",
    "pg_ls_dir",
    "txid_current",
    "load_extension",
];

/// Name prefixes of function families that are denied wholesale.
const DENIED_FUNCTION_PREFIXES: &[&str] = &["pg_advisory_", "lo_", "dblink"];

fn is_denied_function(name: &str) -> bool {
    DENIED_FUNCTIONS.contains(&name)
        || DENIED_FUNCTION_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

/// Parser dialect for a provider's `Storage::dialect` name.
fn parser_dialect(name: &str) -> Box<dyn Dialect> {
    dialect_from_str(name.to_ascii_lowercase()).unwrap_or_else(|| Box::new(GenericDialect {}))
}

/// Strips surrounding whitespace and a markdown code fence from model output.
///
/// When the text opens with a fence, the first line (the opening marker and
/// any language tag) and the last line (the closing marker) are dropped, any
/// stray markers are removed, and the remainder is trimmed once more.
pub fn clean_llm_sql(raw: &str) -> String {
    let mut sql = raw.trim();
    if !sql.starts_with(FENCE) {
        return sql.to_string();
    }

    if let Some((_, body)) = sql.split_once('\n') {
        sql = body;
    }
    if let Some((body, _)) = sql.rsplit_once('\n') {
        sql = body;
    }
    sql.replace(FENCE, "").trim().to_string()
}

/// Collects relation names and flags anything that is not a plain read.
#[derive(Default)]
struct StatementInspector {
    cte_names: HashSet<String>,
    relations: Vec<String>,
    violation: Option<String>,
}

impl StatementInspector {
    fn flag(&mut self, reason: impl Into<String>) {
        if self.violation.is_none() {
            self.violation = Some(reason.into());
        }
    }
}

/// Returns the unqualified, unquoted, lower-cased name of a relation.
fn base_name(name: &ObjectName) -> String {
    let rendered = name.to_string();
    let last = rendered.rsplit('.').next().unwrap_or(&rendered);
    last.trim_matches(['"', '`', '[', ']']).to_lowercase()
}

impl Visitor for StatementInspector {
    type Break = ();

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<()> {
        if !matches!(statement, Statement::Query(_)) {
            self.flag("only SELECT queries may be executed");
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.cte_names.insert(cte.alias.name.value.to_lowercase());
            }
        }
        if !query.locks.is_empty() {
            self.flag("row locking clauses are not allowed");
        }
        if let SetExpr::Select(select) = query.body.as_ref() {
            if select.into.is_some() {
                self.flag("SELECT INTO creates a table and is not allowed");
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<()> {
        self.relations.push(base_name(relation));
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        if let Expr::Function(function) = expr {
            let name = base_name(&function.name);
            if is_denied_function(&name) {
                self.flag(format!("function {name}() is not allowed"));
            }
        }
        ControlFlow::Continue(())
    }
}

/// Rejects anything other than a single read-only query over known tables.
///
/// `dialect` is the storage provider's dialect name ("PostgreSQL", "SQLite");
/// unknown names parse with the generic dialect.
pub fn ensure_read_only(
    sql: &str,
    schema: &SchemaDescriptor,
    dialect: &str,
) -> Result<(), PromptError> {
    let dialect = parser_dialect(dialect);
    let statements = Parser::parse_sql(dialect.as_ref(), sql)
        .map_err(|e| PromptError::SqlRejected(format!("SQL parse error: {e}")))?;

    let statement = match statements.as_slice() {
        [single] => single,
        [] => return Err(PromptError::SqlRejected("SQL is empty".to_string())),
        _ => {
            return Err(PromptError::SqlRejected(
                "SQL must contain exactly one statement".to_string(),
            ))
        }
    };

    let mut inspector = StatementInspector::default();
    let _ = statement.visit(&mut inspector);

    if let Some(reason) = inspector.violation {
        return Err(PromptError::SqlRejected(reason));
    }

    let unknown: Vec<&str> = inspector
        .relations
        .iter()
        .filter(|name| !inspector.cte_names.contains(*name) && !schema.has_table(name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(PromptError::SqlRejected(format!(
            "unknown table(s): {}",
            unknown.join(", ")
        )));
    }

    Ok(())
}
