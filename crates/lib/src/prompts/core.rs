//! # Default Prompt Templates
//!
//! This module contains the prompt templates used by the `PromptClient`.
//! Placeholders in `{braces}` are substituted at request time.

use crate::schema::ColumnNaming;

// --- SQL Generation Prompts ---

/// The system prompt for the SQL generation stage.
///
/// Placeholders: `{dialect}`
pub const SQL_GENERATION_SYSTEM_PROMPT: &str = "You are a {dialect} expert for an invoice analytics database. Write a single read-only {dialect} query that answers the user's question. Return ONLY the SQL query, no explanations or markdown.";

/// The user prompt for the SQL generation stage.
///
/// Placeholders: `{schema}`, `{question}`, `{dialect}`, `{naming_rules}`
pub const SQL_GENERATION_USER_PROMPT: &str = r#"{schema}

User question: {question}

Generate a {dialect} query to answer this question. Return ONLY the SQL query, no explanations or markdown.

CRITICAL REQUIREMENTS:
{naming_rules}
- Use proper {dialect} syntax
- Handle NULL values appropriately
- Use appropriate aggregations
- For invoice status questions, JOIN with the invoices table
- Include ORDER BY for sorted results
- Limit results to reasonable numbers (e.g., LIMIT 10-100 for lists)"#;

const QUOTED_NAMING_RULES: &str = r#"- ALL column names MUST be wrapped in double quotes: "columnName"
- When using table aliases, format as: alias."columnName" (e.g., ed."invoiceId", ed."totalAmount")"#;

const SNAKE_NAMING_RULES: &str =
    "- Column names are lower-case with underscores and MUST NOT be quoted";

/// Returns the identifier rules matching the schema's naming convention.
pub fn naming_rules(naming: ColumnNaming) -> &'static str {
    match naming {
        ColumnNaming::QuotedCamelCase => QUOTED_NAMING_RULES,
        ColumnNaming::SnakeCase => SNAKE_NAMING_RULES,
    }
}

// --- Explanation Prompts ---

/// The system prompt for the result summary stage.
pub const EXPLANATION_SYSTEM_PROMPT: &str =
    "You are a concise analyst who summarizes database query results for business users.";

/// The user prompt for the result summary stage.
///
/// Placeholders: `{question}`, `{sql}`, `{row_count}`
pub const EXPLANATION_USER_PROMPT: &str = r#"User asked: "{question}"

SQL query executed:
{sql}

Results: {row_count} rows returned

Provide a brief, natural language summary of these results (2-3 sentences max)."#;

/// The sentence used when the summary call fails.
pub fn explanation_fallback(row_count: usize) -> String {
    format!("Query executed successfully, returning {row_count} rows.")
}
