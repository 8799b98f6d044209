//! # Schema Descriptor
//!
//! A static description of the invoice database that grounds every SQL
//! generation prompt. The structure is declared once below and rendered to
//! prompt text lazily; the rendered text never changes for the lifetime of
//! the process.

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::OnceLock;

/// How column identifiers are spelled in the target database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnNaming {
    /// `"vendorName"`: mixed-case identifiers that must be double-quoted.
    #[default]
    QuotedCamelCase,
    /// `vendor_name`: plain lower-case identifiers.
    SnakeCase,
}

/// The role a column plays in table relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    None,
    Primary,
    /// Foreign key pointing at `table.column`.
    Foreign(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    /// The camelCase name; snake_case is derived from it.
    pub name: &'static str,
    pub sql_type: &'static str,
    pub nullable: bool,
    pub key: KeyRole,
    pub note: Option<&'static str>,
}

#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub summary: &'static str,
    pub alias: &'static str,
    pub columns: &'static [ColumnDef],
}

/// A canonical question/SQL pair shown to the model. Column references are
/// written as `{camelName}` and spelled out per naming convention.
#[derive(Debug, Clone, Copy)]
pub struct ExampleQuery {
    pub label: &'static str,
    pub template: &'static str,
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        nullable: true,
        key: KeyRole::None,
        note: None,
    }
}

const fn pk(name: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type: "VARCHAR",
        nullable: false,
        key: KeyRole::Primary,
        note: None,
    }
}

const fn fk(name: &'static str, target: &'static str) -> ColumnDef {
    ColumnDef {
        name,
        sql_type: "VARCHAR",
        nullable: false,
        key: KeyRole::Foreign(target),
        note: None,
    }
}

const fn required(mut c: ColumnDef) -> ColumnDef {
    c.nullable = false;
    c
}

const fn noted(mut c: ColumnDef, note: &'static str) -> ColumnDef {
    c.note = Some(note);
    c
}

pub const TABLES: &[TableDef] = &[
    TableDef {
        name: "extracted_data",
        summary: "Main invoice data table",
        alias: "ed",
        columns: &[
            pk("id"),
            fk("invoiceId", "invoices.id"),
            col("vendorName", "VARCHAR"),
            col("vendorAddress", "VARCHAR"),
            col("invoiceNumber", "VARCHAR"),
            col("invoiceDate", "DATE"),
            col("dueDate", "DATE"),
            col("subtotal", "DECIMAL(15,2)"),
            col("taxAmount", "DECIMAL(15,2)"),
            col("totalAmount", "DECIMAL(15,2)"),
            col("currency", "VARCHAR"),
            col("category", "VARCHAR"),
            required(col("createdAt", "TIMESTAMP")),
            required(col("updatedAt", "TIMESTAMP")),
        ],
    },
    TableDef {
        name: "invoices",
        summary: "Invoice metadata",
        alias: "i",
        columns: &[
            pk("id"),
            required(col("name", "VARCHAR")),
            required(noted(
                col("status", "VARCHAR"),
                "ENUM: PENDING, APPROVED, REJECTED, PAID. PENDING = not yet reviewed; APPROVED, REJECTED, PAID = processed",
            )),
            required(col("organizationId", "VARCHAR")),
            noted(
                col("processedAt", "TIMESTAMP"),
                "when status changed from PENDING",
            ),
            required(col("createdAt", "TIMESTAMP")),
            required(col("updatedAt", "TIMESTAMP")),
        ],
    },
    TableDef {
        name: "line_items",
        summary: "Individual invoice line items",
        alias: "li",
        columns: &[
            pk("id"),
            fk("invoiceId", "invoices.id"),
            col("description", "VARCHAR"),
            col("quantity", "DECIMAL(10,2)"),
            col("unitPrice", "DECIMAL(15,2)"),
            col("amount", "DECIMAL(15,2)"),
            col("category", "VARCHAR"),
        ],
    },
];

pub const EXAMPLE_QUERIES: &[ExampleQuery] = &[
    ExampleQuery {
        label: "Total spend",
        template: "SELECT SUM({totalAmount}) FROM extracted_data",
    },
    ExampleQuery {
        label: "Tax this year",
        template: "SELECT SUM({taxAmount}) FROM extracted_data WHERE EXTRACT(YEAR FROM {invoiceDate}) = EXTRACT(YEAR FROM CURRENT_DATE)",
    },
    ExampleQuery {
        label: "Count all invoices",
        template: "SELECT COUNT(*) FROM invoices",
    },
    ExampleQuery {
        label: "Count processed invoices",
        template: "SELECT COUNT(*) FROM invoices i WHERE i.{status} IN ('APPROVED', 'REJECTED', 'PAID')",
    },
    ExampleQuery {
        label: "Pending invoices",
        template: "SELECT COUNT(*) FROM invoices i WHERE i.{status} = 'PENDING'",
    },
    ExampleQuery {
        label: "Invoice with status",
        template: "SELECT ed.{vendorName}, ed.{totalAmount}, i.{status} FROM extracted_data ed JOIN invoices i ON ed.{invoiceId} = i.{id} WHERE i.{status} = 'PENDING'",
    },
    ExampleQuery {
        label: "Top vendors",
        template: "SELECT {vendorName}, SUM({totalAmount}) AS total FROM extracted_data GROUP BY {vendorName} ORDER BY total DESC LIMIT 10",
    },
    ExampleQuery {
        label: "Monthly trends",
        template: "SELECT DATE_TRUNC('month', {invoiceDate}) AS month, COUNT(*) AS count, SUM({totalAmount}) AS total FROM extracted_data GROUP BY month ORDER BY month",
    },
    ExampleQuery {
        label: "Last 90 days",
        template: "SELECT ed.{invoiceId}, ed.{vendorName}, ed.{totalAmount} FROM extracted_data ed WHERE ed.{invoiceDate} >= CURRENT_DATE - INTERVAL '90 days'",
    },
];

/// Converts `invoiceDate` to `invoice_date`.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

impl ColumnNaming {
    /// Spells a column identifier the way SQL against this database must.
    pub fn identifier(&self, camel: &str) -> String {
        match self {
            ColumnNaming::QuotedCamelCase => format!("\"{camel}\""),
            ColumnNaming::SnakeCase => to_snake_case(camel),
        }
    }

    /// Spells a `table.column` reference in plain form for prose.
    fn reference(&self, target: &str) -> String {
        match (self, target.split_once('.')) {
            (ColumnNaming::QuotedCamelCase, Some((table, column))) => {
                format!("{table}.\"{column}\"")
            }
            (ColumnNaming::SnakeCase, Some((table, column))) => {
                format!("{table}.{}", to_snake_case(column))
            }
            (_, None) => target.to_string(),
        }
    }
}

/// Fills `{camelName}` placeholders in an example template.
fn render_template(template: &str, naming: ColumnNaming) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(end) => {
                let name = &rest[start + 1..start + end];
                out.push_str(&naming.identifier(name));
                rest = &rest[start + end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Handle to the rendered schema prompt for one naming convention.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDescriptor {
    naming: ColumnNaming,
}

static QUOTED_TEXT: OnceLock<String> = OnceLock::new();
static SNAKE_TEXT: OnceLock<String> = OnceLock::new();

impl SchemaDescriptor {
    pub fn new(naming: ColumnNaming) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> ColumnNaming {
        self.naming
    }

    /// Returns the prompt fragment. Rendered on first use, then shared.
    pub fn describe(&self) -> &'static str {
        let cell = match self.naming {
            ColumnNaming::QuotedCamelCase => &QUOTED_TEXT,
            ColumnNaming::SnakeCase => &SNAKE_TEXT,
        };
        cell.get_or_init(|| render(self.naming)).as_str()
    }

    /// Names of every table the database exposes.
    pub fn table_names(&self) -> impl Iterator<Item = &'static str> {
        TABLES.iter().map(|t| t.name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        TABLES.iter().any(|t| t.name.eq_ignore_ascii_case(name))
    }
}

fn render(naming: ColumnNaming) -> String {
    let mut text = String::new();
    let heading = match naming {
        ColumnNaming::QuotedCamelCase => {
            "Database Schema (PostgreSQL with camelCase columns - MUST USE DOUBLE QUOTES):"
        }
        ColumnNaming::SnakeCase => "Database Schema (PostgreSQL):",
    };
    // Writing to a String cannot fail.
    let _ = writeln!(text, "{heading}\n");

    for (n, table) in TABLES.iter().enumerate() {
        let _ = writeln!(text, "{}. {} - {}", n + 1, table.name, table.summary);
        for column in table.columns {
            let mut line = format!(
                "   - {}: {}",
                naming.identifier(column.name),
                column.sql_type
            );
            match column.key {
                KeyRole::Primary => line.push_str(" (Primary Key)"),
                KeyRole::Foreign(target) => {
                    let _ = write!(line, " (Foreign Key -> {})", naming.reference(target));
                }
                KeyRole::None if !column.nullable => line.push_str(" NOT NULL"),
                KeyRole::None => {}
            }
            if let Some(note) = column.note {
                let _ = write!(line, " ({note})");
            }
            let _ = writeln!(text, "{line}");
        }
        text.push('\n');
    }

    if naming == ColumnNaming::QuotedCamelCase {
        let aliases = TABLES
            .iter()
            .map(|t| t.alias)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            text,
            "Column rules:\n\
             1. ALL column names MUST be wrapped in double quotes: \"columnName\"\n\
             2. Table names and table aliases ({aliases}) do NOT need quotes\n\
             3. With an alias, write alias.\"columnName\" (e.g. ed.\"totalAmount\")\n"
        );
    }

    let _ = writeln!(text, "Common query patterns:");
    for example in EXAMPLE_QUERIES {
        let _ = writeln!(
            text,
            "- {}: {}",
            example.label,
            render_template(example.template, naming)
        );
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_is_stable_across_calls() {
        let first = SchemaDescriptor::new(ColumnNaming::QuotedCamelCase).describe();
        let second = SchemaDescriptor::new(ColumnNaming::QuotedCamelCase).describe();
        assert_eq!(first, second);
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn quoted_convention_quotes_every_column() {
        let text = SchemaDescriptor::new(ColumnNaming::QuotedCamelCase).describe();
        assert!(text.contains("\"vendorName\": VARCHAR"));
        assert!(text.contains("SUM(\"totalAmount\") FROM extracted_data"));
        assert!(text.contains("(Foreign Key -> invoices.\"id\")"));
        assert!(!text.contains("vendor_name"));
    }

    #[test]
    fn snake_case_convention_uses_plain_identifiers() {
        let text = SchemaDescriptor::new(ColumnNaming::SnakeCase).describe();
        assert!(text.contains("vendor_name: VARCHAR"));
        assert!(text.contains("SUM(total_amount) FROM extracted_data"));
        assert!(text.contains("ed.invoice_id = i.id"));
        assert!(!text.contains('"'));
    }

    #[test]
    fn every_table_is_listed() {
        let descriptor = SchemaDescriptor::new(ColumnNaming::SnakeCase);
        let names: Vec<_> = descriptor.table_names().collect();
        assert_eq!(names, vec!["extracted_data", "invoices", "line_items"]);
        assert!(descriptor.has_table("INVOICES"));
        assert!(!descriptor.has_table("users"));
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("invoiceDate"), "invoice_date");
        assert_eq!(to_snake_case("id"), "id");
        assert_eq!(to_snake_case("unitPrice"), "unit_price");
    }
}
