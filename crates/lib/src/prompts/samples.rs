/// Example questions offered to clients as starting points.
pub const SAMPLE_QUESTIONS: &[&str] = &[
    "What is the total spend in the last 90 days?",
    "Show me top 5 vendors by spend",
    "List all invoices from October 2025",
    "What's the average invoice value?",
    "Show invoices grouped by category",
    "How many invoices are there in total?",
    "How many invoices have APPROVED or PAID status?",
    "List overdue invoices",
    "What's the total spend by vendor Phunix GmbH?",
    "Show all invoices above €1000",
    "What are the most recent 10 invoices?",
];
