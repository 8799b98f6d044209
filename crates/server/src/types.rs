use askdb::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Echoed back unchanged; no conversation state is kept.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub sql: String,
    pub results: Vec<Row>,
    pub explanation: String,
    pub conversation_id: Option<String>,
    pub row_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct GenerateSqlRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateSqlResponse {
    pub query: String,
    pub sql: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SampleQueriesResponse {
    pub queries: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub service: String,
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub llm: String,
}
