//! # Natural Language to SQL
//!
//! This crate turns an English question about the invoice database into a
//! read-only SQL query using a configurable AI provider, runs the query
//! against a storage provider, and summarizes the result in a sentence.
//!
//! The pipeline is strictly linear: generate, validate, execute, explain.
//! Generation, validation and execution failures short-circuit `ask`; an
//! explanation failure falls back to a templated sentence.

pub mod errors;
pub mod prompts;
pub mod providers;
pub mod schema;
pub mod sql;
pub mod types;

pub use errors::{ErrorKind, PromptError};
pub use providers::factory::{create_ai_provider, create_storage_provider};
pub use schema::{ColumnNaming, SchemaDescriptor};
pub use types::{
    PipelineResult, PromptClient, PromptClientBuilder, ProviderConfig, QueryAnswer, QueryFailure,
    QueryResult, Row, SamplingParams,
};

use crate::prompts::{
    explanation_fallback, naming_rules, EXPLANATION_SYSTEM_PROMPT, EXPLANATION_USER_PROMPT,
    SQL_GENERATION_SYSTEM_PROMPT, SQL_GENERATION_USER_PROMPT,
};
use crate::sql::{clean_llm_sql, ensure_read_only};
use tracing::{debug, error, info, warn};

impl PromptClient {
    /// The schema descriptor matching this client's column naming convention.
    pub fn schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::new(self.column_naming)
    }

    /// Translates a question into a single SQL statement.
    ///
    /// The statement is cleaned of markdown fences but neither validated nor
    /// executed. Fails with `PromptError::EmptyQuery` when nothing is left
    /// after cleanup.
    pub async fn generate_sql(&self, question: &str) -> Result<String, PromptError> {
        info!("[generate_sql] received question: {question:?}");
        let dialect = self.storage_provider.dialect();

        let system_prompt = SQL_GENERATION_SYSTEM_PROMPT.replace("{dialect}", dialect);
        let user_prompt = SQL_GENERATION_USER_PROMPT
            .replace("{schema}", self.schema().describe())
            .replace("{naming_rules}", naming_rules(self.column_naming))
            .replace("{dialect}", dialect)
            .replace("{question}", question);

        debug!(system_prompt = %system_prompt, user_prompt = %user_prompt, "--> Sending prompts to AI Provider");

        let raw_response = self
            .ai_provider
            .generate(&system_prompt, &user_prompt, &self.generation_params)
            .await?;

        debug!("<-- SQL from AI: {}", &raw_response);

        let sql = clean_llm_sql(&raw_response);
        if sql.is_empty() {
            return Err(PromptError::EmptyQuery(question.to_string()));
        }
        Ok(sql)
    }

    /// Executes a statement against the storage provider.
    pub async fn run_sql(&self, sql: &str) -> Result<QueryResult, PromptError> {
        info!("[run_sql] executing on {}", self.storage_provider.name());
        let result = self.storage_provider.execute_query(sql).await?;
        debug!(row_count = result.row_count, "<-- Query returned");
        Ok(result)
    }

    /// Executes a statement in a read-only session where the provider has one.
    pub async fn run_read_only_sql(&self, sql: &str) -> Result<QueryResult, PromptError> {
        info!(
            "[run_read_only_sql] executing on {}",
            self.storage_provider.name()
        );
        let result = self.storage_provider.execute_read_only(sql).await?;
        debug!(row_count = result.row_count, "<-- Query returned");
        Ok(result)
    }

    /// Summarizes a result in a couple of sentences.
    ///
    /// Never fails: any provider error is logged and replaced with
    /// `explanation_fallback`.
    pub async fn explain(&self, question: &str, sql: &str, result: &QueryResult) -> String {
        let user_prompt = EXPLANATION_USER_PROMPT
            .replace("{question}", question)
            .replace("{sql}", sql)
            .replace("{row_count}", &result.row_count.to_string());

        match self
            .ai_provider
            .generate(
                EXPLANATION_SYSTEM_PROMPT,
                &user_prompt,
                &self.explanation_params,
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("[explain] AI provider returned an empty explanation; using fallback");
                explanation_fallback(result.row_count)
            }
            Err(e) => {
                warn!("[explain] explanation failed, using fallback: {e}");
                explanation_fallback(result.row_count)
            }
        }
    }

    /// Answers a question end to end.
    ///
    /// Runs generation, the read-only guard (unless disabled), execution and
    /// explanation in order. With the guard enabled the statement also runs
    /// through `execute_read_only`. The first failing stage ends the pipeline
    /// and yields `PipelineResult::Failure`.
    pub async fn ask(&self, question: &str) -> PipelineResult {
        info!("[ask] processing question: {question:?}");

        let sql = match self.generate_sql(question).await {
            Ok(sql) => sql,
            Err(e) => {
                error!("[ask] SQL generation failed: {e}");
                return PipelineResult::failed(question, e);
            }
        };

        if self.enforce_read_only {
            let dialect = self.storage_provider.dialect();
            if let Err(e) = ensure_read_only(&sql, &self.schema(), dialect) {
                error!(sql = %sql, "[ask] generated SQL rejected: {e}");
                return PipelineResult::failed(question, e);
            }
        }

        let executed = if self.enforce_read_only {
            self.run_read_only_sql(&sql).await
        } else {
            self.run_sql(&sql).await
        };
        let result = match executed {
            Ok(result) => result,
            Err(e) => {
                error!(sql = %sql, "[ask] query execution failed: {e}");
                return PipelineResult::failed(question, e);
            }
        };

        let explanation = self.explain(question, &sql, &result).await;

        PipelineResult::Success(QueryAnswer {
            question: question.to_string(),
            sql,
            row_count: result.row_count,
            rows: result.rows,
            columns: result.columns,
            explanation,
        })
    }
}
