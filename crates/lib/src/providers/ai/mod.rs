pub mod chat;
pub mod gemini;

use crate::{errors::PromptError, types::SamplingParams};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

pub use chat::ChatCompletionProvider;
pub use gemini::GeminiProvider;

/// A trait for interacting with an LLM completion endpoint.
///
/// The pipeline calls it twice per question: once to translate the question
/// into SQL and once to summarize the result.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    ///
    /// An empty `system_prompt` is not sent at all.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &SamplingParams,
    ) -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);
