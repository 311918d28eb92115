use std::sync::Arc;
use log::{ error, info };
use thiserror::Error;

use crate::config::prompt::build_prompt;
use crate::llm::chat::ChatClient;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{0}")]
    ExternalCallFailure(String),
}

impl PipelineError {
    pub fn detail(&self) -> &str {
        match self {
            PipelineError::ExternalCallFailure(msg) => msg,
        }
    }
}

/// Turns one user message into one provider call.
#[derive(Clone)]
pub struct CompletionPipeline {
    client: Arc<dyn ChatClient>,
    instructions: String,
}

impl CompletionPipeline {
    pub fn new(client: Arc<dyn ChatClient>, instructions: impl Into<String>) -> Self {
        Self { client, instructions: instructions.into() }
    }

    pub async fn complete(&self, user_text: &str) -> Result<String, PipelineError> {
        let prompt = build_prompt(&self.instructions, user_text);
        info!("Sending {} chars to model {}", prompt.len(), self.client.get_model());

        match self.client.complete(&prompt).await {
            Ok(resp) => Ok(resp.response),
            Err(e) => {
                error!("LLM interaction error: {}", e);
                Err(PipelineError::ExternalCallFailure(e.to_string()))
            }
        }
    }
}
