use std::error::Error;
use std::sync::Arc;
use log::{ info, warn };

use crate::cli::Args;
use crate::config::prompt::{ GREETING, SYSTEM_PROMPT };
use crate::llm::LlmConfig;
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::models::chat::{ Session, Turn };
use crate::pipeline::{ CompletionPipeline, PipelineError };

/// Shared, read-only entry point for every connection. Sessions are owned
/// by the connection handlers and passed in per call.
#[derive(Clone)]
pub struct ChatAgent {
    pipeline: CompletionPipeline,
    greeting: String,
}

impl ChatAgent {
    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_config = LlmConfig::from_args(args);
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Model={}, BaseURL={:?}",
            chat_client.get_model(),
            chat_client.get_base_url().as_deref().unwrap_or("adapter default")
        );
        Ok(Self::with_client(chat_client))
    }

    pub fn with_client(client: Arc<dyn ChatClient>) -> Self {
        Self {
            pipeline: CompletionPipeline::new(client, SYSTEM_PROMPT),
            greeting: GREETING.to_string(),
        }
    }

    pub fn new_session(&self) -> Session {
        Session::new(&self.greeting)
    }

    /// One submission: the question and its reply (or error) are both
    /// recorded, so every call grows the session by two turns.
    pub async fn answer(
        &self,
        session: &mut Session,
        question: &str
    ) -> Result<String, PipelineError> {
        session.append(Turn::user(question));

        match self.pipeline.complete(question).await {
            Ok(reply) => {
                session.append(Turn::bot(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                warn!("Session {}: reply failed: {}", session.id(), e);
                session.append(Turn::bot(format!("Error: {}", e.detail())));
                Err(e)
            }
        }
    }
}
