use async_trait::async_trait;
use std::error::Error as StdError;
use serde::Deserialize;
use reqwest::Client as HttpClient;
use log::{ debug, info };

use super::{ ChatClient, CompletionResponse, ModelLister };
use crate::llm::{ normalize_model_name, LlmConfig, DEFAULT_CHAT_MODEL, GEMINI_BASE_URL };
use rllm::chat::{ ChatMessage, ChatRole, MessageType };
use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::LLMProvider;

const LIST_PAGE_SIZE: u32 = 50;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModel>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct GeminiModel {
    name: String,
}

// A candidate without text (e.g. blocked by safety filters) is a failed call.
fn reply_from_text(
    text: Option<String>
) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
    text
        .map(|response| CompletionResponse { response })
        .ok_or_else(|| "Gemini returned no text for this prompt (the candidate may have been blocked)".into())
}

/// Next page to request, or `None` once the listing is done. A token that
/// repeats the previous one ends the listing.
fn advance_page_token(previous: Option<&str>, next: Option<String>) -> Option<String> {
    match next {
        Some(token) if !token.is_empty() && previous != Some(token.as_str()) => Some(token),
        _ => None,
    }
}

pub struct GeminiChatClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model
            .as_deref()
            .map(normalize_model_name)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_CHAT_MODEL)
            .to_string();

        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(api_key.clone())
            .model(&chat_model)
            .stream(false);

        if let Some(url) = &base_url {
            builder = builder.base_url(url);
        }

        let llm_provider = builder.build()?;

        Ok(Self {
            llm: llm_provider,
            http: HttpClient::new(),
            api_key,
            model: chat_model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| "Google API key is required for GeminiChatClient (set GOOGLE_API_KEY)".to_string())?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }

    fn api_root(&self) -> &str {
        self.base_url.as_deref().unwrap_or(GEMINI_BASE_URL).trim_end_matches('/')
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            content: prompt.to_string(),
            message_type: MessageType::Text,
        }];
        info!(
            "GeminiChatClient::complete() → model={} base_url={:?}",
            self.model,
            self.base_url
        );
        let resp = self.llm.chat(&messages).await?;
        reply_from_text(resp.text().map(|s| s.to_string()))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        self.base_url.clone()
    }
}

#[async_trait]
impl ModelLister for GeminiChatClient {
    async fn list_models(&self) -> Result<Vec<String>, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/models", self.api_root());
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("key", self.api_key.clone()),
                ("pageSize", LIST_PAGE_SIZE.to_string())
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: ListModelsResponse = self.http
                .get(&url)
                .query(&query)
                .send().await?
                .error_for_status()?
                .json().await?;

            debug!("Fetched {} models (next page: {})", page.models.len(), page.next_page_token.is_some());
            names.extend(page.models.into_iter().map(|m| m.name));

            match advance_page_token(page_token.as_deref(), page.next_page_token) {
                Some(token) => {
                    page_token = Some(token);
                }
                None => {
                    break;
                }
            }
        }

        Ok(names)
    }
}
