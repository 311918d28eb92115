use dotenv::dotenv;
use std::error::Error;
use std::sync::Arc;
use log::error;
use travelbot::catalog::{ list_models, CatalogError, API_KEY_ENV };
use travelbot::llm::LlmConfig;
use travelbot::llm::chat::ModelLister;
use travelbot::llm::chat::gemini::GeminiChatClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Loading API Key...");
    dotenv().ok();
    let api_key = std::env::var(API_KEY_ENV).ok();
    let base_url = std::env::var("CHAT_BASE_URL").ok().filter(|u| !u.trim().is_empty());

    let result = list_models(api_key, |key| {
        let config = LlmConfig { api_key: Some(key), completion_model: None, base_url };
        let client = GeminiChatClient::from_config(&config)?;
        Ok(Arc::new(client) as Arc<dyn ModelLister>)
    }).await;

    match result {
        Ok(names) => {
            println!("\nAvailable Models:\n");
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        Err(e @ CatalogError::MissingCredential(_)) => {
            println!("❌ {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
