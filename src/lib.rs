pub mod agent;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod server;

use agent::ChatAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("HTTP Address: {}", args.http_addr);
    info!("WebSocket Address: {}", args.server_addr);
    info!("Chat Model: {}", args.chat_model);
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("adapter default"));
    info!("API Key Present: {}", args.api_key().is_some());
    info!("-------------------------");

    let agent = Arc::new(ChatAgent::new(&args)?);
    let server = Server::new(agent, args);
    server.run().await?;

    Ok(())
}
