pub mod api;
pub mod page;
pub mod websocket;

use crate::agent::ChatAgent;
use crate::cli::Args;
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    agent: Arc<ChatAgent>,
    args: Args,
}

impl Server {
    pub fn new(agent: Arc<ChatAgent>, args: Args) -> Self {
        Self { agent, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let ws_port = self.args
            .ws_port()
            .ok_or_else(|| format!("SERVER_ADDR '{}' has no port", self.args.server_addr))?;

        api::start_http_server(&self.args.http_addr, ws_port).await?;
        websocket::start_ws_server(&self.args.server_addr, self.agent.clone()).await
    }
}
