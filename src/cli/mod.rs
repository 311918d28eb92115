use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// API Key for the Google Gemini API.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name for chat completion (e.g., gemini-2.5-flash or models/gemini-2.5-flash)
    #[arg(long, env = "CHAT_MODEL", default_value = "gemini-2.5-flash")]
    pub chat_model: String,

    /// Base URL for the Gemini API. Leave unset to use the public endpoint.
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    // --- Server Args ---
    /// Host address and port for the chat page (HTTP).
    #[arg(long, env = "HTTP_ADDR", default_value = "127.0.0.1:8501")]
    pub http_addr: String,

    /// Host address and port for the WebSocket chat server.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,
}

impl Args {
    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.trim().is_empty())
    }

    /// Port the page's script should dial for the WebSocket.
    pub fn ws_port(&self) -> Option<u16> {
        self.server_addr.rsplit(':').next().and_then(|p| p.parse().ok())
    }
}
