use std::error::Error;
use std::net::SocketAddr;
use axum::{
    routing::get,
    Router,
    extract::State,
    response::{ Html, IntoResponse },
};
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

use super::page::render_page;

#[derive(Clone)]
struct AppState {
    ws_port: u16,
}

pub fn router(ws_port: u16) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(AppState { ws_port })
}

pub async fn start_http_server(
    addr: &str,
    ws_port: u16,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
        e
    })?;
    info!("Chat page available on: http://{}", addr);

    let app = router(ws_port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            error!("HTTP server error: {}", e);
        }
    });

    Ok(())
}

async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(render_page(state.ws_port))
}

async fn health_handler() -> &'static str {
    "ok"
}
