//! Chat backend - conversational question answering over HTTP
//!
//! Stores conversations in SQLite and answers each question with a local
//! completion model, sending a bounded window of earlier turns as context.

mod api;
mod config;
mod db;
mod llm;
mod prompt;
mod runtime;
mod state_machine;
mod system_prompt;
mod title_generator;

use api::{create_router, AppState};
use config::Config;
use db::Database;
use llm::{LoggingService, OllamaService};
use runtime::TurnOrchestrator;
use std::net::SocketAddr;
use std::sync::Arc;
use system_prompt::SystemPrompt;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_backend=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration: refuses to start without base URL and model
    let config = Config::load()?;
    tracing::info!(
        base_url = %config.ollama.base_url,
        model = %config.ollama.model,
        port = config.server.port,
        "Configuration loaded"
    );

    // System instruction, read once
    let system_prompt = SystemPrompt::load(&config.server.prompt_path)?;

    // Ensure database directory exists
    if let Some(parent) = config.server.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Initialize database
    tracing::info!(path = %config.server.db_path.display(), "Opening database");
    let db = Database::open(&config.server.db_path)?;

    // Completion model
    let timeout = config.server.request_timeout();
    let ollama = OllamaService::new(&config.ollama.base_url, config.ollama.model.clone(), timeout)?;
    let llm = Arc::new(LoggingService::new(Arc::new(ollama)));

    // Create application state
    let orchestrator = TurnOrchestrator::new(db, llm, system_prompt, timeout);
    let state = AppState::new(orchestrator);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Chat backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
