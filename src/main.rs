//! Stubborn Chatbot - a debate service that picks a side and never gives in
//!
//! One HTTP endpoint takes a user message, commits the bot to a stance on the
//! first turn, and answers every later turn defending it.

mod api;
mod config;
mod conversation;
mod debate;
mod llm;
mod store;
#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use config::Config;
use debate::DebateService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
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
                .unwrap_or_else(|_| "stubborn_chatbot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let llm = llm::from_config(&config.llm)?;
    tracing::info!(model = %llm.model_id(), "Generation backend ready");

    let store = Arc::new(store::open(&config.storage).await);
    let debate = DebateService::new(llm, store.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(debate))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Stubborn chatbot listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let status = store.status();
    tracing::info!(
        configured = status.configured.as_str(),
        active = status.active.as_str(),
        fallback = status.fallback,
        in_memory_conversations = store.memory_conversations(),
        "Server stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
