mod config;
mod error;
mod handlers;
mod models;
mod server;
mod services;

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use config::AppConfig;
use handlers::EnrichmentHandler;
use server::{create_router, AppState};
use services::RecipeCorpus;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    log::info!("🚀 Starting FlavorAI enrichment server...");

    let config = AppConfig::from_env()?;

    if let Err(e) = config.require_text_provider() {
        log::warn!("⚠️ {}: every request will use local estimates", e);
    }

    let corpus = RecipeCorpus::load(&config.recipe_data_path);
    if corpus.is_empty() {
        log::warn!("⚠️ Recipe corpus is empty, search will return nothing");
    } else {
        log::info!("✅ Recipe corpus ready ({} recipes)", corpus.len());
    }

    let enrichment = Arc::new(EnrichmentHandler::from_config(&config));
    let state = Arc::new(AppState::new(corpus, enrichment));
    let app = create_router(state, config.cors_allow_origin.as_deref());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    log::info!("🌐 Server listening on http://{}", config.bind_addr);

    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    log::info!("🎉 Ready!");

    tokio::select! {
        result = server => {
            result.context("server task panicked")?.context("server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("🛑 Shutting down...");
        }
    }

    Ok(())
}
