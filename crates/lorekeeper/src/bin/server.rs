//! Lorekeeper server binary
//!
//! Run with: cargo run -p lorekeeper --bin lorekeeper-server [config.toml]
//!
//! The configuration path may also be given in `LOREKEEPER_CONFIG`.

use std::path::PathBuf;

use lorekeeper::{config::LoreConfig, server::LoreServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lorekeeper=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LOREKEEPER_CONFIG").ok())
        .map(PathBuf::from);
    let config = LoreConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embeddings: {:?} ({} dims)", config.embeddings.backend, config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!("  - Index: {:?} collection '{}'", config.vector_db.backend, config.vector_db.collection);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.max_chars,
        config.chunking.overlap_chars
    );

    let server = LoreServer::new(config).await?;

    match server.state().llm().health_check().await {
        Ok(true) => tracing::info!("Ollama is running"),
        _ => {
            tracing::warn!("Ollama not available at {}", server.state().config().llm.base_url);
            tracing::warn!(
                "Start it with `ollama serve` and pull `{}`",
                server.state().config().llm.generate_model
            );
        }
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
