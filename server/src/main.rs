use std::{net::SocketAddr, sync::Arc};

use openai_core::{resolve_api_key, KeySource, OpenAiSpeechClient};
use tokio::net::TcpListener;
use tracing::{error, info};
use tts_core::{ArtifactStore, Synthesizer, TtsManager};

use server::{build_router, config::ServerConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting TTS server...");

    // Load configuration from environment
    let config = ServerConfig::from_env();
    info!(
        "Server configuration loaded: port={}, output_dir={}, max_chars_per_chunk={}, default_model={}",
        config.port,
        config.output_dir.display(),
        config.max_chars_per_chunk,
        config.default_model
    );

    let store = ArtifactStore::new(config.output_dir.clone());
    store.ensure_dir()?;

    let state = match resolve_api_key(&config.secrets_path) {
        Ok(key) => {
            let source = match key.source() {
                KeySource::Environment => "environment",
                KeySource::SecretsFile => "secrets file",
            };
            info!("Using OpenAI API key from {source}");
            let client = OpenAiSpeechClient::with_base_url(key, config.openai_base_url.clone());
            let synthesizer = Synthesizer::new(Arc::new(client));
            let tts = TtsManager::new(synthesizer, store, config.max_chars_per_chunk);
            AppState::ready(config.clone(), tts)
        }
        Err(e) => {
            error!("{e}. Generation is disabled until the key is configured.");
            AppState::unconfigured(config.clone(), store, e.to_string())
        }
    };

    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
