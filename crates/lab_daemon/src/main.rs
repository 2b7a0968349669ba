mod orchestrator;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use lab_assist::{Assistant, ChatCompletionClient};
use lab_world::{load_config, load_content, SnapshotStore};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::routes::make_router;
use crate::state::{AppState, LabSession};

#[derive(Parser)]
#[command(name = "lab_daemon", about = "Virtual chemistry lab workbench server")]
struct Cli {
    #[arg(long, default_value_t = 3001)]
    port: u16,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// JSON config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    /// Overrides `rng_seed` from the config file.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let content = load_content(&cli.content_dir)?;
    let cors_origin = HeaderValue::from_str(&cli.cors_origin)
        .with_context(|| format!("invalid CORS origin {}", cli.cors_origin))?;

    let snapshots = SnapshotStore::new(&config.data_dir);
    let lab_state = snapshots.load()?;
    if !lab_state.apparatus.is_empty() {
        info!(
            path = %snapshots.path().display(),
            apparatus = lab_state.apparatus.len(),
            "restored workspace"
        );
    }

    let seed = cli
        .seed
        .or(config.rng_seed)
        .unwrap_or_else(rand::random::<u64>);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let assistant_rng = ChaCha8Rng::seed_from_u64(rng.gen());

    let client = ChatCompletionClient::new(&config.service)
        .context("building completion service client")?;
    if config.service.api_key.is_none() {
        info!("no API key configured; using heuristic parsing and mock predictions");
    }

    let (event_tx, _) = tokio::sync::broadcast::channel(256);
    let app_state = AppState {
        lab: Arc::new(Mutex::new(LabSession {
            state: lab_state,
            rng,
        })),
        content: Arc::new(content),
        assistant: Arc::new(Assistant::new(client, assistant_rng)),
        event_tx,
        snapshots: Arc::new(snapshots),
    };

    let router = make_router(app_state, cors_origin);
    let addr = SocketAddr::from(([127, 0, 0, 1], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, seed, "lab_daemon listening");
    axum::serve(listener, router).await.context("serving http")?;
    Ok(())
}
