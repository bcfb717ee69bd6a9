//! arena-server - websocket battle server entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arena_server::{ArenaServer, HttpStore, InventoryStore, MemoryStore, RosterStore, ServerConfig};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "arena-server", about = "Real-time creature battle server")]
struct Args {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(long)]
    bind: Option<String>,

    /// Fixed RNG seed for reproducible battles
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arena_server=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }

    let (roster, inventory): (Arc<dyn RosterStore>, Arc<dyn InventoryStore>) =
        match &config.store_url {
            Some(url) => {
                let store = Arc::new(HttpStore::new(url)?);
                let roster: Arc<dyn RosterStore> = store.clone();
                let inventory: Arc<dyn InventoryStore> = store;
                (roster, inventory)
            }
            None => {
                tracing::warn!("No store_url configured, using in-memory rosters");
                let store = Arc::new(MemoryStore::new());
                let roster: Arc<dyn RosterStore> = store.clone();
                let inventory: Arc<dyn InventoryStore> = store;
                (roster, inventory)
            }
        };

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    let server = Arc::new(ArenaServer::open(config, roster, inventory));
    tracing::info!(addr = %server.config().bind_addr, "Listening");

    tokio::select! {
        result = arena_server::connection::serve(Arc::clone(&server), listener) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    server.close();
    Ok(())
}
