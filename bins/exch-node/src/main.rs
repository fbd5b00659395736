//! Exchange coordinator node binary.
//!
//! Starts a TCP listener that frames inbound packets into sessions, matches
//! orders through the in-process exchange, and (if configured with wallets)
//! drives the four-phase swap commit protocol.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use exch_core::types::NetworkId;
use exch_node_lib::{NodeConfig, NullOverlay, Server};
use exch_wallet::WalletRegistry;
use tracing::{error, info};

/// Exchange coordinator, matches cross-asset swaps over a DHT overlay.
#[derive(Parser, Debug)]
#[command(name = "exch-node", version, about = "Exchange coordinator node")]
struct Args {
    /// Path to the wallet INI configuration. A node with no wallets loaded
    /// still relays and rebroadcasts, but never matches orders.
    #[arg(long)]
    wallets: Option<PathBuf>,

    /// TCP listen bind address.
    #[arg(long, default_value = "0.0.0.0")]
    listen_bind: String,

    /// TCP listen port.
    #[arg(long, default_value_t = exch_core::constants::DEFAULT_LISTEN_PORT)]
    listen_port: u16,

    /// Number of session-accepting workers in the round-robin pool.
    #[arg(long, default_value_t = 2)]
    workers: usize,

    /// This node's 20-byte identity, as 40 hex characters. Generated at
    /// random if omitted.
    #[arg(long)]
    node_id: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json").
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Args {
    fn into_config(&self) -> NodeConfig {
        let wallets_path = self.wallets.clone().unwrap_or_else(|| NodeConfig::default().wallets_path);
        NodeConfig {
            wallets_path,
            listen_bind: self.listen_bind.clone(),
            listen_port: self.listen_port,
            worker_count: self.workers,
            log_level: self.log_level.clone(),
        }
    }

    fn resolve_node_id(&self) -> Result<NetworkId, String> {
        match &self.node_id {
            Some(hex_str) => {
                let bytes = hex::decode(hex_str).map_err(|e| format!("--node-id is not valid hex: {e}"))?;
                NetworkId::from_slice(&bytes).ok_or_else(|| "--node-id must decode to 20 bytes".to_string())
            }
            None => {
                let mut bytes = [0u8; 20];
                rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
                Ok(NetworkId::from(bytes))
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    let my_id = match args.resolve_node_id() {
        Ok(id) => id,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let config = args.into_config();

    let wallets = if config.wallets_path.exists() {
        match WalletRegistry::load(&config.wallets_path) {
            Ok(w) => w,
            Err(e) => {
                error!(path = %config.wallets_path.display(), error = %e, "failed to load wallet configuration");
                process::exit(1);
            }
        }
    } else {
        info!(path = %config.wallets_path.display(), "no wallet configuration found, running relay-only");
        WalletRegistry::default()
    };

    info!(%my_id, listen = %config.listen_addr(), wallets_enabled = wallets.is_enabled(), "starting exchange node");

    let server = Server::new(config, my_id, Arc::new(NullOverlay), wallets);
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel(1);

    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
        let _ = shutdown_tx.send(()).await;
    };

    let run = server.run(shutdown_rx);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => {
            if let Err(e) = result {
                error!(error = %e, "listener bind failed");
                process::exit(2);
            }
        }
        _ = ctrl_c => {
            let _ = run.await;
        }
    }

    info!("exchange node shutdown complete");
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry().with(filter).with(fmt::layer().json()).init();
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(true).with_level(true)).init();
    }
}
