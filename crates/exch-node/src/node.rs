//! Server: accepts TCP connections, hands each to a round-robin worker pool
//! that builds a fresh [`Session`], and drives the 5-second heartbeat.

use std::sync::Arc;

use exch_core::exchange::Exchange;
use exch_core::types::NetworkId;
use exch_net::{Node, Overlay, Session};
use exch_wallet::WalletRegistry;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use crate::config::NodeConfig;

/// The external DHT transport this node is wired to. Sending and receiving
/// over the actual overlay is out of scope here; this is the seam a real
/// deployment plugs a DHT client into.
pub struct NullOverlay;

impl Overlay for NullOverlay {
    fn send(&self, dst: NetworkId, bytes: Vec<u8>) {
        warn!(%dst, len = bytes.len(), "no overlay transport configured, dropping unicast");
    }

    fn broadcast(&self, bytes: Vec<u8>) {
        warn!(len = bytes.len(), "no overlay transport configured, dropping broadcast");
    }
}

/// Operations an admin surface (CLI, HTTP, whatever replaces the source's
/// GUI signal layer) can invoke against a running node.
pub struct AdminInterface {
    node: Arc<Node>,
    exchange: Arc<Exchange>,
}

impl AdminInterface {
    pub fn new(node: Arc<Node>, exchange: Arc<Exchange>) -> Self {
        Self { node, exchange }
    }

    /// This node's 20-byte identity.
    pub fn on_generate_id(&self) -> NetworkId {
        self.node.my_id()
    }

    /// A snapshot of pending and active transaction ids, for diagnostics.
    pub fn on_dump_state(&self) -> (Vec<[u8; 32]>, Vec<[u8; 32]>) {
        let pending = self.exchange.pending_ids().into_iter().map(|id| *id.as_bytes()).collect();
        let active = self.exchange.active_ids().into_iter().map(|id| *id.as_bytes()).collect();
        (pending, active)
    }

    /// Look up a transaction's current state by id.
    pub fn on_search(&self, id: &exch_core::types::TxId) -> Option<exch_core::transaction::TransactionState> {
        self.exchange.transaction(id).map(|tx| tx.state)
    }

    /// Send raw bytes to `dst` through the node's routing rules.
    pub fn on_send(&self, dst: NetworkId, bytes: Vec<u8>) {
        self.node.send(dst, bytes);
    }
}

/// Composes [`Exchange`], [`WalletRegistry`], and [`Node`] into a running
/// TCP listener plus heartbeat timer.
pub struct Server {
    config: NodeConfig,
    node: Arc<Node>,
    exchange: Arc<Exchange>,
    wallets: Arc<WalletRegistry>,
}

impl Server {
    pub fn new(config: NodeConfig, my_id: NetworkId, overlay: Arc<dyn Overlay>, wallets: WalletRegistry) -> Self {
        let node = Arc::new(Node::new(my_id, overlay));
        Self { config, node, exchange: Arc::new(Exchange::new()), wallets: Arc::new(wallets) }
    }

    pub fn admin(&self) -> AdminInterface {
        AdminInterface::new(self.node.clone(), self.exchange.clone())
    }

    /// Bind the listener and run until `shutdown` resolves. Returns an error
    /// if the bind fails.
    pub async fn run(&self, mut shutdown: mpsc::Receiver<()>) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        info!(addr = %self.config.listen_addr(), "listening");

        let (worker_tx, workers) = self.spawn_workers();
        let mut next_worker = 0usize;
        let mut heartbeat = interval(Duration::from_secs(exch_core::constants::HEARTBEAT_INTERVAL_SECS));

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            info!(%peer, "accepted connection");
                            let worker = next_worker % worker_tx.len();
                            next_worker = next_worker.wrapping_add(1);
                            if worker_tx[worker].send(stream).await.is_err() {
                                error!("worker channel closed, dropping connection");
                            }
                        }
                        Err(e) => error!(error = %e, "accept failed"),
                    }
                }
                _ = heartbeat.tick() => {
                    self.node.on_send_list_of_wallets(&self.wallets);
                    let reaped = self.exchange.reap_expired();
                    if reaped > 0 {
                        info!(reaped, "expired pending orders reaped");
                    }
                }
                _ = shutdown.recv() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        drop(worker_tx);
        for worker in workers {
            let _ = worker.await;
        }
        Ok(())
    }

    /// Spawn `worker_count` tasks, each owning an inbound-socket channel and
    /// building a fresh [`Session`] per accepted connection it's handed.
    fn spawn_workers(&self) -> (Vec<mpsc::Sender<TcpStream>>, Vec<tokio::task::JoinHandle<()>>) {
        let mut senders = Vec::with_capacity(self.config.worker_count);
        let mut handles = Vec::with_capacity(self.config.worker_count);

        for id in 0..self.config.worker_count.max(1) {
            let (tx, mut rx) = mpsc::channel::<TcpStream>(32);
            let node = self.node.clone();
            let exchange = self.exchange.clone();
            let wallets = self.wallets.clone();

            let handle = tokio::spawn(async move {
                while let Some(stream) = rx.recv().await {
                    let session = Session::new(stream, node.clone(), exchange.clone(), wallets.clone());
                    tokio::spawn(session.run());
                }
                info!(worker = id, "worker pool shutting down");
            });

            senders.push(tx);
            handles.push(handle);
        }

        (senders, handles)
    }
}
