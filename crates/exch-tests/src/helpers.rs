//! Shared test harness: a real [`Session`] wired to loopback TCP sockets so
//! tests can write wire bytes as if they were a remote peer.

use std::sync::Arc;
use std::time::Duration;

use exch_core::exchange::Exchange;
use exch_core::types::NetworkId;
use exch_net::{Node, Overlay, Session};
use exch_wallet::WalletRegistry;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};

/// An [`Overlay`] that records every send/broadcast instead of delivering
/// it anywhere. The DHT transport is a separate concern entirely, so this
/// stands in for it at the boundary where a real coordinator would hand off
/// to one.
#[derive(Default)]
pub struct RecordingOverlay {
    sent: Mutex<Vec<(NetworkId, Vec<u8>)>>,
    broadcast: Mutex<Vec<Vec<u8>>>,
}

impl RecordingOverlay {
    pub fn sent_snapshot(&self) -> Vec<(NetworkId, Vec<u8>)> {
        self.sent.lock().clone()
    }

    pub fn broadcast_snapshot(&self) -> Vec<Vec<u8>> {
        self.broadcast.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcast.lock().len()
    }
}

impl Overlay for RecordingOverlay {
    fn send(&self, dst: NetworkId, bytes: Vec<u8>) {
        self.sent.lock().push((dst, bytes));
    }

    fn broadcast(&self, bytes: Vec<u8>) {
        self.broadcast.lock().push(bytes);
    }
}

/// A shared matcher node with its own exchange, wallet registry, and
/// recording overlay. Tests spin up one or more [`Self::connect_peer`]
/// sockets against it, each backed by an independent [`Session`] task.
pub struct Harness {
    pub node: Arc<Node>,
    pub exchange: Arc<Exchange>,
    pub wallets: Arc<WalletRegistry>,
    pub overlay: Arc<RecordingOverlay>,
}

impl Harness {
    pub fn new(my_id: NetworkId, wallets: WalletRegistry) -> Self {
        let overlay = Arc::new(RecordingOverlay::default());
        let dyn_overlay: Arc<dyn Overlay> = overlay.clone();
        let node = Arc::new(Node::new(my_id, dyn_overlay));
        Self { node, exchange: Arc::new(Exchange::new()), wallets: Arc::new(wallets), overlay }
    }

    /// Open a loopback TCP connection, hand the server half to a fresh
    /// [`Session`] sharing this harness's node/exchange/wallets, and return
    /// the client half for the test to act as the remote peer on.
    pub async fn connect_peer(&self) -> TcpStream {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let client = TcpStream::connect(addr).await.expect("connect to self");
        let (server, _) = listener.accept().await.expect("accept loopback connection");

        let session = Session::new(server, self.node.clone(), self.exchange.clone(), self.wallets.clone());
        tokio::spawn(session.run());

        client
    }
}

/// Poll `condition` until it returns `true` or `timeout` elapses, returning
/// whether it succeeded. Session dispatch happens on a spawned task, so
/// tests observe its effects asynchronously rather than synchronously.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let step = Duration::from_millis(5);
    let mut waited = Duration::ZERO;
    loop {
        if condition() {
            return true;
        }
        if waited >= timeout {
            return false;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
}

pub fn net_id(byte: u8) -> NetworkId {
    NetworkId::from_slice(&[byte; 20]).unwrap()
}

pub fn tx_id(byte: u8) -> exch_core::types::TxId {
    exch_core::types::TxId::from_slice(&[byte; 32]).unwrap()
}

/// A `[Main] ExchangeWallets = BTC,LTC` registry with 20-byte addresses
/// derived from a fixed seed byte per currency, for tests that need a
/// matcher with both legs of a swap enabled.
pub fn btc_ltc_wallets() -> WalletRegistry {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;

    let btc_addr = BASE64.encode([0xB0; 20]);
    let ltc_addr = BASE64.encode([0xC0; 20]);
    let ini = format!(
        "[Main]\nExchangeWallets = BTC,LTC\n\n[BTC]\nTitle = Bitcoin\nAddress = {btc_addr}\n\n[LTC]\nTitle = Litecoin\nAddress = {ltc_addr}\n"
    );
    WalletRegistry::from_ini_str(&ini).expect("valid test wallet config")
}
