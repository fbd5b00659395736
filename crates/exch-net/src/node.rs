//! Process-wide singleton: identity, the local session table, and the
//! dedup cache that guards against re-processing the same overlay message.

use std::sync::Arc;

use dashmap::DashMap;
use exch_core::types::NetworkId;
use exch_wallet::WalletRegistry;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::dedup::DedupCache;
use crate::overlay::Overlay;
use crate::packet::{Command, Packet};
use crate::payload::WalletList;

const DEDUP_CACHE_CAPACITY: usize = exch_core::constants::DEDUP_CACHE_CAPACITY;

/// Owns this process's identity, the map from address to locally-reachable
/// session inbox, and the overlay handle used to reach everything else.
pub struct Node {
    my_id: NetworkId,
    sessions: DashMap<NetworkId, UnboundedSender<Vec<u8>>>,
    dedup: Mutex<DedupCache>,
    overlay: Arc<dyn Overlay>,
}

impl Node {
    pub fn new(my_id: NetworkId, overlay: Arc<dyn Overlay>) -> Self {
        Self {
            my_id,
            sessions: DashMap::new(),
            dedup: Mutex::new(DedupCache::new(DEDUP_CACHE_CAPACITY)),
            overlay,
        }
    }

    pub fn my_id(&self) -> NetworkId {
        self.my_id
    }

    /// Unicast `bytes` to `dst`: broadcast if `dst` is empty, loop back
    /// locally if `dst == my_id`, deliver directly if `dst` is a peer
    /// registered via `storage_store` (e.g. it announced itself on another
    /// session of this same node), otherwise hand off to the overlay.
    pub fn send(&self, dst: NetworkId, bytes: Vec<u8>) {
        if dst.is_empty() {
            self.broadcast(bytes);
        } else if dst == self.my_id {
            self.dispatch_local(&bytes);
        } else if let Some(inbox) = self.sessions.get(&dst) {
            let _ = inbox.send(bytes);
        } else {
            self.overlay.send(dst, bytes);
        }
    }

    /// Fan out to every overlay peer known by the DHT.
    pub fn broadcast(&self, bytes: Vec<u8>) {
        self.overlay.broadcast(bytes);
    }

    /// Inbound unicast from the overlay, addressed to `dst`.
    pub fn on_message_received(&self, dst: NetworkId, bytes: Vec<u8>) {
        if !self.dedup.lock().check_and_insert(&bytes) {
            trace!(%dst, "dropping duplicate overlay message");
            return;
        }
        if dst == self.my_id {
            self.dispatch_local(&bytes);
        } else if let Some(inbox) = self.sessions.get(&dst) {
            let _ = inbox.send(bytes);
        } else {
            self.overlay.send(dst, bytes);
        }
    }

    /// Inbound broadcast from the overlay, always dispatched as if
    /// addressed to `my_id`.
    pub fn on_broadcast_received(&self, bytes: Vec<u8>) {
        if !self.dedup.lock().check_and_insert(&bytes) {
            trace!("dropping duplicate broadcast");
            return;
        }
        self.dispatch_local(&bytes);
    }

    fn dispatch_local(&self, bytes: &[u8]) {
        for entry in self.sessions.iter() {
            let _ = entry.value().send(bytes.to_vec());
        }
    }

    /// Register `addr` as reachable through `inbox`, used by the session
    /// handling `AnnounceAddresses` for that peer.
    pub fn storage_store(&self, addr: NetworkId, inbox: UnboundedSender<Vec<u8>>) {
        debug!(%addr, "registering address");
        self.sessions.insert(addr, inbox);
    }

    /// Remove every mapping a closing session had registered.
    pub fn storage_clean(&self, addrs: &[NetworkId]) {
        for addr in addrs {
            debug!(%addr, "removing address");
            self.sessions.remove(addr);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Every `HEARTBEAT_INTERVAL_SECS`, if any wallet is enabled, broadcast
    /// a `WalletList` packet describing this node's tradeable currencies.
    pub fn on_send_list_of_wallets(&self, wallets: &WalletRegistry) {
        if !wallets.is_enabled() {
            return;
        }
        let list = WalletList { entries: wallets.list() };
        let packet = Packet::with_body(Command::WalletList, list.encode());
        self.broadcast(packet.to_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct RecordingOverlay {
        sent: StdMutex<Vec<(NetworkId, Vec<u8>)>>,
        broadcast: StdMutex<Vec<Vec<u8>>>,
    }

    impl RecordingOverlay {
        fn new() -> Self {
            Self { sent: StdMutex::new(Vec::new()), broadcast: StdMutex::new(Vec::new()) }
        }
    }

    impl Overlay for RecordingOverlay {
        fn send(&self, dst: NetworkId, bytes: Vec<u8>) {
            self.sent.lock().unwrap().push((dst, bytes));
        }
        fn broadcast(&self, bytes: Vec<u8>) {
            self.broadcast.lock().unwrap().push(bytes);
        }
    }

    fn id(b: u8) -> NetworkId {
        NetworkId::from_slice(&[b; 20]).unwrap()
    }

    #[test]
    fn send_to_self_loops_back_to_registered_sessions() {
        let overlay = Arc::new(RecordingOverlay::new());
        let node = Node::new(id(1), overlay.clone());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        node.storage_store(id(1), tx);

        node.send(id(1), b"hello".to_vec());

        assert!(overlay.sent.lock().unwrap().is_empty());
        assert_eq!(rx.try_recv().unwrap(), b"hello".to_vec());
    }

    #[test]
    fn send_to_remote_goes_via_overlay() {
        let overlay = Arc::new(RecordingOverlay::new());
        let node = Node::new(id(1), overlay.clone());

        node.send(id(2), b"hi".to_vec());

        assert_eq!(overlay.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn send_to_empty_broadcasts() {
        let overlay = Arc::new(RecordingOverlay::new());
        let node = Node::new(id(1), overlay.clone());

        node.send(NetworkId::EMPTY, b"x".to_vec());

        assert_eq!(overlay.broadcast.lock().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_message_is_dropped() {
        let overlay = Arc::new(RecordingOverlay::new());
        let node = Node::new(id(1), overlay.clone());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        node.storage_store(id(1), tx);

        node.on_message_received(id(1), b"payload".to_vec());
        node.on_message_received(id(1), b"payload".to_vec());

        assert_eq!(rx.try_recv().unwrap(), b"payload".to_vec());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn storage_clean_removes_mapping() {
        let overlay = Arc::new(RecordingOverlay::new());
        let node = Node::new(id(1), overlay);
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        node.storage_store(id(2), tx);
        assert_eq!(node.session_count(), 1);

        node.storage_clean(&[id(2)]);
        assert_eq!(node.session_count(), 0);
    }

    #[test]
    fn wallet_list_not_broadcast_when_disabled() {
        let overlay = Arc::new(RecordingOverlay::new());
        let node = Node::new(id(1), overlay.clone());
        let wallets = WalletRegistry::default();

        node.on_send_list_of_wallets(&wallets);

        assert!(overlay.broadcast.lock().unwrap().is_empty());
    }
}
