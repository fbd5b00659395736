//! The order-matching exchange: files pending orders, joins opposing
//! fingerprints, and tracks active (joined) swaps through their commit phases.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::ExchangeError;
use crate::transaction::{Transaction, TransactionState};
use crate::types::{NetworkId, TxId, WalletName};

/// Matches opposing orders by price fingerprint and tracks joined swaps.
///
/// Two independent locks, mirroring the two independent maps they guard:
/// a pending order never needs the active lock, and vice versa, so the two
/// never block each other's readers.
pub struct Exchange {
    pending: Mutex<HashMap<TxId, Transaction>>,
    pending_fingerprints: Mutex<HashMap<TxId, TxId>>,
    active: Mutex<HashMap<TxId, Transaction>>,
    seen_wallet_tx: Mutex<HashSet<TxId>>,
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            pending_fingerprints: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
            seen_wallet_tx: Mutex::new(HashSet::new()),
        }
    }

    /// File a new order and, if an opposing order is already pending under
    /// this order's reverse fingerprint, join the two immediately.
    ///
    /// `pending` is keyed by transaction id, so lookup and cancellation by id
    /// always work. `pending_fingerprints` is a separate index from price
    /// fingerprint (`hash1()`) to the id filed under it, used only to find a
    /// joinable counter-order; two orders with the same currencies and
    /// amounts both keep their own pending entry.
    pub fn create_transaction(
        &self,
        order_id: TxId,
        source: NetworkId,
        source_currency: WalletName,
        source_amount: u64,
        dest: NetworkId,
        dest_currency: WalletName,
        dest_amount: u64,
    ) -> Result<TxId, ExchangeError> {
        let mut incoming = Transaction::new(
            order_id,
            source,
            source_currency,
            source_amount,
            dest,
            dest_currency,
            dest_amount,
        )?;

        let probe_key = incoming.hash2();

        let mut pending = self.pending.lock();
        let mut fingerprints = self.pending_fingerprints.lock();
        if let Some(counter_id) = fingerprints.get(&probe_key).copied() {
            if let Some(counter) = pending.get(&counter_id) {
                if incoming.try_join(counter) {
                    pending.remove(&counter_id);
                    fingerprints.remove(&probe_key);
                    let joined_id = incoming.id;
                    debug!(%joined_id, %counter_id, "joined pending counter-order");
                    self.active.lock().insert(joined_id, incoming);
                    info!(%joined_id, "transaction joined");
                    return Ok(joined_id);
                }
            }
        }

        let filing_key = incoming.hash1();
        let id = incoming.id;
        fingerprints.insert(filing_key, id);
        pending.insert(id, incoming);
        debug!(%id, %filing_key, "filed new pending order");
        Ok(id)
    }

    /// Apply a `Hold` acknowledgement for `id`. Returns the resulting state,
    /// or `None` if `id` isn't an active joined transaction.
    pub fn update_transaction_when_hold_apply_received(&self, id: &TxId) -> Option<TransactionState> {
        self.bump(id, TransactionState::Joined)
    }

    /// Apply a `Pay` acknowledgement for `id`.
    pub fn update_transaction_when_pay_apply_received(&self, id: &TxId) -> Option<TransactionState> {
        self.bump(id, TransactionState::Hold)
    }

    /// Apply a `Commit` acknowledgement for `id`.
    pub fn update_transaction_when_commit_apply_received(&self, id: &TxId) -> Option<TransactionState> {
        self.bump(id, TransactionState::Paid)
    }

    fn bump(&self, id: &TxId, expected: TransactionState) -> Option<TransactionState> {
        let mut active = self.active.lock();
        let tx = active.get_mut(id)?;
        let result = tx.increase_state_counter(expected);
        if result == TransactionState::Invalid {
            warn!(%id, ?expected, actual = ?tx.state, "apply received out of phase");
        }
        Some(result)
    }

    /// Cancel an order or swap. Removes it from whichever map holds it and
    /// marks it `Dropped` rather than discarding it outright, so a late
    /// duplicate cancel or apply observes a terminal state instead of
    /// "unknown transaction".
    pub fn cancel_transaction(&self, id: &TxId) -> bool {
        if let Some(mut tx) = self.pending.lock().remove(id) {
            self.pending_fingerprints.lock().remove(&tx.hash1());
            tx.drop_transaction();
            self.active.lock().insert(*id, tx);
            return true;
        }
        let mut active = self.active.lock();
        if let Some(tx) = active.get_mut(id) {
            tx.drop_transaction();
            return true;
        }
        false
    }

    /// Look up a transaction by id in either map (active first, since
    /// lookups are far more frequent post-join than pre-join).
    pub fn transaction(&self, id: &TxId) -> Option<Transaction> {
        self.active
            .lock()
            .get(id)
            .cloned()
            .or_else(|| self.pending.lock().get(id).cloned())
    }

    /// Snapshot of every pending order id, for diagnostics.
    pub fn pending_ids(&self) -> Vec<TxId> {
        self.pending.lock().keys().copied().collect()
    }

    /// Snapshot of every active (joined-or-later) transaction id.
    pub fn active_ids(&self) -> Vec<TxId> {
        self.active.lock().keys().copied().collect()
    }

    /// Record a third-party chain confirmation. Advisory only: it has no
    /// effect on the swap state machine, just a fact the admin interface or
    /// a future reconciliation pass can query.
    pub fn update_transaction(&self, wallet_tx_hash: TxId) {
        self.seen_wallet_tx.lock().insert(wallet_tx_hash);
    }

    /// Whether a chain confirmation has been recorded for `hash`.
    pub fn has_seen_wallet_tx(&self, hash: &TxId) -> bool {
        self.seen_wallet_tx.lock().contains(hash)
    }

    /// Drop any pending order that has exceeded its filing timeout.
    /// Intended to be called periodically by the node's heartbeat.
    pub fn reap_expired(&self) -> usize {
        let mut pending = self.pending.lock();
        let mut fingerprints = self.pending_fingerprints.lock();
        let expired: Vec<TxId> = pending
            .iter()
            .filter(|(_, tx)| tx.is_expired())
            .map(|(k, _)| *k)
            .collect();
        for id in &expired {
            if let Some(tx) = pending.remove(id) {
                fingerprints.remove(&tx.hash1());
            }
        }
        expired.len()
    }
}
