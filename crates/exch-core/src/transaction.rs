//! The swap state machine: [`Transaction`] and its [`TransactionState`].
//!
//! Mirrors the four-phase commit described for the exchange coordinator:
//! `New -> Joined -> Hold -> Paid -> Finished`, with a `Dropped` sink state
//! reachable from cancellation or a reaper.

use std::time::Instant;

use crate::error::TransactionError;
use crate::types::{NetworkId, OrderMember, TxId, WalletName};

/// Lifecycle state of a [`Transaction`].
///
/// Ordered `Invalid < New < Joined < Hold < Paid < Finished`; `Dropped` is
/// absorbing and off that axis, it never compares as "greater" progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransactionState {
    Invalid,
    New,
    Joined,
    Hold,
    Paid,
    Finished,
    Dropped,
}

/// A matched or pending swap.
///
/// Invariants (see spec §3):
/// - `state == New` implies `second` is empty and `first` is complete.
/// - `state >= Joined` implies both members are complete and
///   `first.source != second.source`.
/// - `state_counter` resets to 0 on every promotion.
#[derive(Clone, Debug)]
pub struct Transaction {
    pub id: TxId,
    pub state: TransactionState,
    state_counter: u8,
    pub source_currency: WalletName,
    pub dest_currency: WalletName,
    pub source_amount: u64,
    pub dest_amount: u64,
    pub first: OrderMember,
    pub second: OrderMember,
    created_at: Instant,
}

impl Transaction {
    /// Construct a new pending order. Fails if the currency codes don't fit
    /// the wire's 8-byte field or the order trades with itself.
    pub fn new(
        order_id: TxId,
        source: NetworkId,
        source_currency: WalletName,
        source_amount: u64,
        dest: NetworkId,
        dest_currency: WalletName,
        dest_amount: u64,
    ) -> Result<Self, TransactionError> {
        if source_currency.len() > 8 {
            return Err(TransactionError::CurrencyTooLong(source_currency));
        }
        if dest_currency.len() > 8 {
            return Err(TransactionError::CurrencyTooLong(dest_currency));
        }
        if source == dest {
            return Err(TransactionError::SelfTrade);
        }

        let mut first = OrderMember::new(order_id);
        first.source = Some(source);
        first.dest = Some(dest);

        Ok(Self {
            id: order_id,
            state: TransactionState::New,
            state_counter: 0,
            source_currency,
            dest_currency,
            source_amount,
            dest_amount,
            first,
            second: OrderMember::default(),
            created_at: Instant::now(),
        })
    }

    /// The price fingerprint under which this order should be filed:
    /// `hash(src_ccy || src_amt || dst_ccy || dst_amt)`.
    pub fn hash1(&self) -> TxId {
        Self::fingerprint(
            &self.source_currency,
            self.source_amount,
            &self.dest_currency,
            self.dest_amount,
        )
    }

    /// The reverse fingerprint, i.e. the key a joinable counter-order would
    /// be filed under: `hash(dst_ccy || dst_amt || src_ccy || src_amt)`.
    pub fn hash2(&self) -> TxId {
        Self::fingerprint(
            &self.dest_currency,
            self.dest_amount,
            &self.source_currency,
            self.source_amount,
        )
    }

    fn fingerprint(ccy_a: &str, amt_a: u64, ccy_b: &str, amt_b: u64) -> TxId {
        let mut buf = Vec::with_capacity(8 + 8 + 8 + 8);
        buf.extend_from_slice(&pad_currency(ccy_a));
        buf.extend_from_slice(&amt_a.to_le_bytes());
        buf.extend_from_slice(&pad_currency(ccy_b));
        buf.extend_from_slice(&amt_b.to_le_bytes());
        TxId::hash(&buf)
    }

    /// Atomically bump the state counter if `self.state == expected`.
    ///
    /// Returns [`TransactionState::Invalid`] without mutation if the current
    /// state doesn't match `expected`. Otherwise increments the counter and,
    /// once it reaches 2, promotes to the next state per the fixed table
    /// `Joined -> Hold -> Paid -> Finished` and resets the counter to 0.
    pub fn increase_state_counter(&mut self, expected: TransactionState) -> TransactionState {
        let next = match expected {
            TransactionState::Joined => TransactionState::Hold,
            TransactionState::Hold => TransactionState::Paid,
            TransactionState::Paid => TransactionState::Finished,
            _ => return TransactionState::Invalid,
        };

        if self.state != expected {
            return TransactionState::Invalid;
        }

        self.state_counter += 1;
        if self.state_counter >= 2 {
            self.state = next;
            self.state_counter = 0;
        }
        self.state
    }

    /// Current value of the per-state acknowledgement counter (0 or 1
    /// immediately after any non-promoting call; 0 right after a promotion).
    pub fn state_counter(&self) -> u8 {
        self.state_counter
    }

    /// Attempt to join `other` into `self`. Both must be `New` and their
    /// currencies/amounts must mirror (see [`Self::hash1`]/[`Self::hash2`]).
    ///
    /// On success, `other.first` becomes `self.second`, `self.id` becomes
    /// `hash(self.id || other.id)`, and `self.state` becomes `Joined`.
    /// On failure, `self` is left untouched.
    pub fn try_join(&mut self, other: &Transaction) -> bool {
        if self.state != TransactionState::New || other.state != TransactionState::New {
            return false;
        }
        if self.source_currency != other.dest_currency || self.dest_currency != other.source_currency {
            return false;
        }
        if self.source_amount != other.dest_amount || self.dest_amount != other.source_amount {
            return false;
        }

        self.second = other.first.clone();
        self.id = TxId::hash_concat(&self.id, &other.id);
        self.state = TransactionState::Joined;
        self.state_counter = 0;
        true
    }

    /// Move this transaction to the absorbing `Dropped` state.
    pub fn drop_transaction(&mut self) {
        self.state = TransactionState::Dropped;
    }

    /// True once both counterparties are known, always true from `Joined`
    /// onward, and for the reference policy never true in `New`.
    pub fn is_complete(&self) -> bool {
        self.first.is_complete() && self.second.is_complete()
    }

    /// Pending `New` orders expire after
    /// [`PENDING_TRANSACTION_TIMEOUT_SECS`](crate::constants::PENDING_TRANSACTION_TIMEOUT_SECS).
    /// Post-join phases never expire here; an external reaper may call
    /// [`Self::drop_transaction`].
    pub fn is_expired(&self) -> bool {
        self.state == TransactionState::New
            && self.created_at.elapsed().as_secs() >= crate::constants::PENDING_TRANSACTION_TIMEOUT_SECS
    }
}

fn pad_currency(ccy: &str) -> [u8; 8] {
    let mut buf = [0u8; 8];
    let bytes = ccy.as_bytes();
    buf[..bytes.len()].copy_from_slice(bytes);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> NetworkId {
        NetworkId::from_slice(&[byte; 20]).unwrap()
    }

    fn order(byte: u8, src: &str, samt: u64, dst: &str, damt: u64) -> Transaction {
        Transaction::new(
            TxId::from_slice(&[byte; 32]).unwrap(),
            id(byte),
            src.to_string(),
            samt,
            id(byte + 1),
            dst.to_string(),
            damt,
        )
        .unwrap()
    }

    #[test]
    fn new_order_is_new_with_incomplete_second() {
        let t = order(1, "BTC", 100, "LTC", 500);
        assert_eq!(t.state, TransactionState::New);
        assert!(t.first.is_complete());
        assert!(!t.second.is_complete());
    }

    #[test]
    fn self_trade_rejected() {
        let addr = id(1);
        let err = Transaction::new(TxId::ZERO, addr, "BTC".into(), 1, addr, "LTC".into(), 1).unwrap_err();
        assert_eq!(err, TransactionError::SelfTrade);
    }

    #[test]
    fn currency_too_long_rejected() {
        let err = Transaction::new(
            TxId::ZERO,
            id(1),
            "TOOLONGCCY".into(),
            1,
            id(2),
            "LTC".into(),
            1,
        )
        .unwrap_err();
        assert!(matches!(err, TransactionError::CurrencyTooLong(_)));
    }

    #[test]
    fn hash1_hash2_are_mirror_images() {
        let a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 100);
        assert_eq!(a.hash1(), b.hash2());
        assert_eq!(b.hash1(), a.hash2());
    }

    #[test]
    fn unequal_amounts_are_not_mirror_images() {
        let a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 101);
        assert_ne!(a.hash1(), b.hash2());
    }

    #[test]
    fn try_join_succeeds_on_mirrored_orders() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 100);
        assert!(a.try_join(&b));
        assert_eq!(a.state, TransactionState::Joined);
        assert_eq!(a.id, TxId::hash_concat(&order(1, "BTC", 100, "LTC", 500).id, &b.id));
        assert!(a.is_complete());
    }

    #[test]
    fn try_join_fails_on_mismatched_amounts() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 101);
        assert!(!a.try_join(&b));
        assert_eq!(a.state, TransactionState::New);
        assert!(!a.second.is_complete());
    }

    #[test]
    fn try_join_fails_on_same_direction_duplicate() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "BTC", 100, "LTC", 500);
        assert!(!a.try_join(&b));
    }

    #[test]
    fn try_join_fails_unless_both_new() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 100);
        a.state = TransactionState::Joined;
        assert!(!a.try_join(&b));
    }

    #[test]
    fn increase_state_counter_promotes_after_two_acks() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 100);
        assert!(a.try_join(&b));

        assert_eq!(a.increase_state_counter(TransactionState::Joined), TransactionState::Joined);
        assert_eq!(a.state_counter(), 1);
        assert_eq!(a.increase_state_counter(TransactionState::Joined), TransactionState::Hold);
        assert_eq!(a.state_counter(), 0);
    }

    #[test]
    fn increase_state_counter_rejects_wrong_expected_state() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        assert_eq!(a.increase_state_counter(TransactionState::Joined), TransactionState::Invalid);
        assert_eq!(a.state, TransactionState::New);
    }

    #[test]
    fn increase_state_counter_full_chain_to_finished() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 100);
        assert!(a.try_join(&b));

        for expected in [TransactionState::Joined, TransactionState::Hold, TransactionState::Paid] {
            a.increase_state_counter(expected);
            a.increase_state_counter(expected);
        }
        assert_eq!(a.state, TransactionState::Finished);
    }

    #[test]
    fn duplicate_apply_in_same_phase_is_idempotent_after_promotion() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 100);
        assert!(a.try_join(&b));
        a.increase_state_counter(TransactionState::Joined);
        a.increase_state_counter(TransactionState::Joined);
        assert_eq!(a.state, TransactionState::Hold);

        // A resend of the old Joined-phase apply no longer matches `expected`.
        assert_eq!(a.increase_state_counter(TransactionState::Joined), TransactionState::Invalid);
        assert_eq!(a.state, TransactionState::Hold);
    }

    #[test]
    fn drop_is_absorbing() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        a.drop_transaction();
        assert_eq!(a.state, TransactionState::Dropped);
    }

    #[test]
    fn state_ordering_matches_lifecycle() {
        assert!(TransactionState::Invalid < TransactionState::New);
        assert!(TransactionState::New < TransactionState::Joined);
        assert!(TransactionState::Joined < TransactionState::Hold);
        assert!(TransactionState::Hold < TransactionState::Paid);
        assert!(TransactionState::Paid < TransactionState::Finished);
    }

    #[test]
    fn fresh_pending_transaction_is_not_expired() {
        let a = order(1, "BTC", 100, "LTC", 500);
        assert!(!a.is_expired());
    }

    #[test]
    fn joined_transaction_never_expires_here() {
        let mut a = order(1, "BTC", 100, "LTC", 500);
        let b = order(2, "LTC", 500, "BTC", 100);
        assert!(a.try_join(&b));
        assert!(!a.is_expired());
    }
}
