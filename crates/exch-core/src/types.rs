//! Core identifiers and order-member types for the exchange coordinator.

use std::fmt;

use crate::constants::{NETWORK_ID_SIZE, TX_ID_SIZE};

/// A 20-byte opaque peer/destination identity on the overlay.
///
/// Equality is byte-for-byte. Used both as a connecting peer's address and
/// as the destination field on every addressed wire packet.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NetworkId(pub [u8; NETWORK_ID_SIZE]);

impl NetworkId {
    /// The all-zero id, used as the "broadcast" destination sentinel.
    pub const EMPTY: Self = Self([0u8; NETWORK_ID_SIZE]);

    /// Build from a byte slice. Returns `None` if `bytes.len() != 20`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != NETWORK_ID_SIZE {
            return None;
        }
        let mut id = [0u8; NETWORK_ID_SIZE];
        id.copy_from_slice(bytes);
        Some(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; NETWORK_ID_SIZE] {
        &self.0
    }

    /// True iff this id is the all-zero sentinel (broadcast destination).
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; NETWORK_ID_SIZE]
    }
}

impl fmt::Debug for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkId({})", hex::encode(self.0))
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; NETWORK_ID_SIZE]> for NetworkId {
    fn from(bytes: [u8; NETWORK_ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for NetworkId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte identifier for transactions and for orders.
///
/// Used as a map key throughout the matcher; byte ordering carries no
/// meaning beyond equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxId(pub [u8; TX_ID_SIZE]);

impl TxId {
    pub const ZERO: Self = Self([0u8; TX_ID_SIZE]);

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != TX_ID_SIZE {
            return None;
        }
        let mut id = [0u8; TX_ID_SIZE];
        id.copy_from_slice(bytes);
        Some(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; TX_ID_SIZE] {
        &self.0
    }

    /// Hash of an arbitrary byte sequence into a `TxId`-width key.
    ///
    /// Used for price fingerprints (`hash1`/`hash2`), joined transaction
    /// ids, and the overlay's wire-bytes dedup key.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// `hash(a || b)`, used to derive a joined transaction's id from its
    /// two member order ids, first then other.
    pub fn hash_concat(a: &TxId, b: &TxId) -> Self {
        let mut buf = Vec::with_capacity(TX_ID_SIZE * 2);
        buf.extend_from_slice(&a.0);
        buf.extend_from_slice(&b.0);
        Self::hash(&buf)
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", hex::encode(self.0))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; TX_ID_SIZE]> for TxId {
    fn from(bytes: [u8; TX_ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for TxId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A short wallet key, e.g. `"BTC"`. Owned so it can be used as a hash-map
/// key without borrowing from the wallet registry.
pub type WalletName = String;

/// One side of a pending or joined order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderMember {
    /// The order's own id, as assigned by its originator.
    pub id: TxId,
    /// The originator's overlay address, funds come *from* this peer.
    pub source: Option<NetworkId>,
    /// Where the counterparty's output must be delivered.
    pub dest: Option<NetworkId>,
}

impl OrderMember {
    pub fn new(id: TxId) -> Self {
        Self { id, source: None, dest: None }
    }

    /// A member is complete iff both `source` and `dest` are set.
    pub fn is_complete(&self) -> bool {
        self.source.is_some() && self.dest.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_id_round_trip() {
        let bytes = [7u8; NETWORK_ID_SIZE];
        let id = NetworkId::from_slice(&bytes).unwrap();
        assert_eq!(id.as_bytes(), &bytes);
    }

    #[test]
    fn network_id_rejects_wrong_length() {
        assert!(NetworkId::from_slice(&[1, 2, 3]).is_none());
    }

    #[test]
    fn network_id_empty_is_zero() {
        assert!(NetworkId::EMPTY.is_empty());
        assert!(!NetworkId::from_slice(&[1u8; NETWORK_ID_SIZE]).unwrap().is_empty());
    }

    #[test]
    fn tx_id_hash_is_deterministic() {
        let a = TxId::hash(b"hello");
        let b = TxId::hash(b"hello");
        assert_eq!(a, b);
        assert_ne!(a, TxId::hash(b"world"));
    }

    #[test]
    fn tx_id_hash_concat_order_sensitive() {
        let a = TxId::from_slice(&[1u8; TX_ID_SIZE]).unwrap();
        let b = TxId::from_slice(&[2u8; TX_ID_SIZE]).unwrap();
        assert_ne!(TxId::hash_concat(&a, &b), TxId::hash_concat(&b, &a));
    }

    #[test]
    fn order_member_completeness() {
        let mut m = OrderMember::new(TxId::ZERO);
        assert!(!m.is_complete());
        m.source = Some(NetworkId::from_slice(&[1u8; NETWORK_ID_SIZE]).unwrap());
        assert!(!m.is_complete());
        m.dest = Some(NetworkId::from_slice(&[2u8; NETWORK_ID_SIZE]).unwrap());
        assert!(m.is_complete());
    }

    #[test]
    fn debug_and_display_are_hex() {
        let id = NetworkId::from_slice(&[0xAB; NETWORK_ID_SIZE]).unwrap();
        assert!(format!("{id:?}").contains("ab"));
        assert_eq!(id.to_string(), hex::encode([0xAB; NETWORK_ID_SIZE]));
    }
}
