//! Protocol constants for the exchange coordinator wire format and matcher.

/// Length in bytes of a [`crate::types::NetworkId`].
pub const NETWORK_ID_SIZE: usize = 20;

/// Length in bytes of a [`crate::types::TxId`].
pub const TX_ID_SIZE: usize = 32;

/// Fixed width, NUL-padded, of a currency code field on the wire.
pub const CURRENCY_FIELD_SIZE: usize = 8;

/// TCP port the coordinator listens on for peer sessions.
pub const DEFAULT_LISTEN_PORT: u16 = 30330;

/// Heartbeat period: how often the node re-broadcasts its wallet list.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// Seconds after which a pending (unmatched) `New` transaction expires.
pub const PENDING_TRANSACTION_TIMEOUT_SECS: u64 = 30;

/// Maximum packet body length accepted off the wire (sanity cap).
pub const MAX_PACKET_BODY_SIZE: u32 = 1 << 24;

/// Capacity of the overlay message dedup cache, FIFO eviction beyond this.
pub const DEDUP_CACHE_CAPACITY: usize = 65_536;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_wire_layout() {
        assert_eq!(NETWORK_ID_SIZE, 20);
        assert_eq!(TX_ID_SIZE, 32);
        assert_eq!(CURRENCY_FIELD_SIZE, 8);
    }

    #[test]
    fn default_port_is_30330() {
        assert_eq!(DEFAULT_LISTEN_PORT, 30330);
    }
}
