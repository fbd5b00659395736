//! The external DHT transport this crate delegates real delivery to.
//!
//! Implementing the overlay itself is out of scope: a production deployment
//! backs this trait with the DHT client, while tests back it with a
//! loopback relay between in-process nodes.

use exch_core::types::NetworkId;

/// Abstracts the overlay network a [`crate::node::Node`] sends through.
///
/// Plain (non-async) methods by design, mirroring how the rest of this
/// crate bridges a synchronous domain to an async transport: an
/// implementation that actually talks to a network spawns its own tasks and
/// treats these calls as fire-and-forget sends into that machinery.
pub trait Overlay: Send + Sync {
    /// Unicast `bytes` to `dst` via the overlay.
    fn send(&self, dst: NetworkId, bytes: Vec<u8>);
    /// Fan out `bytes` to every peer the overlay currently knows about.
    fn broadcast(&self, bytes: Vec<u8>);
}
