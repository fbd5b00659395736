//! # exch-node: exchange coordinator composition root.
//!
//! Wires [`exch_core::Exchange`], [`exch_wallet::WalletRegistry`], and
//! [`exch_net::Node`] into a running [`node::Server`]:
//! - [`config::NodeConfig`]: listen address, wallet config path, worker count
//! - [`node::Server`]: TCP accept loop, worker pool, heartbeat
//! - [`node::AdminInterface`]: the headless operational event interface a
//!   desktop client's signal handlers would otherwise drive

pub mod config;
pub mod node;

pub use config::NodeConfig;
pub use node::{AdminInterface, NullOverlay, Server};
