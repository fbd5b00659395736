//! Node configuration for an exchange coordinator instance.
//!
//! Provides [`NodeConfig`] with defaults for the wallet config path and the
//! TCP listen address.

use std::path::PathBuf;

use exch_core::constants::DEFAULT_LISTEN_PORT;

/// Configuration for a running exchange node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Path to the INI wallet configuration (see §6 of the wire spec).
    pub wallets_path: PathBuf,
    /// IP address the TCP listener binds to.
    pub listen_bind: String,
    /// Port the TCP listener binds to.
    pub listen_port: u16,
    /// Number of session-accepting workers in the round-robin pool.
    pub worker_count: usize,
    /// Log level filter string (e.g. "info", "debug", "exch_node=trace").
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let wallets_path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("exch-node")
            .join("wallets.ini");

        Self {
            wallets_path,
            listen_bind: "0.0.0.0".to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            worker_count: 2,
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Socket address string for the TCP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_bind, self.listen_port)
    }
}
