//! Loads the set of enabled wallets from a config file.

use std::collections::BTreeMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use config::{Config, File, FileFormat};
use exch_core::types::{NetworkId, WalletName};
use tracing::warn;

use crate::error::WalletError;

/// A single configured wallet: its display title and 20-byte exchange address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletEntry {
    pub title: String,
    pub address: NetworkId,
}

/// The set of wallets this node will match and settle orders for.
///
/// Built once at startup from `[Main] ExchangeWallets = BTC,LTC,...` plus a
/// `[BTC] Title=... Address=...` section per name. A wallet whose section is
/// missing or whose address doesn't decode to exactly 20 bytes is skipped,
/// not fatal, other wallets still load.
#[derive(Debug, Default)]
pub struct WalletRegistry {
    wallets: BTreeMap<WalletName, WalletEntry>,
}

impl WalletRegistry {
    /// Load from an INI-style file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path_str = path.as_ref().to_string_lossy().into_owned();
        let cfg = Config::builder()
            .add_source(File::new(&path_str, FileFormat::Ini))
            .build()
            .map_err(|e| WalletError::Config(e.to_string()))?;
        Self::from_config(&cfg)
    }

    /// Parse directly from INI text, primarily for tests.
    pub fn from_ini_str(text: &str) -> Result<Self, WalletError> {
        let cfg = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()
            .map_err(|e| WalletError::Config(e.to_string()))?;
        Self::from_config(&cfg)
    }

    fn from_config(cfg: &Config) -> Result<Self, WalletError> {
        let names_raw = cfg
            .get_string("Main.ExchangeWallets")
            .map_err(|_| WalletError::MissingMainSection)?;

        let mut wallets = BTreeMap::new();
        for name in split_wallet_names(&names_raw) {
            let Ok(address_b64) = cfg.get_string(&format!("{name}.Address")) else {
                warn!(wallet = %name, "no Title/Address section, skipping");
                continue;
            };
            let title = cfg
                .get_string(&format!("{name}.Title"))
                .unwrap_or_else(|_| name.clone());

            let raw = match BASE64.decode(address_b64.trim()) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(wallet = %name, error = %e, "address is not valid base64, skipping");
                    continue;
                }
            };
            let Some(address) = NetworkId::from_slice(&raw) else {
                warn!(wallet = %name, len = raw.len(), "address has wrong length, skipping");
                continue;
            };

            wallets.insert(name.clone(), WalletEntry { title, address });
        }

        Ok(Self { wallets })
    }

    /// True once at least one wallet has loaded successfully.
    pub fn is_enabled(&self) -> bool {
        !self.wallets.is_empty()
    }

    pub fn has_wallet(&self, name: &str) -> bool {
        self.wallets.contains_key(name)
    }

    pub fn address(&self, name: &str) -> Result<NetworkId, WalletError> {
        self.wallets
            .get(name)
            .map(|entry| entry.address)
            .ok_or_else(|| WalletError::UnknownWallet(name.to_string()))
    }

    /// `(name, title)` pairs for every loaded wallet, in name order, backs
    /// the periodic wallet-list broadcast.
    pub fn list(&self) -> Vec<(WalletName, String)> {
        self.wallets
            .iter()
            .map(|(name, entry)| (name.clone(), entry.title.clone()))
            .collect()
    }
}

fn split_wallet_names(raw: &str) -> Vec<String> {
    raw.split([',', ';', ':'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
