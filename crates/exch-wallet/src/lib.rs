//! # exch-wallet
//! Loads the set of wallets an exchange node will match orders for.
//!
//! Real wallet connectors (signing, confirmation tracking) are treated as
//! black boxes outside this crate; `WalletRegistry` only answers "is this
//! currency enabled, and where do its outputs go".

pub mod error;
pub mod registry;

pub use error::WalletError;
pub use registry::{WalletEntry, WalletRegistry};
