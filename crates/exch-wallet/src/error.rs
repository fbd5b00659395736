//! Wallet registry error types.

use thiserror::Error;

/// Errors raised while loading or querying the [`crate::registry::WalletRegistry`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("no [Main] section in wallet configuration")]
    MissingMainSection,

    #[error("wallet {0} has no Title/Address section")]
    MissingSection(String),

    #[error("wallet {0} address is not valid base64: {1}")]
    InvalidBase64(String, String),

    #[error("wallet {0} address decodes to {1} bytes, want 20")]
    WrongAddressLength(String, usize),

    #[error("unknown wallet: {0}")]
    UnknownWallet(String),

    #[error("configuration error: {0}")]
    Config(String),
}
