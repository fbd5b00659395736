//! Error types for the exchange coordinator core.
use thiserror::Error;

/// Errors raised while constructing or joining a [`crate::transaction::Transaction`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("order source and dest are the same peer")] SelfTrade,
    #[error("currency code longer than 8 bytes: {0}")] CurrencyTooLong(String),
    #[error("second member already set, transaction already joined")] AlreadyJoined,
}

/// Errors raised by the [`crate::exchange::Exchange`] matcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error(transparent)] Transaction(#[from] TransactionError),
    #[error("unknown transaction: {0}")] UnknownTransaction(String),
    #[error("wallet not enabled for currency: {0}")] UnknownWallet(String),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)] Transaction(#[from] TransactionError),
    #[error(transparent)] Exchange(#[from] ExchangeError),
}
