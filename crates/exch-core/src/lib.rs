//! # exch-core
//! Wire-independent domain types, the swap state machine, and the matcher
//! for the exchange coordinator.

pub mod constants;
pub mod error;
pub mod exchange;
pub mod transaction;
pub mod types;

pub use error::{CoreError, ExchangeError, TransactionError};
pub use exchange::Exchange;
pub use transaction::{Transaction, TransactionState};
pub use types::{NetworkId, OrderMember, TxId, WalletName};
