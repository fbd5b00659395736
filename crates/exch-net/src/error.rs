//! Session and node error types.

use thiserror::Error;

/// Errors raised while servicing a single connection.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed header: body length exceeds the sanity cap")]
    OversizedBody,

    #[error("malformed body for command {command:?}: expected a fixed layout, got {len} bytes")]
    MalformedBody { command: u32, len: usize },
}
