//! Integration and adversarial test suite for the exchange coordinator.
//!
//! These tests drive real [`exch_net::Session`]s over loopback TCP sockets
//! against a shared [`exch_core::Exchange`], exercising the wire protocol
//! end to end rather than mocking it.

pub mod helpers;
