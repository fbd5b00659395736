//! Per-connection actor: reads packets off a socket, dispatches them
//! against the matcher, and writes back whatever the Node routes to it.

use std::sync::Arc;

use exch_core::exchange::Exchange;
use exch_core::transaction::TransactionState;
use exch_core::types::{NetworkId, TxId};
use exch_wallet::WalletRegistry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::node::Node;
use crate::packet::{Command, Packet};
use crate::payload::{
    AnnounceAddresses, DstTxApply, ReceivedTransaction, TransactionCancel, TransactionCommit,
    TransactionHold, TransactionOrder, TransactionPay, TransactionPayApply,
};

/// A single peer connection. Lives for the lifetime of the socket; on close
/// it deregisters every address it had announced to [`Node`].
pub struct Session {
    stream: TcpStream,
    node: Arc<Node>,
    exchange: Arc<Exchange>,
    wallets: Arc<WalletRegistry>,
    inbox_tx: UnboundedSender<Vec<u8>>,
    inbox_rx: UnboundedReceiver<Vec<u8>>,
    registered: Vec<NetworkId>,
}

impl Session {
    pub fn new(stream: TcpStream, node: Arc<Node>, exchange: Arc<Exchange>, wallets: Arc<WalletRegistry>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self { stream, node, exchange, wallets, inbox_tx, inbox_rx, registered: Vec::new() }
    }

    /// Drive the session until the socket closes or a malformed frame is
    /// seen. Errors are logged and end the loop; nothing propagates past
    /// [`Self::run`] since there's no caller left to hand it to once the
    /// socket is gone.
    pub async fn run(mut self) {
        let peer = self.stream.peer_addr().ok();
        loop {
            tokio::select! {
                header = read_header(&mut self.stream) => {
                    match header {
                        Ok(Some((command, body_len))) => {
                            match read_body(&mut self.stream, body_len).await {
                                Ok(body) => {
                                    let packet = Packet::with_body(command, body).decrypt();
                                    if let Err(e) = self.dispatch(packet).await {
                                        debug!(?peer, error = %e, "dispatch error, closing session");
                                        break;
                                    }
                                }
                                Err(e) => {
                                    let e = SessionError::Io(e);
                                    debug!(?peer, error = %e, "read error, closing session");
                                    break;
                                }
                            }
                        }
                        Ok(None) => {
                            warn!(?peer, error = %SessionError::OversizedBody, "closing session");
                            break;
                        }
                        Err(_) => {
                            debug!(?peer, "connection closed");
                            break;
                        }
                    }
                }
                routed = self.inbox_rx.recv() => {
                    match routed {
                        Some(bytes) => {
                            if let Err(e) = self.stream.write_all(&bytes).await {
                                let e = SessionError::Io(e);
                                debug!(?peer, error = %e, "write error, closing session");
                                break;
                            }
                        }
                        None => break,
                    }
                }
            }
        }
        self.node.storage_clean(&self.registered);
    }

    async fn dispatch(&mut self, packet: Packet) -> Result<(), SessionError> {
        match packet.command() {
            Command::Invalid => {
                debug!("invalid command received, ignoring");
                Ok(())
            }
            Command::AnnounceAddresses => self.on_announce(packet),
            Command::XChatMessage => self.on_xchat(packet),
            Command::Transaction => self.on_transaction(packet),
            Command::TransactionHoldApply => self.on_hold_apply(packet),
            Command::TransactionPayApply => self.on_pay_apply(packet),
            Command::TransactionCommitApply => self.on_commit_apply(packet),
            Command::TransactionCancel => self.on_cancel(packet),
            Command::ReceivedTransaction => self.on_chain_confirm(packet),
            // These commands are matcher-emitted, never expected inbound on
            // a session that isn't also acting as a matcher; forward as-is.
            Command::TransactionHold
            | Command::TransactionPay
            | Command::TransactionCommit
            | Command::TransactionFinished
            | Command::WalletList => {
                debug!(command = ?packet.command(), "unexpected inbound matcher command, ignoring");
                Ok(())
            }
        }
    }

    fn on_announce(&mut self, packet: Packet) -> Result<(), SessionError> {
        let command = packet.command() as u32;
        let len = packet.size();
        let Some(announce) = AnnounceAddresses::decode(packet.data()) else {
            return Err(SessionError::MalformedBody { command, len });
        };
        self.node.storage_store(announce.announcer_id, self.inbox_tx.clone());
        self.registered.push(announce.announcer_id);
        Ok(())
    }

    fn on_xchat(&mut self, packet: Packet) -> Result<(), SessionError> {
        let command = packet.command() as u32;
        let len = packet.size();
        if packet.size() <= 20 {
            return Err(SessionError::MalformedBody { command, len });
        }
        let Some(dst) = NetworkId::from_slice(&packet.data()[0..20]) else {
            return Err(SessionError::MalformedBody { command, len });
        };
        self.node.send(dst, packet.to_bytes());
        Ok(())
    }

    fn on_transaction(&mut self, packet: Packet) -> Result<(), SessionError> {
        let command = packet.command() as u32;
        let len = packet.size();
        let Some(order) = TransactionOrder::decode(packet.data()) else {
            return Err(SessionError::MalformedBody { command, len });
        };

        if self.wallets.is_enabled()
            && self.wallets.has_wallet(&order.src_ccy)
            && self.wallets.has_wallet(&order.dst_ccy)
        {
            match self.exchange.create_transaction(
                order.id,
                order.src_addr,
                order.src_ccy.clone(),
                order.src_amt,
                order.dst_addr,
                order.dst_ccy.clone(),
                order.dst_amt,
            ) {
                Ok(tx_id) => self.maybe_emit_hold(tx_id),
                Err(e) => warn!(error = %e, "rejected transaction"),
            }
        }

        // Rebroadcast the original packet to the overlay regardless, so
        // another matcher further out can also consider it.
        self.node.broadcast(packet.to_bytes());
        Ok(())
    }

    fn maybe_emit_hold(&self, tx_id: TxId) {
        let Some(tx) = self.exchange.transaction(&tx_id) else { return };
        if tx.state != TransactionState::Joined {
            return;
        }
        let matcher_id = self.node.my_id();

        if let Some(first_dst) = tx.first.source {
            let hold = TransactionHold { dst_id: first_dst, matcher_id, order_id: tx.first.id, tx_id };
            self.node.send(first_dst, Packet::with_body(Command::TransactionHold, hold.encode()).to_bytes());
        }
        if let Some(second_dst) = tx.second.source {
            let hold = TransactionHold { dst_id: second_dst, matcher_id, order_id: tx.second.id, tx_id };
            self.node.send(second_dst, Packet::with_body(Command::TransactionHold, hold.encode()).to_bytes());
        }
    }

    fn on_hold_apply(&mut self, packet: Packet) -> Result<(), SessionError> {
        let command = packet.command() as u32;
        let len = packet.size();
        let Some(apply) = DstTxApply::decode(packet.data()) else {
            return Err(SessionError::MalformedBody { command, len });
        };
        if apply.dst_id != self.node.my_id() {
            self.node.send(apply.dst_id, packet.to_bytes());
            return Ok(());
        }

        if self.exchange.update_transaction_when_hold_apply_received(&apply.tx_id) == Some(TransactionState::Hold) {
            self.emit_pay_instructions(apply.tx_id);
        }
        Ok(())
    }

    fn emit_pay_instructions(&self, tx_id: TxId) {
        let Some(tx) = self.exchange.transaction(&tx_id) else { return };
        let matcher_id = self.node.my_id();

        if let (Some(first_dst), Ok(wallet_addr)) = (tx.first.source, self.wallets.address(&tx.source_currency)) {
            let pay = TransactionPay { dst_id: first_dst, matcher_id, tx_id, wallet_addr };
            self.node.send(first_dst, Packet::with_body(Command::TransactionPay, pay.encode()).to_bytes());
        }
        if let (Some(second_dst), Ok(wallet_addr)) = (tx.second.source, self.wallets.address(&tx.dest_currency)) {
            let pay = TransactionPay { dst_id: second_dst, matcher_id, tx_id, wallet_addr };
            self.node.send(second_dst, Packet::with_body(Command::TransactionPay, pay.encode()).to_bytes());
        }
    }

    fn on_pay_apply(&mut self, packet: Packet) -> Result<(), SessionError> {
        let command = packet.command() as u32;
        let len = packet.size();
        let Some(apply) = TransactionPayApply::decode(packet.data()) else {
            return Err(SessionError::MalformedBody { command, len });
        };
        if apply.dst_id != self.node.my_id() {
            self.node.send(apply.dst_id, packet.to_bytes());
            return Ok(());
        }

        if self.exchange.update_transaction_when_pay_apply_received(&apply.tx_id) == Some(TransactionState::Paid) {
            self.emit_commit_instructions(apply.tx_id);
        }
        Ok(())
    }

    fn emit_commit_instructions(&self, tx_id: TxId) {
        let Some(tx) = self.exchange.transaction(&tx_id) else { return };
        let matcher_id = self.node.my_id();

        if let (Some(first_dest), Ok(wallet_id)) = (tx.first.dest, self.wallets.address(&tx.dest_currency)) {
            let commit = TransactionCommit {
                wallet_id,
                matcher_id,
                tx_id,
                dest_addr: first_dest,
                amount: tx.dest_amount,
            };
            self.node.send(wallet_id, Packet::with_body(Command::TransactionCommit, commit.encode()).to_bytes());
        }
        if let (Some(second_dest), Ok(wallet_id)) = (tx.second.dest, self.wallets.address(&tx.source_currency)) {
            let commit = TransactionCommit {
                wallet_id,
                matcher_id,
                tx_id,
                dest_addr: second_dest,
                amount: tx.source_amount,
            };
            self.node.send(wallet_id, Packet::with_body(Command::TransactionCommit, commit.encode()).to_bytes());
        }
    }

    fn on_commit_apply(&mut self, packet: Packet) -> Result<(), SessionError> {
        let command = packet.command() as u32;
        let len = packet.size();
        let Some(apply) = DstTxApply::decode(packet.data()) else {
            return Err(SessionError::MalformedBody { command, len });
        };
        if apply.dst_id != self.node.my_id() {
            self.node.send(apply.dst_id, packet.to_bytes());
            return Ok(());
        }

        if self.exchange.update_transaction_when_commit_apply_received(&apply.tx_id) == Some(TransactionState::Finished) {
            self.emit_finished(apply.tx_id);
        }
        Ok(())
    }

    fn emit_finished(&self, tx_id: TxId) {
        let Some(tx) = self.exchange.transaction(&tx_id) else { return };
        for dst in [tx.first.source, tx.second.source].into_iter().flatten() {
            let finished = DstTxApply { dst_id: dst, tx_id };
            self.node.send(dst, Packet::with_body(Command::TransactionFinished, finished.encode()).to_bytes());
        }
    }

    fn on_cancel(&mut self, packet: Packet) -> Result<(), SessionError> {
        let command = packet.command() as u32;
        let len = packet.size();
        let Some(cancel) = TransactionCancel::decode(packet.data()) else {
            return Err(SessionError::MalformedBody { command, len });
        };
        self.exchange.cancel_transaction(&cancel.tx_id);
        Ok(())
    }

    fn on_chain_confirm(&mut self, packet: Packet) -> Result<(), SessionError> {
        let command = packet.command() as u32;
        let len = packet.size();
        let Some(confirm) = ReceivedTransaction::decode(packet.data()) else {
            return Err(SessionError::MalformedBody { command, len });
        };
        self.exchange.update_transaction(confirm.tx_hash);
        Ok(())
    }
}

async fn read_header(stream: &mut TcpStream) -> std::io::Result<Option<(Command, u32)>> {
    let mut header = [0u8; 8];
    stream.read_exact(&mut header).await?;
    Ok(Packet::parse_header(header))
}

async fn read_body(stream: &mut TcpStream, len: u32) -> std::io::Result<Vec<u8>> {
    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await?;
    Ok(body)
}
