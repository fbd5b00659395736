//! Cross-peer routing: forwarding packets not addressed to this node, and
//! delivering to a peer that announced its address on another session.

use std::time::Duration;

use exch_core::transaction::TransactionState;
use exch_net::packet::{Command, Packet};
use exch_net::payload::{AnnounceAddresses, DstTxApply, WalletList};
use exch_tests::helpers::{btc_ltc_wallets, net_id, tx_id, wait_until, Harness};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const TIMEOUT: Duration = Duration::from_secs(2);

/// S6 -- a `TransactionHoldApply` whose `dst_id` is not this node's identity
/// must be forwarded verbatim via the overlay, and must not touch the
/// exchange state at all.
#[tokio::test]
async fn forwarding_non_local_apply_is_passed_through_untouched() {
    let harness = Harness::new(net_id(0xEE), btc_ltc_wallets());
    let mut peer = harness.connect_peer().await;

    let foreign_dst = net_id(0x42);
    let apply = DstTxApply { dst_id: foreign_dst, tx_id: tx_id(1) };
    let packet = Packet::with_body(Command::TransactionHoldApply, apply.encode());
    let wire_bytes = packet.to_bytes();

    peer.write_all(&wire_bytes).await.unwrap();

    assert!(wait_until(TIMEOUT, || harness.overlay.sent_count() == 1).await);
    let (dst, forwarded) = harness.overlay.sent_snapshot().remove(0);
    assert_eq!(dst, foreign_dst);
    assert_eq!(forwarded, wire_bytes, "forwarded packet must be byte-identical, no re-encryption");

    assert_eq!(harness.exchange.pending_ids().len(), 0);
    assert_eq!(harness.exchange.active_ids().len(), 0);
}

/// A peer that announces its address becomes reachable by `Node::send` from
/// any other session sharing the same node, e.g. an `XChatMessage` routed
/// to it arrives verbatim on its own socket.
#[tokio::test]
async fn announced_peer_receives_routed_xchat_message() {
    let harness = Harness::new(net_id(0xEE), btc_ltc_wallets());
    let mut announcer = harness.connect_peer().await;
    let mut sender = harness.connect_peer().await;

    let announced_id = net_id(0x77);
    let announce = AnnounceAddresses { announcer_id: announced_id };
    let announce_packet = Packet::with_body(Command::AnnounceAddresses, announce.encode());
    announcer.write_all(&announce_packet.to_bytes()).await.unwrap();

    assert!(wait_until(TIMEOUT, || harness.node.session_count() == 1).await);

    let mut chat_body = announced_id.as_bytes().to_vec();
    chat_body.extend_from_slice(b"hello");
    let chat_packet = Packet::with_body(Command::XChatMessage, chat_body);
    let wire_bytes = chat_packet.to_bytes();
    sender.write_all(&wire_bytes).await.unwrap();

    let mut buf = vec![0u8; wire_bytes.len()];
    tokio::time::timeout(TIMEOUT, announcer.read_exact(&mut buf)).await.expect("timed out waiting for routed message").unwrap();
    assert_eq!(buf, wire_bytes);
}

/// The periodic wallet-list broadcast enumerates exactly the wallets loaded
/// from the registry.
#[tokio::test]
async fn wallet_list_broadcast_enumerates_enabled_wallets() {
    let harness = Harness::new(net_id(0xEE), btc_ltc_wallets());
    harness.node.on_send_list_of_wallets(&harness.wallets);

    assert_eq!(harness.overlay.broadcast_count(), 1);
    let broadcasted = harness.overlay.broadcast_snapshot().remove(0);
    let (command, body_len) = Packet::parse_header(broadcasted[0..8].try_into().unwrap()).unwrap();
    assert!(matches!(command, Command::WalletList));

    let list = WalletList::decode(&broadcasted[8..8 + body_len as usize]).unwrap();
    let mut names: Vec<_> = list.entries.iter().map(|(name, _)| name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["BTC".to_string(), "LTC".to_string()]);
}

/// If no transaction exists with a given id, a stray state-promotion apply
/// is dropped rather than panicking.
#[tokio::test]
async fn apply_for_unknown_transaction_is_a_silent_no_op() {
    let harness = Harness::new(net_id(0xEE), btc_ltc_wallets());
    let mut peer = harness.connect_peer().await;

    let apply = DstTxApply { dst_id: harness.node.my_id(), tx_id: tx_id(0xFF) };
    let packet = Packet::with_body(Command::TransactionHoldApply, apply.encode());
    peer.write_all(&packet.to_bytes()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.exchange.transaction(&tx_id(0xFF)).is_none());
    assert_eq!(harness.exchange.transaction(&tx_id(0xFF)).map(|tx| tx.state), None::<TransactionState>);
}
