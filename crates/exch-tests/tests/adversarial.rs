//! Non-matching and malformed inputs: orders that must never join, and a
//! currency the matcher doesn't recognize.

use std::time::Duration;

use exch_core::transaction::TransactionState;
use exch_net::packet::{Command, Packet};
use exch_net::payload::TransactionOrder;
use exch_tests::helpers::{btc_ltc_wallets, net_id, tx_id, wait_until, Harness};
use tokio::io::AsyncWriteExt;

const TIMEOUT: Duration = Duration::from_secs(2);

async fn send(stream: &mut tokio::net::TcpStream, order: &TransactionOrder) {
    let packet = Packet::with_body(Command::Transaction, order.encode());
    stream.write_all(&packet.to_bytes()).await.unwrap();
}

/// S2 -- mismatched amounts: both orders stay pending under distinct keys,
/// and no `TransactionHold` is emitted.
#[tokio::test]
async fn mismatched_amounts_never_join() {
    let harness = Harness::new(net_id(0xEE), btc_ltc_wallets());
    let mut peer_a = harness.connect_peer().await;
    let mut peer_b = harness.connect_peer().await;

    send(
        &mut peer_a,
        &TransactionOrder {
            id: tx_id(1),
            src_addr: net_id(1),
            src_ccy: "BTC".into(),
            src_amt: 100,
            dst_addr: net_id(2),
            dst_ccy: "LTC".into(),
            dst_amt: 500,
        },
    )
    .await;
    send(
        &mut peer_b,
        &TransactionOrder {
            id: tx_id(2),
            src_addr: net_id(3),
            src_ccy: "LTC".into(),
            src_amt: 500,
            dst_addr: net_id(4),
            dst_ccy: "BTC".into(),
            dst_amt: 101,
        },
    )
    .await;

    assert!(wait_until(TIMEOUT, || harness.exchange.pending_ids().len() == 2).await);
    assert_eq!(harness.exchange.active_ids().len(), 0);
    assert_eq!(harness.overlay.sent_count(), 0, "no TransactionHold should have been emitted");
}

/// S3 -- same-direction duplicates never join: both file under the same
/// fingerprint direction and neither is the other's mirror.
#[tokio::test]
async fn same_direction_duplicates_never_join() {
    let harness = Harness::new(net_id(0xEE), btc_ltc_wallets());
    let mut peer_a = harness.connect_peer().await;
    let mut peer_b = harness.connect_peer().await;

    let order = |id: u8, src: u8, dst: u8| TransactionOrder {
        id: tx_id(id),
        src_addr: net_id(src),
        src_ccy: "BTC".into(),
        src_amt: 100,
        dst_addr: net_id(dst),
        dst_ccy: "LTC".into(),
        dst_amt: 500,
    };

    send(&mut peer_a, &order(1, 1, 2)).await;
    send(&mut peer_b, &order(2, 3, 4)).await;

    assert!(wait_until(TIMEOUT, || harness.exchange.pending_ids().len() == 2).await);
    assert_eq!(harness.exchange.active_ids().len(), 0);
}

/// S5 -- an order naming a currency absent from the wallet registry is never
/// matched, but is still rebroadcast exactly once so another matcher further
/// out on the overlay can pick it up.
#[tokio::test]
async fn unknown_currency_order_is_rebroadcast_but_not_matched() {
    let harness = Harness::new(net_id(0xEE), btc_ltc_wallets());
    let mut peer = harness.connect_peer().await;

    send(
        &mut peer,
        &TransactionOrder {
            id: tx_id(9),
            src_addr: net_id(1),
            src_ccy: "XYZ".into(),
            src_amt: 1,
            dst_addr: net_id(2),
            dst_ccy: "LTC".into(),
            dst_amt: 1,
        },
    )
    .await;

    assert!(wait_until(TIMEOUT, || harness.overlay.broadcast_count() == 1).await);
    assert_eq!(harness.exchange.pending_ids().len(), 0);
    assert_eq!(harness.exchange.active_ids().len(), 0);
    assert_eq!(harness.overlay.sent_count(), 0);
}

/// A cancelled pending order is marked `Dropped` and can no longer join.
#[tokio::test]
async fn cancel_drops_a_pending_order() {
    let harness = Harness::new(net_id(0xEE), btc_ltc_wallets());
    let mut peer = harness.connect_peer().await;

    let id = tx_id(1);
    send(
        &mut peer,
        &TransactionOrder {
            id,
            src_addr: net_id(1),
            src_ccy: "BTC".into(),
            src_amt: 100,
            dst_addr: net_id(2),
            dst_ccy: "LTC".into(),
            dst_amt: 500,
        },
    )
    .await;
    assert!(wait_until(TIMEOUT, || harness.exchange.pending_ids().len() == 1).await);

    let cancel = exch_net::payload::TransactionCancel { tx_id: id };
    let packet = Packet::with_body(Command::TransactionCancel, cancel.encode());
    peer.write_all(&packet.to_bytes()).await.unwrap();

    assert!(wait_until(TIMEOUT, || harness.exchange.transaction(&id).map(|tx| tx.state) == Some(TransactionState::Dropped)).await);
}
