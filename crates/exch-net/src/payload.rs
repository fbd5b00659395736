//! Fixed-layout bodies for each command, per the wire format table.

use exch_core::types::{NetworkId, TxId};

use crate::packet::{read_currency, write_currency};

fn u64_at(body: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(body.get(offset..offset + 8)?.try_into().ok()?))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnounceAddresses {
    pub announcer_id: NetworkId,
}

impl AnnounceAddresses {
    pub const SIZE: usize = 20;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self { announcer_id: NetworkId::from_slice(body)? })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.announcer_id.as_bytes().to_vec()
    }
}

/// Body of a `Transaction` packet: a full order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOrder {
    pub id: TxId,
    pub src_addr: NetworkId,
    pub src_ccy: String,
    pub src_amt: u64,
    pub dst_addr: NetworkId,
    pub dst_ccy: String,
    pub dst_amt: u64,
}

impl TransactionOrder {
    pub const SIZE: usize = 32 + 20 + 8 + 8 + 20 + 8 + 8;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self {
            id: TxId::from_slice(&body[0..32])?,
            src_addr: NetworkId::from_slice(&body[32..52])?,
            src_ccy: read_currency(&body[52..60]),
            src_amt: u64_at(body, 60)?,
            dst_addr: NetworkId::from_slice(&body[68..88])?,
            dst_ccy: read_currency(&body[88..96]),
            dst_amt: u64_at(body, 96)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(self.id.as_bytes());
        buf.extend_from_slice(self.src_addr.as_bytes());
        write_currency(&mut buf, &self.src_ccy);
        buf.extend_from_slice(&self.src_amt.to_le_bytes());
        buf.extend_from_slice(self.dst_addr.as_bytes());
        write_currency(&mut buf, &self.dst_ccy);
        buf.extend_from_slice(&self.dst_amt.to_le_bytes());
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionHold {
    pub dst_id: NetworkId,
    pub matcher_id: NetworkId,
    pub order_id: TxId,
    pub tx_id: TxId,
}

impl TransactionHold {
    pub const SIZE: usize = 20 + 20 + 32 + 32;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self {
            dst_id: NetworkId::from_slice(&body[0..20])?,
            matcher_id: NetworkId::from_slice(&body[20..40])?,
            order_id: TxId::from_slice(&body[40..72])?,
            tx_id: TxId::from_slice(&body[72..104])?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(self.dst_id.as_bytes());
        buf.extend_from_slice(self.matcher_id.as_bytes());
        buf.extend_from_slice(self.order_id.as_bytes());
        buf.extend_from_slice(self.tx_id.as_bytes());
        buf
    }
}

/// Shared shape for `TransactionHoldApply` and `TransactionCommitApply`:
/// `dst_id[20] || tx_id[32]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DstTxApply {
    pub dst_id: NetworkId,
    pub tx_id: TxId,
}

impl DstTxApply {
    pub const SIZE: usize = 52;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self {
            dst_id: NetworkId::from_slice(&body[0..20])?,
            tx_id: TxId::from_slice(&body[20..52])?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(self.dst_id.as_bytes());
        buf.extend_from_slice(self.tx_id.as_bytes());
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionPay {
    pub dst_id: NetworkId,
    pub matcher_id: NetworkId,
    pub tx_id: TxId,
    pub wallet_addr: NetworkId,
}

impl TransactionPay {
    pub const SIZE: usize = 20 + 20 + 32 + 20;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self {
            dst_id: NetworkId::from_slice(&body[0..20])?,
            matcher_id: NetworkId::from_slice(&body[20..40])?,
            tx_id: TxId::from_slice(&body[40..72])?,
            wallet_addr: NetworkId::from_slice(&body[72..92])?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(self.dst_id.as_bytes());
        buf.extend_from_slice(self.matcher_id.as_bytes());
        buf.extend_from_slice(self.tx_id.as_bytes());
        buf.extend_from_slice(self.wallet_addr.as_bytes());
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionPayApply {
    pub dst_id: NetworkId,
    pub tx_id: TxId,
    pub payment_id: TxId,
}

impl TransactionPayApply {
    pub const SIZE: usize = 20 + 32 + 32;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self {
            dst_id: NetworkId::from_slice(&body[0..20])?,
            tx_id: TxId::from_slice(&body[20..52])?,
            payment_id: TxId::from_slice(&body[52..84])?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(self.dst_id.as_bytes());
        buf.extend_from_slice(self.tx_id.as_bytes());
        buf.extend_from_slice(self.payment_id.as_bytes());
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionCommit {
    pub wallet_id: NetworkId,
    pub matcher_id: NetworkId,
    pub tx_id: TxId,
    pub dest_addr: NetworkId,
    pub amount: u64,
}

impl TransactionCommit {
    pub const SIZE: usize = 20 + 20 + 32 + 20 + 8;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self {
            wallet_id: NetworkId::from_slice(&body[0..20])?,
            matcher_id: NetworkId::from_slice(&body[20..40])?,
            tx_id: TxId::from_slice(&body[40..72])?,
            dest_addr: NetworkId::from_slice(&body[72..92])?,
            amount: u64_at(body, 92)?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(self.wallet_id.as_bytes());
        buf.extend_from_slice(self.matcher_id.as_bytes());
        buf.extend_from_slice(self.tx_id.as_bytes());
        buf.extend_from_slice(self.dest_addr.as_bytes());
        buf.extend_from_slice(&self.amount.to_le_bytes());
        buf
    }
}

/// Shared shape for `TransactionFinished` and `TransactionCancel`'s tx id:
/// `dst_id[20] || tx_id[32]`, identical layout to [`DstTxApply`], kept as a
/// distinct type so a mixup between the two is a type error, not a silent
/// reinterpretation.
pub type TransactionFinished = DstTxApply;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionCancel {
    pub tx_id: TxId,
}

impl TransactionCancel {
    pub const SIZE: usize = 52;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self { tx_id: TxId::from_slice(&body[20..52])? })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 20];
        buf.extend_from_slice(self.tx_id.as_bytes());
        buf
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedTransaction {
    pub tx_hash: TxId,
}

impl ReceivedTransaction {
    pub const SIZE: usize = 32;

    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() != Self::SIZE {
            return None;
        }
        Some(Self { tx_hash: TxId::from_slice(body)? })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.tx_hash.as_bytes().to_vec()
    }
}

const WALLET_LIST_NAME_SIZE: usize = 8;
const WALLET_LIST_TITLE_SIZE: usize = 32;
const WALLET_LIST_ENTRY_SIZE: usize = WALLET_LIST_NAME_SIZE + WALLET_LIST_TITLE_SIZE;

/// Body of a `WalletList` packet: repeated `(name:8, title:32)` entries.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct WalletList {
    pub entries: Vec<(String, String)>,
}

impl WalletList {
    pub fn decode(body: &[u8]) -> Option<Self> {
        if body.len() % WALLET_LIST_ENTRY_SIZE != 0 {
            return None;
        }
        let entries = body
            .chunks_exact(WALLET_LIST_ENTRY_SIZE)
            .map(|chunk| {
                let name = read_currency(&chunk[0..WALLET_LIST_NAME_SIZE]);
                let title = read_currency(&chunk[WALLET_LIST_NAME_SIZE..]);
                (name, title)
            })
            .collect();
        Some(Self { entries })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.entries.len() * WALLET_LIST_ENTRY_SIZE);
        for (name, title) in &self.entries {
            write_currency(&mut buf, name);
            let mut title_field = [0u8; WALLET_LIST_TITLE_SIZE];
            let bytes = title.as_bytes();
            let n = bytes.len().min(WALLET_LIST_TITLE_SIZE);
            title_field[..n].copy_from_slice(&bytes[..n]);
            buf.extend_from_slice(&title_field);
        }
        buf
    }
}
