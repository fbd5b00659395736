//! Wire frame: an 8-byte little-endian header followed by a command-specific
//! body.

use exch_core::constants::MAX_PACKET_BODY_SIZE;

/// The fixed command codes assigned to each packet type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    Invalid = 0,
    AnnounceAddresses = 1,
    XChatMessage = 2,
    Transaction = 3,
    TransactionHold = 4,
    TransactionHoldApply = 5,
    TransactionPay = 6,
    TransactionPayApply = 7,
    TransactionCommit = 8,
    TransactionCommitApply = 9,
    TransactionFinished = 10,
    TransactionCancel = 11,
    ReceivedTransaction = 12,
    WalletList = 13,
}

impl Command {
    pub fn from_u32(value: u32) -> Self {
        match value {
            1 => Self::AnnounceAddresses,
            2 => Self::XChatMessage,
            3 => Self::Transaction,
            4 => Self::TransactionHold,
            5 => Self::TransactionHoldApply,
            6 => Self::TransactionPay,
            7 => Self::TransactionPayApply,
            8 => Self::TransactionCommit,
            9 => Self::TransactionCommitApply,
            10 => Self::TransactionFinished,
            11 => Self::TransactionCancel,
            12 => Self::ReceivedTransaction,
            13 => Self::WalletList,
            _ => Self::Invalid,
        }
    }
}

/// A length-prefixed wire frame: `command:u32 || body_length:u32 || body`.
#[derive(Clone, Debug)]
pub struct Packet {
    command: Command,
    body: Vec<u8>,
}

impl Packet {
    pub fn new(command: Command) -> Self {
        Self { command, body: Vec::new() }
    }

    pub fn with_body(command: Command, body: Vec<u8>) -> Self {
        Self { command, body }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }

    pub fn all_size(&self) -> usize {
        8 + self.body.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.body
    }

    /// Whole-packet transform hook. The identity function for now; any real
    /// implementation must preserve `command` and only replace the body.
    pub fn encrypt(self) -> Self {
        self
    }

    /// See [`Self::encrypt`].
    pub fn decrypt(self) -> Self {
        self
    }

    /// The 8-byte wire header: command then body length, little-endian.
    pub fn header(&self) -> [u8; 8] {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&(self.command as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&(self.body.len() as u32).to_le_bytes());
        buf
    }

    /// Serialize the whole frame for writing to a socket.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.all_size());
        out.extend_from_slice(&self.header());
        out.extend_from_slice(&self.body);
        out
    }

    /// Parse a previously-read 8-byte header. Returns `None` if
    /// `body_length` exceeds the sanity cap, the caller must abort the
    /// session on that.
    pub fn parse_header(header: [u8; 8]) -> Option<(Command, u32)> {
        let command = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let body_length = u32::from_le_bytes(header[4..8].try_into().unwrap());
        if body_length > MAX_PACKET_BODY_SIZE {
            return None;
        }
        Some((Command::from_u32(command), body_length))
    }
}

/// Write `ccy` into a fixed 8-byte, NUL-padded currency field.
pub(crate) fn write_currency(buf: &mut Vec<u8>, ccy: &str) {
    let mut field = [0u8; 8];
    let bytes = ccy.as_bytes();
    let n = bytes.len().min(8);
    field[..n].copy_from_slice(&bytes[..n]);
    buf.extend_from_slice(&field);
}

/// Read a NUL-padded currency field, trimming at the first NUL byte.
pub(crate) fn read_currency(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
