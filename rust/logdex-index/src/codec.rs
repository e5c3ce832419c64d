//! Fixed-width, byte-ordered encodings of log identities and index keys.
//!
//! All integers are big-endian so that the lexicographic order of the encoded
//! bytes equals the numeric order of the fields. Length mismatches when
//! decoding are treated as corruption and panic.

use std::fmt;

use alloy_primitives::{Address, B256, hex};

/// Byte length of an encoded [`LogId`].
pub const LOG_ID_LEN: usize = 8 + 32 + 8 + 8;

/// Table tag of the per-(value, position) index keys.
pub const TOPIC_TABLE: u8 = b't';

/// Table tag of the full log records, keyed by [`LogId`].
pub const RECORD_TABLE: u8 = b'r';

/// Length of the scan prefix of a topic key: table tag, value, position.
pub const TOPIC_PREFIX_LEN: usize = 1 + 32 + 1;

/// Length of a full topic key.
pub const TOPIC_KEY_LEN: usize = TOPIC_PREFIX_LEN + LOG_ID_LEN;

/// Length of a record key.
pub const RECORD_KEY_LEN: usize = 1 + LOG_ID_LEN;

const TX_HASH_OFFSET: usize = 8;
const LOG_INDEX_OFFSET: usize = TX_HASH_OFFSET + 32;
const TIMESTAMP_OFFSET: usize = LOG_INDEX_OFFSET + 8;

/// Unique identity of a log record and the sole join key of both engines.
///
/// Layout: block number, transaction hash, log index, timestamp. Comparing
/// two ids compares the fields in that order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogId([u8; LOG_ID_LEN]);

impl LogId {
    pub fn new(block_number: u64, tx_hash: B256, log_index: u64, timestamp: u64) -> LogId {
        let mut bytes = [0u8; LOG_ID_LEN];
        bytes[..TX_HASH_OFFSET].copy_from_slice(&block_number.to_be_bytes());
        bytes[TX_HASH_OFFSET..LOG_INDEX_OFFSET].copy_from_slice(tx_hash.as_slice());
        bytes[LOG_INDEX_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&log_index.to_be_bytes());
        bytes[TIMESTAMP_OFFSET..].copy_from_slice(&timestamp.to_be_bytes());
        LogId(bytes)
    }

    /// The smallest identity within `block_number`.
    pub fn block_start(block_number: u64) -> LogId {
        LogId::new(block_number, B256::ZERO, 0, 0)
    }

    /// # Panics
    ///
    /// Panics if `bytes` is not exactly [`LOG_ID_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> LogId {
        let bytes: [u8; LOG_ID_LEN] = bytes
            .try_into()
            .unwrap_or_else(|_| panic!("log id must be {LOG_ID_LEN} bytes, got {}", bytes.len()));
        LogId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; LOG_ID_LEN] {
        &self.0
    }

    pub fn block_number(&self) -> u64 {
        read_u64(&self.0[..TX_HASH_OFFSET])
    }

    pub fn tx_hash(&self) -> B256 {
        B256::from_slice(&self.0[TX_HASH_OFFSET..LOG_INDEX_OFFSET])
    }

    pub fn log_index(&self) -> u64 {
        read_u64(&self.0[LOG_INDEX_OFFSET..TIMESTAMP_OFFSET])
    }

    pub fn timestamp(&self) -> u64 {
        read_u64(&self.0[TIMESTAMP_OFFSET..])
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogId")
            .field("block_number", &self.block_number())
            .field("tx_hash", &self.tx_hash())
            .field("log_index", &self.log_index())
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

/// Index value of an emitting address: the address left-padded to 32 bytes.
pub fn address_value(address: &Address) -> B256 {
    address.into_word()
}

/// Scan prefix shared by all keys of one `(value, position)` pair.
pub fn topic_prefix(value: &B256, position: u8) -> [u8; TOPIC_PREFIX_LEN] {
    let mut prefix = [0u8; TOPIC_PREFIX_LEN];
    prefix[0] = TOPIC_TABLE;
    prefix[1..33].copy_from_slice(value.as_slice());
    prefix[33] = position;
    prefix
}

pub fn topic_key(value: &B256, position: u8, id: &LogId) -> [u8; TOPIC_KEY_LEN] {
    let mut key = [0u8; TOPIC_KEY_LEN];
    key[..TOPIC_PREFIX_LEN].copy_from_slice(&topic_prefix(value, position));
    key[TOPIC_PREFIX_LEN..].copy_from_slice(id.as_bytes());
    key
}

/// Extracts the identity from a topic key. Value and position are implied by
/// the prefix the key was found under.
///
/// # Panics
///
/// Panics if `key` is not a full topic key.
pub fn topic_key_id(key: &[u8]) -> LogId {
    assert_eq!(
        key.len(),
        TOPIC_KEY_LEN,
        "topic key must be {TOPIC_KEY_LEN} bytes"
    );
    LogId::from_slice(&key[TOPIC_PREFIX_LEN..])
}

pub fn record_key(id: &LogId) -> [u8; RECORD_KEY_LEN] {
    let mut key = [0u8; RECORD_KEY_LEN];
    key[0] = RECORD_TABLE;
    key[1..].copy_from_slice(id.as_bytes());
    key
}
