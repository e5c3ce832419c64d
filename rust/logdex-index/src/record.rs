//! The log record model and its stored representation.

use alloy_primitives::{Address, B256, Bytes};
use bincode::{Decode, Encode};
use logdex_common::Result;

use crate::codec::LogId;

/// A log entry emitted by contract execution, together with its position in
/// the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    pub timestamp: u64,
}

impl LogRecord {
    pub fn id(&self) -> LogId {
        LogId::new(
            self.block_number,
            self.tx_hash,
            self.log_index,
            self.timestamp,
        )
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        let stored = StoredLog {
            address: self.address.0.0,
            topics: self.topics.iter().map(|t| t.0).collect(),
            data: self.data.to_vec(),
            block_number: self.block_number,
            tx_hash: self.tx_hash.0,
            log_index: self.log_index,
            timestamp: self.timestamp,
        };
        Ok(bincode::encode_to_vec(&stored, binc_config())?)
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<LogRecord> {
        let (stored, _): (StoredLog, usize) = bincode::decode_from_slice(bytes, binc_config())?;
        Ok(LogRecord {
            address: Address::from(stored.address),
            topics: stored.topics.into_iter().map(B256::from).collect(),
            data: Bytes::from(stored.data),
            block_number: stored.block_number,
            tx_hash: B256::from(stored.tx_hash),
            log_index: stored.log_index,
            timestamp: stored.timestamp,
        })
    }
}

#[derive(Encode, Decode)]
struct StoredLog {
    address: [u8; 20],
    topics: Vec<[u8; 32]>,
    data: Vec<u8>,
    block_number: u64,
    tx_hash: [u8; 32],
    log_index: u64,
    timestamp: u64,
}

fn binc_config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}
