use alloy_primitives::{Address, B256, Bytes};

use crate::record::LogRecord;

mod barrier_tests;
mod pattern_tests;
mod store_tests;

pub fn hash(n: u64) -> B256 {
    B256::left_padding_from(&n.to_be_bytes())
}

pub fn address(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn log_record(
    block_number: u64,
    log_index: u64,
    address_byte: u8,
    topics: &[u64],
) -> LogRecord {
    LogRecord {
        address: address(address_byte),
        topics: topics.iter().map(|&t| hash(t)).collect(),
        data: Bytes::from(vec![address_byte; 3]),
        block_number,
        tx_hash: hash(block_number * 1000 + log_index),
        log_index,
        timestamp: 1_700_000_000 + block_number * 12,
    }
}
