#![allow(dead_code)]

use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes};
use logdex_index::{
    BlockRange, IndexConfig, LeapJoinEngine, LogId, LogRecord, ThreadPoolEngine,
    TopicIndexStore, codec::address_value,
};
use logdex_workflow::{AtomicSlots, WorkerSlots};

pub fn hash(n: u64) -> B256 {
    B256::left_padding_from(&n.to_be_bytes())
}

pub fn address(n: u8) -> Address {
    Address::repeat_byte(n)
}

/// 1000 logs, ten per block: log `i` is emitted by address `i % 10` with
/// topics `(i / 10) % 10` and `(i / 100) % 10`.
pub fn synthetic_logs() -> Vec<LogRecord> {
    (0..1000u64)
        .map(|i| LogRecord {
            address: address((i % 10) as u8),
            topics: vec![hash((i / 10) % 10), hash((i / 100) % 10)],
            data: Bytes::from(i.to_le_bytes().to_vec()),
            block_number: i / 10,
            tx_hash: hash(10_000 + i / 2),
            log_index: i % 10,
            timestamp: 1_600_000_000 + (i / 10) * 12,
        })
        .collect()
}

pub struct Fixture {
    pub store: Arc<TopicIndexStore>,
    pub slots: Arc<dyn WorkerSlots>,
    pub logs: Vec<LogRecord>,
}

impl Fixture {
    pub fn new(logs: Vec<LogRecord>) -> Fixture {
        Fixture::with_capacity(logs, 16)
    }

    pub fn with_capacity(logs: Vec<LogRecord>, capacity: usize) -> Fixture {
        let store = Arc::new(TopicIndexStore::in_memory(&IndexConfig::default()).unwrap());
        store.push(&logs).unwrap();
        Fixture {
            store,
            slots: Arc::new(AtomicSlots::new(capacity)),
            logs,
        }
    }

    pub fn leap_join(&self, prefetch: bool) -> LeapJoinEngine {
        LeapJoinEngine::new(
            self.store.clone(),
            IndexConfig::default()
                .with_prefetch(prefetch)
                .with_prefetch_depth(4),
        )
    }

    pub fn thread_pool(&self) -> ThreadPoolEngine {
        ThreadPoolEngine::with_slots(
            self.store.clone(),
            self.slots.clone(),
            IndexConfig::default(),
        )
    }

    /// The logs matching `pattern` in `range`, by direct inspection.
    pub fn expected(&self, range: BlockRange, pattern: &[Vec<B256>]) -> Vec<LogId> {
        let mut ids = self
            .logs
            .iter()
            .filter(|log| range.contains(log.block_number))
            .filter(|log| {
                pattern.iter().enumerate().all(|(position, values)| {
                    if values.is_empty() {
                        return true;
                    }
                    let value = if position == 0 {
                        Some(address_value(&log.address))
                    } else {
                        log.topics.get(position - 1).copied()
                    };
                    value.is_some_and(|v| values.contains(&v))
                })
            })
            .map(LogRecord::id)
            .collect::<Vec<_>>();
        ids.sort();
        ids
    }
}

/// Sorted identities of `logs`, for order-independent comparison.
pub fn id_set(logs: &[LogRecord]) -> Vec<LogId> {
    let mut ids = logs.iter().map(LogRecord::id).collect::<Vec<_>>();
    ids.sort();
    ids
}
