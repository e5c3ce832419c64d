use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use crate::codec::LogId;

/// Aggregates the hits of concurrent scan workers.
///
/// Every worker scans one `(position, value)` pair in identity order and
/// reports each identity it finds. An identity is complete once it was
/// reported by as many workers as the pattern has active positions: a log
/// carries exactly one value per position, so each active position
/// contributes at most one hit.
///
/// Counts are grouped by block. Because workers move forward through blocks,
/// a block every worker has moved past can receive no more hits, and its
/// incomplete identities are dropped.
pub(crate) struct MatchBarrier {
    required: usize,
    state: Mutex<BarrierState>,
}

struct BarrierState {
    pending: BTreeMap<u64, HashMap<LogId, usize>>,
    /// Block each worker last reported from.
    progress: Vec<u64>,
}

impl MatchBarrier {
    pub fn new(required: usize, workers: usize) -> MatchBarrier {
        MatchBarrier {
            required,
            state: Mutex::new(BarrierState {
                pending: BTreeMap::new(),
                progress: vec![0; workers],
            }),
        }
    }

    /// Records a hit of `worker` on `id`. Returns `true` when this hit
    /// completes the identity.
    pub fn hit(&self, worker: usize, id: LogId) -> bool {
        let block = id.block_number();
        let mut state = self.state.lock().unwrap();
        if state.progress[worker] < block {
            state.progress[worker] = block;
            state.evict();
        }
        let counts = state.pending.entry(block).or_default();
        let count = counts.entry(id).or_insert(0);
        *count += 1;
        if *count < self.required {
            return false;
        }
        counts.remove(&id);
        if counts.is_empty() {
            state.pending.remove(&block);
        }
        true
    }

    /// Marks `worker` as done.
    pub fn finish(&self, worker: usize) {
        let mut state = self.state.lock().unwrap();
        state.progress[worker] = u64::MAX;
        state.evict();
    }

    /// Number of identities still waiting for hits.
    pub fn pending(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.pending.values().map(HashMap::len).sum()
    }
}

impl BarrierState {
    fn evict(&mut self) {
        let watermark = self.progress.iter().copied().min().unwrap_or(u64::MAX);
        let keep = self.pending.split_off(&watermark);
        self.pending = keep;
    }
}
