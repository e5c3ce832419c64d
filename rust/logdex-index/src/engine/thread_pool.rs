//! Bounded brute-force evaluation of patterns on worker threads.
//!
//! Every `(position, value)` pair of the pattern is scanned by its own worker
//! and the hits are counted per identity by a [`MatchBarrier`]. The number of
//! concurrently running workers across all queries is bounded by a shared
//! [`WorkerSlots`] pool: the values of the widest position (the split
//! position) are processed in chunks small enough that a chunk plus one
//! worker per value of every other position fits into the pool.

use std::{sync::Arc, thread};

use alloy_primitives::B256;
use crossbeam::channel::{self, Sender};
use logdex_common::{Error, Result};
use logdex_iter::OrderedIter;
use logdex_workflow::{AtomicSlots, CancellationToken, SlotLease, WorkerSlots};

use super::{QueryEngine, barrier::MatchBarrier};
use crate::{
    codec::LogId,
    config::IndexConfig,
    pattern::{BlockRange, Pattern},
    record::LogRecord,
    store::TopicIndexStore,
};

pub struct ThreadPoolEngine {
    store: Arc<TopicIndexStore>,
    slots: Arc<dyn WorkerSlots>,
    config: IndexConfig,
}

/// One unit of scanning work.
#[derive(Debug, Clone, Copy)]
struct ScanTask<'a> {
    position: u8,
    value: &'a B256,
}

/// How a chunk ended.
enum ChunkOutcome {
    Completed,
    Stopped,
}

impl ThreadPoolEngine {
    /// Creates an engine drawing workers from the process-wide pool.
    pub fn new(store: Arc<TopicIndexStore>, config: IndexConfig) -> ThreadPoolEngine {
        ThreadPoolEngine::with_slots(store, AtomicSlots::global(), config)
    }

    pub fn with_slots(
        store: Arc<TopicIndexStore>,
        slots: Arc<dyn WorkerSlots>,
        config: IndexConfig,
    ) -> ThreadPoolEngine {
        ThreadPoolEngine {
            store,
            slots,
            config,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_chunk(
        &self,
        cancel: &CancellationToken,
        range: BlockRange,
        tasks: &[ScanTask<'_>],
        required: usize,
        min_topics: usize,
        mut lease: SlotLease,
        on_log: &mut dyn FnMut(LogRecord) -> bool,
    ) -> Result<ChunkOutcome> {
        let barrier = MatchBarrier::new(required, tasks.len());
        let (match_tx, match_rx) = channel::unbounded::<LogId>();
        let mut stopped = false;
        let mut failure = None;
        let mut worker_errors = Vec::new();

        thread::scope(|scope| {
            let handles = tasks
                .iter()
                .enumerate()
                .map(|(worker, &task)| {
                    let slot = lease.split_one();
                    let match_tx = match_tx.clone();
                    let barrier = &barrier;
                    scope.spawn(move || {
                        let result = self.scan_task(
                            cancel, range, task, min_topics, worker, barrier, &match_tx,
                        );
                        drop(slot);
                        barrier.finish(worker);
                        if result.is_err() {
                            cancel.cancel();
                        }
                        result
                    })
                })
                .collect::<Vec<_>>();
            drop(match_tx);

            for id in match_rx.iter() {
                if cancel.is_cancelled() {
                    break;
                }
                match self.store.resolve(&id) {
                    Ok(log) => {
                        if !on_log(log) {
                            stopped = true;
                            cancel.cancel();
                            break;
                        }
                    }
                    Err(e) => {
                        failure = Some(e);
                        cancel.cancel();
                        break;
                    }
                }
            }

            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => worker_errors.push(e),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });
        log::trace!("chunk of {} scans finished, {} incomplete", tasks.len(), barrier.pending());

        if let Some(e) = failure {
            return Err(e);
        }
        if stopped {
            return Ok(ChunkOutcome::Stopped);
        }
        if let Some(e) = worker_errors.into_iter().find(|e| !e.is_cancelled()) {
            log::warn!("scan worker failed: {e}");
            return Err(e);
        }
        cancel.check()?;
        Ok(ChunkOutcome::Completed)
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_task(
        &self,
        cancel: &CancellationToken,
        range: BlockRange,
        task: ScanTask<'_>,
        min_topics: usize,
        worker: usize,
        barrier: &MatchBarrier,
        matches: &Sender<LogId>,
    ) -> Result<()> {
        let mut scan = self
            .store
            .scan(task.value, task.position, range.from, min_topics)?;
        while scan.next()? {
            cancel.check()?;
            let id = scan.current().id;
            if range.ends_before(id.block_number()) {
                break;
            }
            if barrier.hit(worker, id) && matches.send(id).is_err() {
                break;
            }
        }
        scan.release();
        Ok(())
    }
}

impl QueryEngine for ThreadPoolEngine {
    fn for_each_in_blocks(
        &self,
        cancel: &CancellationToken,
        range: BlockRange,
        pattern: &[Vec<B256>],
        on_log: &mut dyn FnMut(LogRecord) -> bool,
    ) -> Result<()> {
        let pattern = Pattern::new(pattern.to_vec(), self.store.max_topics())?;
        if range.is_empty() {
            return Ok(());
        }

        let active = pattern.active_positions().collect::<Vec<_>>();
        let split = active
            .iter()
            .enumerate()
            .max_by_key(|(i, (_, values))| (values.len(), std::cmp::Reverse(*i)))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let parallels = active
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != split)
            .map(|(_, (_, values))| values.len())
            .sum::<usize>();
        let capacity = self.slots.capacity();
        if parallels >= capacity {
            return Err(Error::capacity_exceeded(parallels + 1, capacity));
        }
        let chunk_size = capacity - parallels;
        let (split_position, split_values) = active[split];
        log::debug!(
            "thread pool query: {} positions, split position {split_position} with {} values, \
             {parallels} parallel scans, chunks of {chunk_size}",
            active.len(),
            split_values.len()
        );

        let min_topics = pattern.min_topic_count();
        let cancel = cancel.child_token();
        for chunk in split_values.chunks(chunk_size) {
            let tasks = active
                .iter()
                .enumerate()
                .flat_map(|(i, &(position, values))| {
                    let values = if i == split { chunk } else { values };
                    values.iter().map(move |value| ScanTask { position, value })
                })
                .collect::<Vec<_>>();
            let lease = SlotLease::acquire(
                &self.slots,
                tasks.len(),
                &cancel,
                self.config.acquire_backoff,
            )?;
            let outcome = self.run_chunk(
                &cancel,
                range,
                &tasks,
                active.len(),
                min_topics,
                lease,
                on_log,
            )?;
            if let ChunkOutcome::Stopped = outcome {
                break;
            }
        }
        Ok(())
    }
}
