//! Process-wide bounded pool of worker slots.
//!
//! The pool is nothing more than an atomic counter of capacity: acquiring
//! `n` slots succeeds only if `n` units are free at that instant, and slots
//! are returned with [`WorkerSlots::release`]. It is never locked for the
//! duration of a scan. Callers normally hold slots through a [`SlotLease`],
//! which hands them back when dropped.

use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use logdex_common::{Error, Result};

use crate::cancel::CancellationToken;

/// Bounded integer capacity shared by concurrent queries.
///
/// Implemented by [`AtomicSlots`]; tests may substitute their own
/// deterministic implementation.
pub trait WorkerSlots: Send + Sync {
    /// Total number of slots in the pool.
    fn capacity(&self) -> usize;

    /// Number of slots not currently held by anyone.
    fn available(&self) -> usize;

    /// Atomically takes `count` slots, or none at all.
    fn try_acquire(&self, count: usize) -> bool;

    /// Returns `count` previously acquired slots.
    fn release(&self, count: usize);
}

/// Lock-free [`WorkerSlots`] implementation over a single atomic counter.
pub struct AtomicSlots {
    capacity: usize,
    in_use: AtomicUsize,
}

impl AtomicSlots {
    pub fn new(capacity: usize) -> AtomicSlots {
        AtomicSlots {
            capacity,
            in_use: AtomicUsize::new(0),
        }
    }

    /// Configures the capacity of the global pool.
    ///
    /// Must be called before the first call to [`global()`](Self::global) to
    /// take effect. Values less than 1 are clamped to 1.
    pub fn configure_global_capacity(capacity: usize) {
        GLOBAL_CAPACITY.store(capacity.max(1), Ordering::SeqCst);
    }

    /// Returns the process-wide pool, lazily created on first use.
    ///
    /// Capacity is the value passed to
    /// [`configure_global_capacity()`](Self::configure_global_capacity), or
    /// `available_parallelism * 4` (at least 8) otherwise.
    pub fn global() -> Arc<dyn WorkerSlots> {
        static POOL: OnceLock<Arc<AtomicSlots>> = OnceLock::new();
        POOL.get_or_init(|| Arc::new(AtomicSlots::new(Self::get_global_capacity())))
            .clone()
    }

    fn get_global_capacity() -> usize {
        let capacity = GLOBAL_CAPACITY.load(Ordering::SeqCst);
        if capacity == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get() * 4)
                .unwrap_or(8)
                .max(8)
        } else {
            capacity
        }
    }
}

impl WorkerSlots for AtomicSlots {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn available(&self) -> usize {
        self.capacity.saturating_sub(self.in_use.load(Ordering::Acquire))
    }

    fn try_acquire(&self, count: usize) -> bool {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_use| {
                let next = in_use.checked_add(count)?;
                (next <= self.capacity).then_some(next)
            })
            .is_ok()
    }

    fn release(&self, count: usize) {
        let prev = self.in_use.fetch_sub(count, Ordering::AcqRel);
        assert!(prev >= count, "released more worker slots than acquired");
    }
}

static GLOBAL_CAPACITY: AtomicUsize = AtomicUsize::new(0);

/// A number of slots held from a [`WorkerSlots`] pool, released on drop.
pub struct SlotLease {
    slots: Arc<dyn WorkerSlots>,
    count: usize,
}

impl SlotLease {
    /// Acquires `count` slots, retrying with `backoff` sleeps until enough
    /// slots are free or `cancel` fires.
    ///
    /// Fails immediately with `CapacityExceeded` if `count` can never be
    /// satisfied by the pool.
    pub fn acquire(
        slots: &Arc<dyn WorkerSlots>,
        count: usize,
        cancel: &CancellationToken,
        backoff: Duration,
    ) -> Result<SlotLease> {
        let capacity = slots.capacity();
        if count > capacity {
            return Err(Error::capacity_exceeded(count, capacity));
        }
        let mut attempts = 0u64;
        loop {
            cancel.check()?;
            if slots.try_acquire(count) {
                if attempts > 0 {
                    log::trace!("acquired {count} worker slots after {attempts} retries");
                }
                return Ok(SlotLease {
                    slots: slots.clone(),
                    count,
                });
            }
            attempts += 1;
            cancel.sleep(backoff);
        }
    }

    /// Number of slots still held by this lease.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Detaches a single slot into its own lease, so that it can be released
    /// independently of the rest.
    pub fn split_one(&mut self) -> Option<SlotLease> {
        if self.count == 0 {
            return None;
        }
        self.count -= 1;
        Some(SlotLease {
            slots: self.slots.clone(),
            count: 1,
        })
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        if self.count > 0 {
            self.slots.release(self.count);
            self.count = 0;
        }
    }
}
