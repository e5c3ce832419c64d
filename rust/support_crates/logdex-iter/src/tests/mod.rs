use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use logdex_common::{Error, Result};

use crate::{BoxedIter, OrderedIter, SortedVecIter};

mod vec_iter_tests;

/// Counters shared between a [`TrackedIter`] and the test that created it.
#[derive(Default)]
pub struct Tracker {
    pub releases: AtomicUsize,
    pub seeks: AtomicUsize,
    pub nexts: AtomicUsize,
}

impl Tracker {
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn seeks(&self) -> usize {
        self.seeks.load(Ordering::SeqCst)
    }

    pub fn nexts(&self) -> usize {
        self.nexts.load(Ordering::SeqCst)
    }
}

/// Sorted vector iterator that records its calls and can be told to fail
/// after a number of steps.
pub struct TrackedIter {
    inner: SortedVecIter<u64>,
    tracker: Arc<Tracker>,
    fail_after: Option<usize>,
    steps: usize,
}

impl TrackedIter {
    pub fn new(items: Vec<u64>) -> (TrackedIter, Arc<Tracker>) {
        let tracker = Arc::new(Tracker::default());
        let iter = TrackedIter {
            inner: SortedVecIter::from_unsorted(items),
            tracker: tracker.clone(),
            fail_after: None,
            steps: 0,
        };
        (iter, tracker)
    }

    pub fn failing(items: Vec<u64>, fail_after: usize) -> (TrackedIter, Arc<Tracker>) {
        let (mut iter, tracker) = TrackedIter::new(items);
        iter.fail_after = Some(fail_after);
        (iter, tracker)
    }

    fn step(&mut self) -> Result<()> {
        self.steps += 1;
        match self.fail_after {
            Some(limit) if self.steps > limit => Err(Error::storage(
                "injected failure",
                std::io::Error::other("boom"),
            )),
            _ => Ok(()),
        }
    }
}

impl OrderedIter for TrackedIter {
    type Item = u64;

    fn next(&mut self) -> Result<bool> {
        self.tracker.nexts.fetch_add(1, Ordering::SeqCst);
        self.step()?;
        self.inner.next()
    }

    fn current(&self) -> &u64 {
        self.inner.current()
    }

    fn seek(&mut self, target: &u64) -> Result<bool> {
        self.tracker.seeks.fetch_add(1, Ordering::SeqCst);
        self.step()?;
        self.inner.seek(target)
    }

    fn release(&mut self) {
        self.tracker.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release();
    }
}

pub fn boxed(items: &[u64]) -> BoxedIter<u64> {
    Box::new(SortedVecIter::from_unsorted(items.to_vec()))
}

/// Strictly increasing random set drawn from `0..universe`.
pub fn random_set(len: usize, universe: u64) -> Vec<u64> {
    let mut items = (0..len)
        .map(|_| fastrand::u64(0..universe))
        .collect::<Vec<_>>();
    items.sort();
    items.dedup();
    items
}
