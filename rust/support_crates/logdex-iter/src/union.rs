//! K-way sorted merge of ordered iterators.

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc};

use logdex_common::Result;
use rayon::prelude::*;

use crate::{BoxedIter, Comparator, OrderedIter};

/// Merges its inputs into one ordered stream, keeping duplicates that occur
/// in more than one input.
///
/// Inputs live in a binary min-heap keyed by their current value. `next`
/// advances only the input at the top of the heap, but the very first step and
/// every `seek` move *all* inputs, and those moves are fanned out to the rayon
/// pool: inputs are typically storage scans, and advancing them concurrently is
/// what hides their latency. Exhausted inputs are released as soon as they are
/// detected.
///
/// The union owns its inputs; callers must not release them separately.
pub struct Union<T, C>
where
    T: Clone + Send + Sync,
{
    /// Inputs that have not been advanced yet.
    pending: Vec<BoxedIter<T>>,
    heap: BinaryHeap<HeapCursor<T, C>>,
    order: Arc<C>,
    started: bool,
}

impl<T, C> Union<T, C>
where
    T: Clone + Send + Sync,
    C: Comparator<T>,
{
    pub fn new(iters: Vec<BoxedIter<T>>, cmp: C) -> Union<T, C> {
        Union {
            pending: iters,
            heap: BinaryHeap::new(),
            order: Arc::new(cmp),
            started: false,
        }
    }

    /// Number of inputs that are not yet known to be exhausted.
    pub fn live_inputs(&self) -> usize {
        self.pending.len() + self.heap.len()
    }

    /// Applies `op` to every input concurrently, then rebuilds the heap from
    /// the inputs that are still positioned.
    fn advance_all<F>(&mut self, iters: Vec<BoxedIter<T>>, op: F) -> Result<bool>
    where
        F: Fn(&mut BoxedIter<T>) -> Result<bool> + Send + Sync,
    {
        let outcomes: Vec<(BoxedIter<T>, Result<bool>)> = if iters.len() <= 1 {
            iters
                .into_iter()
                .map(|mut iter| {
                    let res = op(&mut iter);
                    (iter, res)
                })
                .collect()
        } else {
            iters
                .into_par_iter()
                .map(|mut iter| {
                    let res = op(&mut iter);
                    (iter, res)
                })
                .collect()
        };

        let mut failure = None;
        for (mut iter, res) in outcomes {
            match res {
                Ok(true) if failure.is_none() => self.heap.push(HeapCursor {
                    iter,
                    order: self.order.clone(),
                }),
                Ok(_) => iter.release(),
                Err(e) => {
                    iter.release();
                    failure.get_or_insert(e);
                }
            }
        }
        if let Some(e) = failure {
            self.release_inputs();
            return Err(e);
        }
        Ok(!self.heap.is_empty())
    }
}

impl<T, C> OrderedIter for Union<T, C>
where
    T: Clone + Send + Sync,
    C: Comparator<T>,
{
    type Item = T;

    fn next(&mut self) -> Result<bool> {
        if !self.started {
            self.started = true;
            let iters = std::mem::take(&mut self.pending);
            return self.advance_all(iters, |iter| iter.next());
        }

        let Some(mut top) = self.heap.pop() else {
            return Ok(false);
        };
        match top.iter.next() {
            Ok(true) => self.heap.push(top),
            Ok(false) => top.iter.release(),
            Err(e) => {
                top.iter.release();
                self.release_inputs();
                return Err(e);
            }
        }
        Ok(!self.heap.is_empty())
    }

    fn current(&self) -> &T {
        self.heap
            .peek()
            .expect("Union::current() called while not positioned")
            .iter
            .current()
    }

    fn seek(&mut self, target: &T) -> Result<bool> {
        if !self.started {
            self.started = true;
            let iters = std::mem::take(&mut self.pending);
            return self.advance_all(iters, |iter| iter.seek(target));
        }

        let Some(top) = self.heap.peek() else {
            return Ok(false);
        };
        if self.order.compare(top.iter.current(), target) != Ordering::Less {
            return Ok(true);
        }
        let iters = self.heap.drain().map(|cursor| cursor.iter).collect();
        self.advance_all(iters, |iter| iter.seek(target))
    }

    fn release(&mut self) {
        self.release_inputs();
    }
}

impl<T, C> Union<T, C>
where
    T: Clone + Send + Sync,
{
    fn release_inputs(&mut self) {
        for mut iter in self.pending.drain(..) {
            iter.release();
        }
        for mut cursor in self.heap.drain() {
            cursor.iter.release();
        }
        self.started = true;
    }
}

impl<T, C> Drop for Union<T, C>
where
    T: Clone + Send + Sync,
{
    fn drop(&mut self) {
        self.release_inputs();
    }
}

/// Heap entry ordering inputs by their current value, smallest on top.
struct HeapCursor<T, C>
where
    T: Clone + Send + Sync,
{
    iter: BoxedIter<T>,
    order: Arc<C>,
}

impl<T: Clone + Send + Sync, C: Comparator<T>> Ord for HeapCursor<T, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse the comparison.
        self.order.compare(other.iter.current(), self.iter.current())
    }
}

impl<T: Clone + Send + Sync, C: Comparator<T>> PartialOrd for HeapCursor<T, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Clone + Send + Sync, C: Comparator<T>> PartialEq for HeapCursor<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Clone + Send + Sync, C: Comparator<T>> Eq for HeapCursor<T, C> {}
