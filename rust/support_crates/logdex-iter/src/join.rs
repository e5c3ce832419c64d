//! Leapfrog Triejoin over N ordered iterators.
//!
//! The join keeps its inputs on a virtual ring sorted by their current value.
//! The iterator at the ring position holds the smallest value and `max` tracks
//! the largest one. If the two agree, every input agrees and the value is
//! emitted; otherwise the smallest iterator is sought forward to `max`, its new
//! value becomes the new `max`, and the ring position advances.
//!
//! Because inputs are only ever moved with `seek`, the work done is bounded by
//! the size of the output and the number of seeks rather than by the size of the
//! inputs. Inputs must be strictly increasing and duplicate-free.

use std::cmp::Ordering;

use logdex_common::Result;

use crate::{BoxedIter, Comparator, OrderedIter};

/// Lazily intersects its inputs. Itself an [`OrderedIter`], so a join can be
/// consumed step by step, sought, or abandoned at any point.
pub struct LeapfrogJoin<T, C>
where
    T: Clone + Send + Sync,
{
    iters: Vec<BoxedIter<T>>,
    cmp: C,
    /// Ring position: index of the iterator with the smallest current value.
    p: usize,
    /// Largest current value among the inputs.
    max: Option<T>,
    state: JoinState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinState {
    /// No input has been advanced yet.
    Fresh,
    /// All inputs are positioned at `max`.
    Matched,
    /// Some input ran out; the inputs have been released.
    Done,
}

impl<T, C> LeapfrogJoin<T, C>
where
    T: Clone + Send + Sync,
    C: Comparator<T>,
{
    /// Takes ownership of `iters`; they are released when the join finishes,
    /// is released, or is dropped.
    pub fn new(iters: Vec<BoxedIter<T>>, cmp: C) -> LeapfrogJoin<T, C> {
        LeapfrogJoin {
            iters,
            cmp,
            p: 0,
            max: None,
            state: JoinState::Fresh,
        }
    }

    /// Number of inputs still owned by the join.
    pub fn arity(&self) -> usize {
        self.iters.len()
    }

    /// Advances every input once and arranges them on the ring.
    fn init(&mut self) -> Result<bool> {
        if self.iters.is_empty() {
            return Ok(false);
        }
        for iter in self.iters.iter_mut() {
            if !iter.next()? {
                return Ok(false);
            }
        }
        let cmp = &self.cmp;
        self.iters.sort_by(|a, b| cmp.compare(a.current(), b.current()));
        self.p = 0;
        self.max = Some(self.iters[self.iters.len() - 1].current().clone());
        Ok(true)
    }

    /// Runs the leapfrog loop until all inputs agree or one of them runs out.
    fn search(&mut self) -> Result<bool> {
        let n = self.iters.len();
        loop {
            let max = self.max.take().expect("max is set while searching");
            let iter = &mut self.iters[self.p];
            if self.cmp.equal(iter.current(), &max) {
                self.max = Some(max);
                self.state = JoinState::Matched;
                return Ok(true);
            }
            if !iter.seek(&max)? {
                self.finish();
                return Ok(false);
            }
            self.max = Some(iter.current().clone());
            self.p = (self.p + 1) % n;
        }
    }

    fn finish(&mut self) {
        self.state = JoinState::Done;
        self.max = None;
        self.release_inputs();
    }

    fn release_inputs(&mut self) {
        for iter in self.iters.iter_mut() {
            iter.release();
        }
        self.iters.clear();
    }

    /// Raises `max` to `target` so that the next search skips everything
    /// below it.
    fn raise_max(&mut self, target: &T) {
        let below = self
            .max
            .as_ref()
            .is_none_or(|max| self.cmp.compare(max, target) == Ordering::Less);
        if below {
            self.max = Some(target.clone());
        }
    }
}

impl<T, C> OrderedIter for LeapfrogJoin<T, C>
where
    T: Clone + Send + Sync,
    C: Comparator<T>,
{
    type Item = T;

    fn next(&mut self) -> Result<bool> {
        let result = match self.state {
            JoinState::Done => return Ok(false),
            JoinState::Fresh => match self.init() {
                Ok(true) => self.search(),
                Ok(false) => {
                    self.finish();
                    Ok(false)
                }
                Err(e) => Err(e),
            },
            JoinState::Matched => {
                let n = self.iters.len();
                let iter = &mut self.iters[self.p];
                match iter.next() {
                    Ok(true) => {
                        self.max = Some(iter.current().clone());
                        self.p = (self.p + 1) % n;
                        self.search()
                    }
                    Ok(false) => {
                        self.finish();
                        Ok(false)
                    }
                    Err(e) => Err(e),
                }
            }
        };
        if result.is_err() {
            self.finish();
        }
        result
    }

    fn current(&self) -> &T {
        assert_eq!(
            self.state,
            JoinState::Matched,
            "LeapfrogJoin::current() called while not positioned"
        );
        self.max.as_ref().expect("matched join has a value")
    }

    fn seek(&mut self, target: &T) -> Result<bool> {
        let result = match self.state {
            JoinState::Done => return Ok(false),
            JoinState::Fresh => match self.init() {
                Ok(true) => {
                    self.raise_max(target);
                    self.search()
                }
                Ok(false) => {
                    self.finish();
                    Ok(false)
                }
                Err(e) => Err(e),
            },
            JoinState::Matched => {
                if self.cmp.compare(self.current(), target) != Ordering::Less {
                    return Ok(true);
                }
                self.raise_max(target);
                self.search()
            }
        };
        if result.is_err() {
            self.finish();
        }
        result
    }

    fn release(&mut self) {
        if self.state != JoinState::Done {
            self.finish();
        }
    }
}

impl<T, C> Drop for LeapfrogJoin<T, C>
where
    T: Clone + Send + Sync,
{
    fn drop(&mut self) {
        for iter in self.iters.iter_mut() {
            iter.release();
        }
    }
}
