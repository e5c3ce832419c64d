//! Removal of consecutive duplicates from an ordered stream.

use logdex_common::Result;

use crate::{Comparator, OrderedIter};

/// Skips elements equal to the previously yielded one.
///
/// Applied to a [`Union`](crate::Union) it restores the duplicate-freedom that
/// [`LeapfrogJoin`](crate::LeapfrogJoin) requires from its inputs.
pub struct Unique<I: OrderedIter, C> {
    inner: I,
    cmp: C,
    last: Option<I::Item>,
}

impl<I: OrderedIter, C: Comparator<I::Item>> Unique<I, C> {
    pub fn new(inner: I, cmp: C) -> Unique<I, C> {
        Unique {
            inner,
            cmp,
            last: None,
        }
    }
}

impl<I, C> OrderedIter for Unique<I, C>
where
    I: OrderedIter,
    C: Comparator<I::Item>,
{
    type Item = I::Item;

    fn next(&mut self) -> Result<bool> {
        while self.inner.next()? {
            let value = self.inner.current();
            let repeated = self
                .last
                .as_ref()
                .is_some_and(|last| self.cmp.equal(last, value));
            if !repeated {
                self.last = Some(value.clone());
                return Ok(true);
            }
        }
        self.last = None;
        Ok(false)
    }

    fn current(&self) -> &I::Item {
        self.last
            .as_ref()
            .expect("Unique::current() called while not positioned")
    }

    fn seek(&mut self, target: &I::Item) -> Result<bool> {
        if !self.inner.seek(target)? {
            self.last = None;
            return Ok(false);
        }
        self.last = Some(self.inner.current().clone());
        Ok(true)
    }

    fn release(&mut self) {
        self.inner.release();
        self.last = None;
    }
}

impl<I: OrderedIter, C> Drop for Unique<I, C> {
    fn drop(&mut self) {
        self.inner.release();
    }
}
