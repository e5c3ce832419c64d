//! Ordered iterator algebra used by the log-topic query engines.
//!
//! Every algorithm in this crate is written against the [`OrderedIter`] trait,
//! a seekable cursor over strictly increasing elements. Storage scans, in-memory
//! vectors and the combinators themselves all implement it, so they compose
//! freely:
//!
//! - [`join::LeapfrogJoin`] - intersection of N duplicate-free iterators
//!   (Leapfrog Triejoin), cost driven by the output and the number of seeks.
//! - [`union::Union`] - k-way merge over a binary heap, keeping cross-source
//!   duplicates; advances members in parallel on its first step and on seek.
//! - [`unique::Unique`] - drops consecutive duplicates, turning a `Union` back
//!   into a join-compatible source.
//! - [`prefetch::Prefetch`] - moves a wrapped iterator onto a background
//!   producer thread to overlap its I/O with the consumer.
//!
//! # Contract
//!
//! - Before the first `next` or `seek` an iterator is positioned *before* its
//!   first element.
//! - `current` is valid only right after `next`/`seek` returned `Ok(true)`;
//!   calling it at any other time panics.
//! - `seek` never moves backwards: seeking to a value not greater than the
//!   current element leaves the position unchanged.
//! - `release` is idempotent. Every type in this crate also releases on drop,
//!   so owners get deterministic cleanup on every exit path.

use std::cmp::Ordering;

use logdex_common::Result;

pub mod join;
pub mod prefetch;
pub mod union;
pub mod unique;
pub mod vec_iter;

#[cfg(test)]
mod tests;

pub use join::LeapfrogJoin;
pub use prefetch::Prefetch;
pub use union::Union;
pub use unique::Unique;
pub use vec_iter::SortedVecIter;

/// A forward-only, seekable cursor over strictly increasing elements.
pub trait OrderedIter: Send {
    type Item: Clone + Send + Sync;

    /// Advances to the next element. Returns `Ok(false)` once exhausted.
    fn next(&mut self) -> Result<bool>;

    /// The element the iterator is positioned at.
    ///
    /// # Panics
    ///
    /// Panics if the last `next`/`seek` did not return `Ok(true)`.
    fn current(&self) -> &Self::Item;

    /// Advances to the smallest element `>= target`.
    ///
    /// Returns `Ok(false)` (and becomes exhausted) if there is no such element.
    fn seek(&mut self, target: &Self::Item) -> Result<bool>;

    /// Frees the resources held by the iterator. Safe to call more than once.
    fn release(&mut self);
}

/// Type-erased iterator, the common currency between combinators.
pub type BoxedIter<T> = Box<dyn OrderedIter<Item = T>>;

impl<I: OrderedIter + ?Sized> OrderedIter for Box<I> {
    type Item = I::Item;

    fn next(&mut self) -> Result<bool> {
        (**self).next()
    }

    fn current(&self) -> &Self::Item {
        (**self).current()
    }

    fn seek(&mut self, target: &Self::Item) -> Result<bool> {
        (**self).seek(target)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Total ordering injected into the combinators.
///
/// The ordering must agree with the order in which the input iterators yield
/// their elements and with the semantics of their `seek`.
pub trait Comparator<T>: Send + Sync {
    fn compare(&self, a: &T, b: &T) -> Ordering;

    fn equal(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

/// Orders elements by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<T: Ord> Comparator<T> for NaturalOrder {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Drains `iter` into a vector, starting from its current position.
pub fn collect<I: OrderedIter + ?Sized>(iter: &mut I) -> Result<Vec<I::Item>> {
    let mut items = Vec::new();
    while iter.next()? {
        items.push(iter.current().clone());
    }
    Ok(items)
}
