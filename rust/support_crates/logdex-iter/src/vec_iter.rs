//! In-memory [`OrderedIter`] over a sorted vector.

use logdex_common::Result;

use crate::OrderedIter;

/// Iterates a vector that is already sorted and free of duplicates.
///
/// `seek` binary-searches the unvisited tail, so it costs `O(log n)`.
pub struct SortedVecIter<T> {
    items: Vec<T>,
    pos: Option<usize>,
    exhausted: bool,
}

impl<T: Ord> SortedVecIter<T> {
    pub fn new(items: Vec<T>) -> SortedVecIter<T> {
        debug_assert!(items.windows(2).all(|w| w[0] < w[1]));
        SortedVecIter {
            items,
            pos: None,
            exhausted: false,
        }
    }

    /// Sorts and deduplicates `items` before wrapping them.
    pub fn from_unsorted(mut items: Vec<T>) -> SortedVecIter<T> {
        items.sort();
        items.dedup();
        SortedVecIter::new(items)
    }

    fn land(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            self.pos = Some(index);
            true
        } else {
            self.pos = None;
            self.exhausted = true;
            false
        }
    }
}

impl<T> OrderedIter for SortedVecIter<T>
where
    T: Ord + Clone + Send + Sync,
{
    type Item = T;

    fn next(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let index = self.pos.map_or(0, |p| p + 1);
        Ok(self.land(index))
    }

    fn current(&self) -> &T {
        let pos = self
            .pos
            .expect("SortedVecIter::current() called while not positioned");
        &self.items[pos]
    }

    fn seek(&mut self, target: &T) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if let Some(pos) = self.pos {
            if self.items[pos] >= *target {
                return Ok(true);
            }
        }
        let start = self.pos.map_or(0, |p| p + 1);
        let index = start + self.items[start..].partition_point(|item| item < target);
        Ok(self.land(index))
    }

    fn release(&mut self) {
        self.items = Vec::new();
        self.pos = None;
        self.exhausted = true;
    }
}
