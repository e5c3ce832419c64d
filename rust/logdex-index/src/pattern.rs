//! Query patterns and block ranges.

use alloy_primitives::{Address, B256};
use logdex_common::{Error, Result};

use crate::{codec::address_value, config::max_positions};

/// Inclusive range of blocks to search.
///
/// `to: None` means "no upper bound". `Some(0)` is the range containing only
/// block 0 when `from` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: Option<u64>,
}

impl BlockRange {
    pub fn new(from: u64, to: Option<u64>) -> BlockRange {
        BlockRange { from, to }
    }

    pub fn between(from: u64, to: u64) -> BlockRange {
        BlockRange { from, to: Some(to) }
    }

    pub fn starting_at(from: u64) -> BlockRange {
        BlockRange { from, to: None }
    }

    pub fn all() -> BlockRange {
        BlockRange::starting_at(0)
    }

    /// True when `from > to`; such a range matches nothing.
    pub fn is_empty(&self) -> bool {
        self.to.is_some_and(|to| self.from > to)
    }

    pub fn contains(&self, block: u64) -> bool {
        block >= self.from && self.to.is_none_or(|to| block <= to)
    }

    /// True when `block` lies beyond the upper bound.
    pub fn ends_before(&self, block: u64) -> bool {
        self.to.is_some_and(|to| block > to)
    }
}

/// A canonical query pattern.
///
/// Position 0 constrains the emitting address, position `i + 1` constrains
/// topic `i`. Values within a position are alternatives, positions are
/// combined with AND, an empty position matches anything.
///
/// Canonical form: values sorted and deduplicated, no trailing empty
/// positions, at least one non-empty position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    positions: Vec<Vec<B256>>,
}

impl Pattern {
    /// Canonicalizes `positions`.
    ///
    /// Positions past the `1 + max_topics` indexable ones are cut off. Fails
    /// if every remaining position is empty.
    pub fn new(mut positions: Vec<Vec<B256>>, max_topics: usize) -> Result<Pattern> {
        positions.truncate(max_positions(max_topics));
        for values in positions.iter_mut() {
            values.sort_unstable();
            values.dedup();
        }
        while positions.last().is_some_and(|values| values.is_empty()) {
            positions.pop();
        }
        if positions.is_empty() {
            return Err(Error::invalid_pattern("all positions are wildcards"));
        }
        Ok(Pattern { positions })
    }

    pub fn builder() -> PatternBuilder {
        PatternBuilder::default()
    }

    pub fn positions(&self) -> &[Vec<B256>] {
        &self.positions
    }

    /// Non-empty positions with their values, in position order.
    pub fn active_positions(&self) -> impl Iterator<Item = (u8, &[B256])> + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, values)| !values.is_empty())
            .map(|(position, values)| (position as u8, values.as_slice()))
    }

    pub fn active_count(&self) -> usize {
        self.positions.iter().filter(|v| !v.is_empty()).count()
    }

    /// Minimum number of topics a log needs to possibly match: the index of
    /// the highest constrained topic position.
    pub fn min_topic_count(&self) -> usize {
        self.positions.len() - 1
    }
}

/// Assembles raw pattern positions from addresses and topics.
#[derive(Debug, Clone, Default)]
pub struct PatternBuilder {
    positions: Vec<Vec<B256>>,
}

impl PatternBuilder {
    /// Adds alternatives for the emitting address.
    pub fn address(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.slot(0).extend(addresses.into_iter().map(|a| address_value(&a)));
        self
    }

    /// Adds alternatives for topic `index` (position `index + 1`).
    pub fn topic(mut self, index: usize, values: impl IntoIterator<Item = B256>) -> Self {
        self.slot(index + 1).extend(values);
        self
    }

    fn slot(&mut self, position: usize) -> &mut Vec<B256> {
        if self.positions.len() <= position {
            self.positions.resize_with(position + 1, Vec::new);
        }
        &mut self.positions[position]
    }

    /// The raw positions, as accepted by the query engines.
    pub fn into_positions(self) -> Vec<Vec<B256>> {
        self.positions
    }

    pub fn build(self, max_topics: usize) -> Result<Pattern> {
        Pattern::new(self.positions, max_topics)
    }
}
