//! Worst-case optimal evaluation of patterns with a Leapfrog join.

use std::sync::Arc;

use alloy_primitives::B256;
use logdex_common::Result;
use logdex_iter::{BoxedIter, LeapfrogJoin, OrderedIter, Prefetch, Union, Unique};
use logdex_workflow::CancellationToken;

use super::QueryEngine;
use crate::{
    config::IndexConfig,
    pattern::{BlockRange, Pattern},
    record::LogRecord,
    store::{IdOrder, LogRec, TopicIndexStore},
};

/// Builds one duplicate-free input per constrained position (the union of
/// the scans of its values) and intersects the inputs. Matches are resolved
/// one at a time, in identity order, so a consumer that stops early never
/// pays for the rest.
pub struct LeapJoinEngine {
    store: Arc<TopicIndexStore>,
    config: IndexConfig,
}

impl LeapJoinEngine {
    pub fn new(store: Arc<TopicIndexStore>, config: IndexConfig) -> LeapJoinEngine {
        LeapJoinEngine { store, config }
    }

    fn open_scan(
        &self,
        cancel: &CancellationToken,
        value: &B256,
        position: u8,
        range: BlockRange,
        min_topics: usize,
    ) -> Result<BoxedIter<LogRec>> {
        let scan = self.store.scan(value, position, range.from, min_topics)?;
        if self.config.prefetch {
            let prefetched =
                Prefetch::spawn(scan, IdOrder, self.config.prefetch_depth, cancel.clone())?;
            Ok(Box::new(prefetched))
        } else {
            Ok(Box::new(scan))
        }
    }

    fn position_input(
        &self,
        cancel: &CancellationToken,
        position: u8,
        values: &[B256],
        range: BlockRange,
        min_topics: usize,
    ) -> Result<BoxedIter<LogRec>> {
        let mut scans = values
            .iter()
            .map(|value| self.open_scan(cancel, value, position, range, min_topics))
            .collect::<Result<Vec<_>>>()?;
        if scans.len() == 1 {
            return Ok(scans.remove(0));
        }
        Ok(Box::new(Unique::new(Union::new(scans, IdOrder), IdOrder)))
    }
}

impl QueryEngine for LeapJoinEngine {
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
        cancel.check()?;

        let min_topics = pattern.min_topic_count();
        let inputs = pattern
            .active_positions()
            .map(|(position, values)| {
                self.position_input(cancel, position, values, range, min_topics)
            })
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "leap join over {} positions, blocks {:?}, min topics {min_topics}",
            inputs.len(),
            range
        );

        let mut join = LeapfrogJoin::new(inputs, IdOrder);
        while join.next()? {
            cancel.check()?;
            let id = join.current().id;
            if range.ends_before(id.block_number()) {
                break;
            }
            let log = self.store.resolve(&id)?;
            if !on_log(log) {
                break;
            }
        }
        join.release();
        Ok(())
    }
}
