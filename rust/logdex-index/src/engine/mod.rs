//! Query execution over the topic index.
//!
//! Two interchangeable strategies implement [`QueryEngine`]:
//! [`LeapJoinEngine`] intersects per-position scans with a Leapfrog join and
//! returns matches in identity order, [`ThreadPoolEngine`] scans every
//! `(position, value)` pair on bounded worker threads and aggregates matches
//! per block, returning them in no particular order.

use alloy_primitives::B256;
use logdex_common::Result;
use logdex_workflow::CancellationToken;

use crate::{pattern::BlockRange, record::LogRecord};

pub(crate) mod barrier;
pub mod leap_join;
pub mod thread_pool;

pub use leap_join::LeapJoinEngine;
pub use thread_pool::ThreadPoolEngine;

pub trait QueryEngine: Send + Sync {
    /// Streams the logs in `range` matching `pattern` to `on_log`, which
    /// returns `false` to stop early.
    ///
    /// `pattern[0]` holds address values (see
    /// [`address_value`](crate::codec::address_value)), `pattern[i + 1]` the
    /// values of topic `i`; an empty position matches anything.
    fn for_each_in_blocks(
        &self,
        cancel: &CancellationToken,
        range: BlockRange,
        pattern: &[Vec<B256>],
        on_log: &mut dyn FnMut(LogRecord) -> bool,
    ) -> Result<()>;

    /// Collects the logs in `range` matching `pattern`.
    ///
    /// On error nothing is returned, including logs found before the failure.
    fn find_in_blocks(
        &self,
        cancel: &CancellationToken,
        range: BlockRange,
        pattern: &[Vec<B256>],
    ) -> Result<Vec<LogRecord>> {
        let mut logs = Vec::new();
        self.for_each_in_blocks(cancel, range, pattern, &mut |log| {
            logs.push(log);
            true
        })?;
        Ok(logs)
    }
}
