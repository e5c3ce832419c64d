//! A log-topic index for contract event logs.
//!
//! Logs are indexed by their emitting address and up to
//! [`IndexConfig::max_topics`] topics. Queries select the logs of a block
//! range whose value at every constrained position is one of the given
//! alternatives, using either engine in [`engine`].

pub mod codec;
pub mod config;
pub mod engine;
pub mod kv;
pub mod pattern;
pub mod record;
pub mod store;

#[cfg(test)]
mod tests;

pub use codec::LogId;
pub use config::IndexConfig;
pub use engine::{LeapJoinEngine, QueryEngine, ThreadPoolEngine};
pub use kv::{KeyValueStore, KvCursor, MemoryStore, WriteBatch};
pub use pattern::{BlockRange, Pattern, PatternBuilder};
pub use record::LogRecord;
pub use store::{IdOrder, LogRec, TopicIndexStore, TopicScan};
