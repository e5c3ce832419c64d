//! Physical layout of the topic index.
//!
//! Every log produces one index key per `(value, position)` pair it carries,
//! address at position 0 and topic `i` at position `i + 1`. The key payload
//! is the number of topics of the log, which lets a scan reject a record that
//! is too short for the pattern without resolving it. The full record is
//! stored once under its [`LogId`].

use std::{cmp::Ordering, sync::Arc};

use alloy_primitives::B256;
use logdex_common::{Error, Result, verify_arg, verify_data};
use logdex_iter::{Comparator, OrderedIter};

use crate::{
    codec::{self, LogId, TOPIC_KEY_LEN, TOPIC_PREFIX_LEN},
    config::IndexConfig,
    kv::{KeyValueStore, KvCursor, MemoryStore, WriteBatch},
    record::LogRecord,
};

/// A candidate produced by a storage scan: the identity of a log and the
/// number of topics it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRec {
    pub id: LogId,
    pub topic_count: u8,
}

impl LogRec {
    /// Lower bound for seeking a scan to `id`.
    pub fn seek_target(id: LogId) -> LogRec {
        LogRec { id, topic_count: 0 }
    }
}

/// Orders candidates by identity alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdOrder;

impl Comparator<LogRec> for IdOrder {
    fn compare(&self, a: &LogRec, b: &LogRec) -> Ordering {
        a.id.cmp(&b.id)
    }
}

pub struct TopicIndexStore {
    kv: Arc<dyn KeyValueStore>,
    max_topics: usize,
}

impl TopicIndexStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, config: &IndexConfig) -> Result<TopicIndexStore> {
        verify_arg!(max_topics, config.max_topics < u8::MAX as usize);
        Ok(TopicIndexStore {
            kv,
            max_topics: config.max_topics,
        })
    }

    pub fn in_memory(config: &IndexConfig) -> Result<TopicIndexStore> {
        TopicIndexStore::new(Arc::new(MemoryStore::new()), config)
    }

    pub fn max_topics(&self) -> usize {
        self.max_topics
    }

    /// Indexes `logs` in one batch.
    ///
    /// Re-pushing a log rewrites the same keys with the same payload, so the
    /// operation is idempotent. A log with more than `max_topics` topics
    /// rejects the whole batch before anything is written.
    pub fn push(&self, logs: &[LogRecord]) -> Result<()> {
        if logs.is_empty() {
            return Ok(());
        }
        if let Some(log) = logs.iter().find(|log| log.topics.len() > self.max_topics) {
            return Err(Error::invalid_arg(
                "logs",
                format!(
                    "log {} has {} topics, at most {} are indexable",
                    log.id(),
                    log.topics.len(),
                    self.max_topics
                ),
            ));
        }

        let mut batch = WriteBatch::new();
        for log in logs {
            let id = log.id();
            let payload = [log.topics.len() as u8];
            batch.put(
                codec::topic_key(&codec::address_value(&log.address), 0, &id),
                payload,
            );
            for (i, topic) in log.topics.iter().enumerate() {
                batch.put(codec::topic_key(topic, (i + 1) as u8, &id), payload);
            }
            batch.put(codec::record_key(&id), log.encode()?);
        }
        log::debug!("indexing {} logs as {} keys", logs.len(), batch.len());
        self.kv.write(batch)
    }

    /// Loads the full record of a confirmed match.
    pub fn resolve(&self, id: &LogId) -> Result<LogRecord> {
        let bytes = self
            .kv
            .get(&codec::record_key(id))?
            .ok_or_else(|| Error::invalid_format("log record", format!("no record for {id}")))?;
        LogRecord::decode(&bytes)
    }

    /// Opens an ordered scan over the logs carrying `value` at `position`,
    /// starting at `from_block` and skipping logs with fewer than `min_topics`
    /// topics.
    pub fn scan(
        &self,
        value: &B256,
        position: u8,
        from_block: u64,
        min_topics: usize,
    ) -> Result<TopicScan> {
        let prefix = codec::topic_prefix(value, position);
        let start = codec::topic_key(value, position, &LogId::block_start(from_block));
        let cursor = self.kv.iter(&prefix, &start)?;
        Ok(TopicScan {
            cursor,
            prefix,
            min_topics: min_topics.min(u8::MAX as usize) as u8,
            current: None,
        })
    }
}

/// Ordered scan over one `(value, position)` prefix of the index.
pub struct TopicScan {
    cursor: Box<dyn KvCursor>,
    prefix: [u8; TOPIC_PREFIX_LEN],
    min_topics: u8,
    current: Option<LogRec>,
}

impl TopicScan {
    fn decode(&self) -> Result<LogRec> {
        let value = self.cursor.value();
        verify_data!(payload, value.len() == 1);
        Ok(LogRec {
            id: codec::topic_key_id(self.cursor.key()),
            topic_count: value[0],
        })
    }

    /// Takes the cursor's entry, or the first acceptable one after it.
    fn settle(&mut self, mut positioned: bool) -> Result<bool> {
        while positioned {
            let rec = self.decode()?;
            if rec.topic_count >= self.min_topics {
                self.current = Some(rec);
                return Ok(true);
            }
            positioned = self.cursor.next()?;
        }
        self.current = None;
        Ok(false)
    }
}

impl OrderedIter for TopicScan {
    type Item = LogRec;

    fn next(&mut self) -> Result<bool> {
        let positioned = self.cursor.next()?;
        self.settle(positioned)
    }

    fn current(&self) -> &LogRec {
        self.current
            .as_ref()
            .expect("TopicScan::current() called while not positioned")
    }

    fn seek(&mut self, target: &LogRec) -> Result<bool> {
        if let Some(current) = &self.current {
            if current.id >= target.id {
                return Ok(true);
            }
        }
        let mut key = [0u8; TOPIC_KEY_LEN];
        key[..TOPIC_PREFIX_LEN].copy_from_slice(&self.prefix);
        key[TOPIC_PREFIX_LEN..].copy_from_slice(target.id.as_bytes());
        let positioned = self.cursor.seek(&key)?;
        self.settle(positioned)
    }

    fn release(&mut self) {
        self.cursor.release();
        self.current = None;
    }
}

impl Drop for TopicScan {
    fn drop(&mut self) {
        self.cursor.release();
    }
}
