//! The ordered key-value store the index is written to.
//!
//! The index only needs byte-ordered keys, prefix-scoped forward cursors with a
//! lower-bound seek, point lookups and batched writes. [`MemoryStore`] is the
//! in-process implementation.

use std::{
    collections::{BTreeMap, VecDeque},
    ops::Bound,
    sync::{Arc, RwLock},
};

use logdex_common::Result;

/// A set of puts applied atomically by [`KeyValueStore::write`].
#[derive(Debug, Default, Clone)]
pub struct WriteBatch {
    puts: Vec<(Vec<u8>, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> WriteBatch {
        WriteBatch::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.puts.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.puts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    pub fn into_puts(self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.puts
    }
}

pub trait KeyValueStore: Send + Sync {
    /// Applies `batch`; the writes are visible to reads started afterwards.
    fn write(&self, batch: WriteBatch) -> Result<()>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Opens a cursor over the keys starting with `prefix`, positioned before
    /// the first key `>= start`. An empty `start` means the whole prefix.
    fn iter(&self, prefix: &[u8], start: &[u8]) -> Result<Box<dyn KvCursor>>;
}

/// Forward cursor over a key range.
///
/// `key` and `value` are valid only after `next` or `seek` returned `true`.
pub trait KvCursor: Send {
    fn next(&mut self) -> Result<bool>;

    fn key(&self) -> &[u8];

    fn value(&self) -> &[u8];

    /// Moves to the first key `>= key`. Never moves backwards.
    fn seek(&mut self, key: &[u8]) -> Result<bool>;

    fn release(&mut self);
}

type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

/// Number of entries a [`MemoryStore`] cursor copies out per refill.
const DEFAULT_REFILL: usize = 64;

/// Ordered map behind a read/write lock.
///
/// Cursors do not pin the map: they copy entries out in small batches and take
/// the read lock once per batch, so writers are never blocked by a long scan.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<Entries>>,
    refill: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::with_refill_size(DEFAULT_REFILL)
    }

    pub fn with_refill_size(refill: usize) -> MemoryStore {
        MemoryStore {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            refill: refill.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        for (key, value) in batch.into_puts() {
            entries.insert(key, value);
        }
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn iter(&self, prefix: &[u8], start: &[u8]) -> Result<Box<dyn KvCursor>> {
        let start = if start > prefix { start } else { prefix };
        Ok(Box::new(MemoryCursor {
            entries: self.entries.clone(),
            prefix: prefix.to_vec(),
            resume: Bound::Included(start.to_vec()),
            buffer: VecDeque::new(),
            current: None,
            exhausted: false,
            refill: self.refill,
        }))
    }
}

struct MemoryCursor {
    entries: Arc<RwLock<Entries>>,
    prefix: Vec<u8>,
    /// Where the next refill starts reading.
    resume: Bound<Vec<u8>>,
    buffer: VecDeque<(Vec<u8>, Vec<u8>)>,
    current: Option<(Vec<u8>, Vec<u8>)>,
    exhausted: bool,
    refill: usize,
}

impl MemoryCursor {
    fn fill(&mut self) {
        let entries = self.entries.read().unwrap();
        let lower = match &self.resume {
            Bound::Included(key) => Bound::Included(key.as_slice()),
            Bound::Excluded(key) => Bound::Excluded(key.as_slice()),
            Bound::Unbounded => Bound::Unbounded,
        };
        self.buffer.extend(
            entries
                .range::<[u8], _>((lower, Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(&self.prefix))
                .take(self.refill)
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        match self.buffer.back() {
            Some((key, _)) => self.resume = Bound::Excluded(key.clone()),
            None => self.exhausted = true,
        }
    }

    fn current(&self) -> &(Vec<u8>, Vec<u8>) {
        self.current
            .as_ref()
            .expect("cursor accessed while not positioned")
    }
}

impl KvCursor for MemoryCursor {
    fn next(&mut self) -> Result<bool> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill();
        }
        self.current = self.buffer.pop_front();
        if self.current.is_none() {
            self.exhausted = true;
        }
        Ok(self.current.is_some())
    }

    fn key(&self) -> &[u8] {
        &self.current().0
    }

    fn value(&self) -> &[u8] {
        &self.current().1
    }

    fn seek(&mut self, key: &[u8]) -> Result<bool> {
        if let Some((current, _)) = &self.current {
            if current.as_slice() >= key {
                return Ok(true);
            }
        }
        while self
            .buffer
            .front()
            .is_some_and(|(buffered, _)| buffered.as_slice() < key)
        {
            self.buffer.pop_front();
        }
        if self.buffer.is_empty() && !self.exhausted {
            let ahead = match &self.resume {
                Bound::Included(resume) | Bound::Excluded(resume) => resume.as_slice() < key,
                Bound::Unbounded => true,
            };
            if ahead {
                self.resume = Bound::Included(key.to_vec());
            }
        }
        self.next()
    }

    fn release(&mut self) {
        self.buffer.clear();
        self.current = None;
        self.exhausted = true;
    }
}
