use std::time::Duration;

/// Highest number of topics a log may carry (`LOG0` to `LOG4`).
pub const DEFAULT_MAX_TOPICS: usize = 4;

/// Channel depth of prefetched storage scans.
pub const DEFAULT_PREFETCH_DEPTH: usize = 16;

/// Tuning knobs of the topic index and its query engines.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Maximum number of indexable topics per log. Patterns are cut to
    /// `1 + max_topics` positions.
    pub max_topics: usize,
    /// Whether the leap-join engine moves storage scans onto background
    /// producers.
    pub prefetch: bool,
    pub prefetch_depth: usize,
    /// Pause between attempts to acquire worker slots from a busy pool.
    pub acquire_backoff: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            max_topics: DEFAULT_MAX_TOPICS,
            prefetch: true,
            prefetch_depth: DEFAULT_PREFETCH_DEPTH,
            acquire_backoff: Duration::from_millis(1),
        }
    }
}

impl IndexConfig {
    pub fn with_max_topics(mut self, max_topics: usize) -> Self {
        self.max_topics = max_topics;
        self
    }

    pub fn with_prefetch(mut self, enabled: bool) -> Self {
        self.prefetch = enabled;
        self
    }

    pub fn with_prefetch_depth(mut self, depth: usize) -> Self {
        self.prefetch_depth = depth;
        self
    }

    pub fn with_acquire_backoff(mut self, backoff: Duration) -> Self {
        self.acquire_backoff = backoff;
        self
    }
}

/// Number of pattern positions: the address plus one per topic.
pub(crate) fn max_positions(max_topics: usize) -> usize {
    max_topics.saturating_add(1)
}
