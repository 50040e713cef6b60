use std::time::{Duration, Instant};

/// Single-value read-through cache with a fixed time-to-live.
///
/// Concurrent misses may both recompute; the loaders behind it are
/// idempotent reads, so the last `set` simply wins.
pub struct TtlCache<T> {
    ttl: Duration,
    entry: Option<(T, Instant)>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn get(&self) -> Option<T> {
        self.get_at(Instant::now())
    }

    fn get_at(&self, now: Instant) -> Option<T> {
        self.entry
            .as_ref()
            .filter(|(_, stored_at)| now.saturating_duration_since(*stored_at) <= self.ttl)
            .map(|(value, _)| value.clone())
    }

    pub fn set(&mut self, value: T) {
        self.entry = Some((value, Instant::now()));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
