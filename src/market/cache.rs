//! Time-bounded quote cache shared across requests.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Roughly 30 years; stands in for "never" when an addition would overflow.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Returns `start + span`, clamped to a far-future instant on overflow.
#[must_use]
pub fn instant_after(start: Instant, span: Duration) -> Instant {
    start
        .checked_add(span)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

/// A cached value and the instant it stops being valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    /// Cached quantity.
    pub value: f64,
    /// Entry is valid strictly before this instant.
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Returns `true` if the entry is still valid at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Lazily-expiring key/value store for market quantities.
///
/// Entries are never evicted; an expired entry is simply reported as a miss
/// and overwritten by the next [`QuoteCache::set`]. The lock is held only for
/// the map access itself.
#[derive(Debug)]
pub struct QuoteCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl QuoteCache {
    /// Creates an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Configured time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value for `key` if present and not expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        let now = Instant::now();
        let entry = self.entries.read().get(key).copied();

        match entry {
            Some(entry) if entry.is_fresh(now) => {
                debug!("Cache hit for {}", key);
                Some(entry.value)
            }
            Some(_) => {
                debug!("Cache entry expired for {}", key);
                None
            }
            None => {
                debug!("Cache miss for {}", key);
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous entry and
    /// restarting its TTL.
    pub fn set(&self, key: impl Into<String>, value: f64) {
        let entry = CacheEntry {
            value,
            expires_at: instant_after(Instant::now(), self.ttl),
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Raw entry for `key`, regardless of freshness.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().get(key).copied()
    }

    /// Number of stored entries, including expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing has ever been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
