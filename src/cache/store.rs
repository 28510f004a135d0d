//! Single-slot time-to-live cache.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::counter;
use time::OffsetDateTime;
use tracing::debug;

use crate::util::clock::Clock;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Key of the only entry the index listing cache holds.
pub const INDEX_CACHE_KEY: &str = "index_page";

/// Default lifetime of the cached index listing.
pub const DEFAULT_INDEX_TTL: Duration = Duration::from_secs(20);

struct Entry<T> {
    value: T,
    expires_at: OffsetDateTime,
}

/// Caches one value under a fixed key until its TTL runs out.
///
/// Writes elsewhere in the system never clear this cache: a reader may see a
/// snapshot up to one TTL old. An entry counts as expired once
/// `now >= stored_at + ttl`.
pub struct PageCache<T> {
    key: &'static str,
    entry: RwLock<Option<Entry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> PageCache<T> {
    pub fn new(key: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self {
            key,
            entry: RwLock::new(None),
            clock,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Return the cached value if present and not expired.
    pub fn get(&self) -> Option<T> {
        let now = self.clock.now();
        let guard = rw_read(&self.entry, SOURCE, "get");
        match guard.as_ref() {
            Some(entry) if now < entry.expires_at => {
                counter!("yatube_page_cache_hit_total", "key" => self.key).increment(1);
                Some(entry.value.clone())
            }
            Some(_) => {
                counter!("yatube_page_cache_expired_total", "key" => self.key).increment(1);
                debug!(key = self.key, "page cache entry expired");
                None
            }
            None => {
                counter!("yatube_page_cache_miss_total", "key" => self.key).increment(1);
                None
            }
        }
    }

    /// Store `value`, replacing whatever was cached, until `now + ttl`.
    pub fn set(&self, value: T, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        *rw_write(&self.entry, SOURCE, "set") = Some(Entry { value, expires_at });
        debug!(key = self.key, ttl_secs = ttl.as_secs(), "page cache entry stored");
    }
}
