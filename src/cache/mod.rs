//! In-process caching for the post listings.
//!
//! Only the unfiltered index listing is cached. The entry lives for a fixed
//! TTL (20 seconds by default, see `feed.index_cache_ttl_seconds`) and is never
//! invalidated by writes, so the index may lag behind new, edited or deleted
//! posts by up to one TTL.

mod lock;
mod store;

pub use store::{DEFAULT_INDEX_TTL, INDEX_CACHE_KEY, PageCache};
