//! Response caching for idempotent catalogue queries.
//!
//! # Responsibilities
//! - Bound memory with oldest-first capacity eviction
//! - Expire entries lazily at lookup time (TTL)
//! - Track recency: a touched entry moves to the newest position
//!
//! # Design Decisions
//! - Two independent eviction signals: TTL removes an expired entry on
//!   lookup even below capacity; capacity eviction removes the
//!   structurally-oldest entry regardless of remaining TTL
//! - Ordering lives in the map itself (`IndexMap` with move-to-end on
//!   access), so both policies are observable without bookkeeping maps
//! - One mutex guards the whole compound check/evict/insert sequence;
//!   operations are short and never held across an await

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::observability::metrics;

/// TTL classification of an upstream path.
///
/// A trailing purely-numeric path segment marks a single-item detail
/// lookup; everything else is treated as a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Listing,
    Detail,
}

impl TtlClass {
    pub fn for_path(path: &str) -> Self {
        let last = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
            TtlClass::Detail
        } else {
            TtlClass::Listing
        }
    }
}

struct CacheEntry {
    data: Value,
    expires_at: Instant,
}

/// A successful lookup: the stored value plus its remaining freshness.
pub struct CacheHit {
    pub data: Value,
    pub fresh_for: Duration,
}

/// Bounded in-memory cache keyed by canonical upstream URL.
pub struct ResponseCache {
    entries: Mutex<IndexMap<String, CacheEntry>>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a key. Expired entries are evicted here rather than by a
    /// background sweep; a live hit becomes the newest entry.
    pub fn get(&self, key: &str) -> Option<CacheHit> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let index = entries.get_index_of(key)?;
        let now = Instant::now();
        let expires_at = entries[index].expires_at;
        if now >= expires_at {
            entries.shift_remove_index(index);
            return None;
        }
        let newest = entries.len() - 1;
        entries.move_index(index, newest);
        Some(CacheHit {
            data: entries[newest].data.clone(),
            fresh_for: expires_at - now,
        })
    }

    /// Insert or overwrite a key. A new key at capacity first evicts the
    /// structurally-oldest entry (the one untouched longest).
    pub fn set(&self, key: &str, data: Value, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = CacheEntry {
            data,
            expires_at: Instant::now() + ttl,
        };
        if let Some(index) = entries.get_index_of(key) {
            entries[index] = entry;
            let newest = entries.len() - 1;
            entries.move_index(index, newest);
        } else {
            if entries.len() >= self.max_entries {
                entries.shift_remove_index(0);
            }
            entries.insert(key.to_string(), entry);
        }
        metrics::record_cache_size(entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
