// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for decoded memory lists.
//!
//! Caches the view-function result per address so repeated list requests
//! do not hit the node. Entries are invalidated when a relay for the same
//! address lands.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::types::ChainMemoryRecord;

/// Default number of addresses kept.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15);

struct CacheEntry {
    records: Vec<ChainMemoryRecord>,
    inserted_at: Instant,
}

/// In-process LRU cache for hot address lookups.
pub struct MemoryCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl MemoryCache {
    /// Create a new cache with the given capacity and TTL.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Cached records for an address, if present and fresh.
    pub fn get(&self, address: &str) -> Option<Vec<ChainMemoryRecord>> {
        let key = address.to_lowercase();
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.records.clone());
            }
            // Expired
            cache.pop(&key);
        }
        None
    }

    pub fn put(&self, address: &str, records: Vec<ChainMemoryRecord>) {
        let key = address.to_lowercase();
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    records,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    pub fn invalidate(&self, address: &str) {
        let key = address.to_lowercase();
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&key);
        }
    }
}
