// ABOUTME: Bounded TTL cache with LRU eviction used by the nutrition resolver
// ABOUTME: Stores JSON-serialized values, expires on read, never blocks callers on cleanup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! In-memory TTL cache
//!
//! A small serialize-to-bytes cache: values are stored JSON-encoded with an
//! expiry instant, evicted LRU on capacity, and dropped lazily when read
//! after expiry. Writes are idempotent, so concurrent population races are
//! harmless.

use crate::errors::AppResult;
use lru::LruCache;
use serde::{de::DeserializeOwned, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Bounded TTL cache with LRU eviction
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
}

impl TtlCache {
    /// Fallback capacity when a zero capacity is configured
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1024) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a cache holding at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(Self::DEFAULT_CAPACITY);
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
        }
    }

    /// Store a value with a TTL
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> AppResult<()> {
        let serialized = serde_json::to_vec(value)?;
        let entry = CacheEntry::new(serialized, ttl);

        // LruCache evicts automatically on push
        self.store.write().await.push(key.to_owned(), entry);
        Ok(())
    }

    /// Retrieve a value, dropping it if expired
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut store = self.store.write().await;

        // LruCache::get is mutable (updates access order)
        if let Some(entry) = store.get(key) {
            if entry.is_expired() {
                store.pop(key);
                drop(store);
                return Ok(None);
            }
            let value: T = serde_json::from_slice(&entry.data)?;
            drop(store);
            return Ok(Some(value));
        }
        drop(store);

        Ok(None)
    }

    /// Number of live (possibly expired, not yet collected) entries
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}
