// ABOUTME: Integration tests for the caching nutrition resolver
// ABOUTME: Canonical unscaled caching, portion scaling, TTL expiry, backend hit counting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

mod common;

use async_trait::async_trait;
use plateful::config::NutritionConfig;
use plateful::errors::AppResult;
use plateful::models::NutritionProfile;
use plateful::nutrition::{
    CachedNutritionResolver, InMemoryNutritionStore, NutritionResolver, NutritionStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Wraps the built-in store and counts actual backend hits, shareable so
/// the count stays observable after the resolver takes its copy
#[derive(Clone)]
struct CountingStore {
    inner: Arc<InMemoryNutritionStore>,
    hits: Arc<AtomicUsize>,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryNutritionStore::with_builtin_table()),
            hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NutritionStore for CountingStore {
    async fn canonical_profile(&self, label: &str) -> AppResult<Option<NutritionProfile>> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.inner.canonical_profile(label).await
    }
}

#[tokio::test]
async fn test_cache_serves_all_portion_sizes_from_one_entry() {
    let store = CountingStore::new();
    let resolver = CachedNutritionResolver::new(store.clone(), NutritionConfig::default());

    // Cooked rice is 130 kcal per 100g in the reference table
    let small = resolver.resolve("rice", 50.0).await.unwrap();
    let large = resolver.resolve("rice", 250.0).await.unwrap();
    let exact = resolver.resolve("rice", 100.0).await.unwrap();

    assert!((small.calories - 65.0).abs() < 1e-9);
    assert!((large.calories - 325.0).abs() < 1e-9);
    assert!((exact.calories - 130.0).abs() < 1e-9);

    // One backend hit despite three portion sizes: the cache holds the
    // canonical per-100g profile, not a scaled portion.
    assert_eq!(store.hits(), 1);
}

#[tokio::test]
async fn test_distinct_labels_miss_independently() {
    let store = CountingStore::new();
    let resolver = CachedNutritionResolver::new(store.clone(), NutritionConfig::default());

    for grams in [30.0, 90.0, 180.0] {
        resolver.resolve("broccoli", grams).await.unwrap();
    }
    assert_eq!(store.hits(), 1);

    resolver.resolve("salmon", 100.0).await.unwrap();
    assert_eq!(store.hits(), 2);
}

#[tokio::test]
async fn test_ttl_expiry_refetches_from_backend() {
    let store = CountingStore::new();
    let config = NutritionConfig {
        cache_ttl: Duration::from_millis(30),
        ..NutritionConfig::default()
    };
    let resolver = CachedNutritionResolver::new(store.clone(), config);

    resolver.resolve("egg", 100.0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    resolver.resolve("egg", 100.0).await.unwrap();

    assert_eq!(store.hits(), 2);
}

#[tokio::test]
async fn test_unknown_label_not_cached_as_present() {
    let store = CountingStore::new();
    let resolver = CachedNutritionResolver::new(store.clone(), NutritionConfig::default());

    assert!(resolver.resolve("unobtainium", 100.0).await.is_err());
    assert!(resolver.resolve("unobtainium", 100.0).await.is_err());
    // Misses are not negatively cached; both calls reach the backend
    assert_eq!(store.hits(), 2);
}

#[tokio::test]
async fn test_resolved_values_are_non_negative() {
    let resolver = CachedNutritionResolver::new(
        InMemoryNutritionStore::with_builtin_table(),
        NutritionConfig::default(),
    );
    for label in ["chicken", "broccoli", "rice", "oats", "avocado"] {
        let profile = resolver.resolve(label, 75.0).await.unwrap();
        assert!(profile.is_non_negative(), "{label} produced negative values");
    }
}
