// ABOUTME: Nutrition lookup behind a caching resolver; canonical per-100g profiles
// ABOUTME: Cache stores unscaled profiles so entries are reusable across portion sizes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! # Nutrition Resolver
//!
//! Resolution is two-layered: a bounded TTL cache keyed by canonical label
//! in front of the backing [`NutritionStore`]. Cached values are always the
//! *canonical per-100g* profile, never a scaled portion, so one cache entry
//! serves every portion size. Scaling by `grams / 100` happens per request
//! after the lookup.
//!
//! A missing label is a distinct, non-fatal condition (`ResourceNotFound`):
//! the orchestrator substitutes a zero profile for that one item and flags
//! it, so a single unknown ingredient never aborts a multi-item analysis.

use crate::cache::TtlCache;
use crate::config::NutritionConfig;
use crate::errors::{AppError, AppResult};
use crate::intelligence::recommendation::normalize_label;
use crate::models::NutritionProfile;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Backing store of canonical per-100g nutrient profiles
#[async_trait]
pub trait NutritionStore: Send + Sync {
    /// Look up the canonical per-100g profile for a label
    ///
    /// `Ok(None)` means the label is genuinely unknown; transport failures
    /// are errors so the caller can distinguish "missing" from "down".
    ///
    /// # Errors
    ///
    /// Returns `UpstreamUnavailable`/`UpstreamTimeout` on backend failures
    async fn canonical_profile(&self, label: &str) -> AppResult<Option<NutritionProfile>>;
}

/// Portion-scaled nutrition resolution
#[async_trait]
pub trait NutritionResolver: Send + Sync {
    /// Resolve the nutrient profile of `grams` of `label`
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for unknown labels (non-fatal upstream),
    /// or the store's transport error
    async fn resolve(&self, label: &str, grams: f64) -> AppResult<NutritionProfile>;
}

/// In-memory nutrition store seeded with reference data
#[derive(Debug, Clone, Default)]
pub struct InMemoryNutritionStore {
    table: HashMap<String, NutritionProfile>,
}

impl InMemoryNutritionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the built-in per-100g reference table
    #[must_use]
    pub fn with_builtin_table() -> Self {
        let mut store = Self::new();
        for (label, profile) in builtin_table() {
            store.insert(label, profile);
        }
        store
    }

    /// Insert or replace a canonical per-100g profile
    pub fn insert(&mut self, label: impl Into<String>, profile: NutritionProfile) {
        self.table.insert(normalize_label(&label.into()), profile);
    }
}

#[async_trait]
impl NutritionStore for InMemoryNutritionStore {
    async fn canonical_profile(&self, label: &str) -> AppResult<Option<NutritionProfile>> {
        Ok(self.table.get(&normalize_label(label)).cloned())
    }
}

/// Caching resolver in front of a backing store
pub struct CachedNutritionResolver<S: NutritionStore> {
    store: S,
    cache: TtlCache,
    config: NutritionConfig,
}

impl<S: NutritionStore> CachedNutritionResolver<S> {
    #[must_use]
    pub fn new(store: S, config: NutritionConfig) -> Self {
        Self {
            cache: TtlCache::new(config.cache_capacity),
            store,
            config,
        }
    }
}

#[async_trait]
impl<S: NutritionStore> NutritionResolver for CachedNutritionResolver<S> {
    async fn resolve(&self, label: &str, grams: f64) -> AppResult<NutritionProfile> {
        if !grams.is_finite() || grams < 0.0 {
            return Err(AppError::invalid_input("portion mass must be non-negative"));
        }
        let key = normalize_label(label);
        let factor = grams / 100.0;

        if let Some(canonical) = self.cache.get::<NutritionProfile>(&key).await? {
            debug!(label = %key, "nutrition cache hit");
            return Ok(canonical.scale(factor));
        }

        let canonical = self
            .store
            .canonical_profile(&key)
            .await?
            .ok_or_else(|| AppError::not_found(format!("nutrition profile for '{key}'")))?;

        if !canonical.is_non_negative() {
            return Err(AppError::internal(format!(
                "nutrition store returned negative values for '{key}'"
            )));
        }

        // Cache the unscaled canonical profile; concurrent population races
        // are idempotent writes.
        if let Err(error) = self
            .cache
            .set(&key, &canonical, self.config.cache_ttl)
            .await
        {
            warn!(label = %key, %error, "failed to populate nutrition cache");
        }

        Ok(canonical.scale(factor))
    }
}

/// Built-in canonical per-100g reference table
fn builtin_table() -> Vec<(&'static str, NutritionProfile)> {
    fn profile(
        calories: f64,
        protein_g: f64,
        carbs_g: f64,
        fat_g: f64,
        fiber_g: f64,
        sodium_mg: f64,
    ) -> NutritionProfile {
        NutritionProfile {
            calories,
            protein_g,
            carbs_g,
            fat_g,
            fiber_g,
            sodium_mg,
            vitamins: HashMap::new(),
            minerals: HashMap::new(),
        }
    }

    let mut chicken = profile(165.0, 31.0, 0.0, 3.6, 0.0, 74.0);
    chicken.vitamins.insert("b6".into(), 0.6);
    chicken.minerals.insert("potassium".into(), 256.0);

    let mut broccoli = profile(34.0, 2.8, 6.6, 0.4, 2.6, 33.0);
    broccoli.vitamins.insert("c".into(), 89.2);
    broccoli.minerals.insert("iron".into(), 0.7);

    let mut spinach = profile(23.0, 2.9, 3.6, 0.4, 2.2, 79.0);
    spinach.vitamins.insert("a".into(), 0.47);
    spinach.minerals.insert("iron".into(), 2.7);

    vec![
        ("chicken", chicken),
        ("broccoli", broccoli),
        ("spinach", spinach),
        ("rice", profile(130.0, 2.7, 28.0, 0.3, 0.4, 1.0)),
        ("salmon", profile(208.0, 20.0, 0.0, 13.0, 0.0, 59.0)),
        ("egg", profile(155.0, 13.0, 1.1, 11.0, 0.0, 124.0)),
        ("onion", profile(40.0, 1.1, 9.3, 0.1, 1.7, 4.0)),
        ("garlic", profile(149.0, 6.4, 33.0, 0.5, 2.1, 17.0)),
        ("tomato", profile(18.0, 0.9, 3.9, 0.2, 1.2, 5.0)),
        ("banana", profile(89.0, 1.1, 22.8, 0.3, 2.6, 1.0)),
        ("oats", profile(389.0, 16.9, 66.3, 6.9, 10.6, 2.0)),
        ("avocado", profile(160.0, 2.0, 8.5, 14.7, 6.7, 7.0)),
        ("pasta", profile(131.0, 5.0, 25.0, 1.1, 1.8, 1.0)),
        ("apple", profile(52.0, 0.3, 13.8, 0.2, 2.4, 1.0)),
    ]
}
