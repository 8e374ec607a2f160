// ABOUTME: Atomic per-user per-day usage quotas with reserve/commit/release semantics
// ABOUTME: In-memory DashMap backend; reservations are idempotent by request id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! # Daily Usage Quotas
//!
//! One authoritative quota resource: every rate-limited operation goes
//! through the [`QuotaStore`] contract. `check_and_reserve` is a single
//! atomic operation so two requests racing at the limit can never both
//! proceed. A reservation is committed once the analysis is serviced, or
//! released when the pipeline aborts before delivering value.
//!
//! Reservations are keyed by the request id, which makes them idempotent:
//! a retry after an ambiguous failure re-checks whether the reservation
//! already landed instead of double-counting.
//!
//! Counters are keyed by (user, UTC calendar day, category); the day in the
//! key makes windows expire at the next UTC midnight without a cleanup job.
//! Stale windows from previous days are swept lazily on first use of a new
//! day.

use crate::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// A named counter bucket, independently rate-limited per user per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaCategory {
    FoodAnalyses,
    FridgeAnalyses,
    /// Tracked for usage statistics but never enforced
    WellnessChecks,
}

impl QuotaCategory {
    /// Stable string form used in logs and error details
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FoodAnalyses => "food_analyses",
            Self::FridgeAnalyses => "fridge_analyses",
            Self::WellnessChecks => "wellness_checks",
        }
    }
}

/// Outcome of an atomic check-and-reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDecision {
    /// Whether the reservation was granted
    pub allowed: bool,
    /// Requests remaining in the window after this decision
    pub remaining: u32,
    /// When the current window resets (next UTC midnight)
    pub reset_at: DateTime<Utc>,
}

/// Start of the next UTC calendar day
#[must_use]
pub fn next_utc_midnight(today: NaiveDate) -> DateTime<Utc> {
    let next_day = today.succ_opt().unwrap_or(today);
    next_day.and_time(NaiveTime::MIN).and_utc()
}

/// Contract for the single authoritative quota resource
///
/// Implementations must make `check_and_reserve` atomic with respect to
/// concurrent calls for the same (user, day, category) key.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Atomically check the window and reserve one unit if under `limit`
    ///
    /// Re-reserving with the same `reservation_id` is a no-op success, so
    /// callers can safely re-check after an ambiguous failure.
    ///
    /// # Errors
    ///
    /// Returns `QuotaUnavailable` if the backing store is unreachable;
    /// callers fail closed.
    async fn check_and_reserve(
        &self,
        user_id: Uuid,
        category: QuotaCategory,
        limit: u32,
        reservation_id: Uuid,
    ) -> AppResult<QuotaDecision>;

    /// Convert a reservation into committed usage; no-op if never reserved
    /// or already committed
    ///
    /// # Errors
    ///
    /// Returns `QuotaUnavailable` if the backing store is unreachable
    async fn commit(
        &self,
        user_id: Uuid,
        category: QuotaCategory,
        reservation_id: Uuid,
    ) -> AppResult<()>;

    /// Roll back a reservation after a downstream failure; no-op if absent
    ///
    /// # Errors
    ///
    /// Returns `QuotaUnavailable` if the backing store is unreachable
    async fn release(
        &self,
        user_id: Uuid,
        category: QuotaCategory,
        reservation_id: Uuid,
    ) -> AppResult<()>;

    /// Unconditionally count one use of a tracked-but-unenforced category
    ///
    /// # Errors
    ///
    /// Returns `QuotaUnavailable` if the backing store is unreachable
    async fn record(&self, user_id: Uuid, category: QuotaCategory) -> AppResult<u32>;

    /// Committed usage in the current window
    ///
    /// # Errors
    ///
    /// Returns `QuotaUnavailable` if the backing store is unreachable
    async fn committed_usage(&self, user_id: Uuid, category: QuotaCategory) -> AppResult<u32>;
}

/// Key of one usage window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct WindowKey {
    user_id: Uuid,
    date: NaiveDate,
    category: QuotaCategory,
}

/// Mutable state of one usage window
#[derive(Debug, Default)]
struct WindowUsage {
    committed: u32,
    reserved: HashSet<Uuid>,
}

impl WindowUsage {
    fn in_flight(&self) -> u32 {
        self.committed + u32::try_from(self.reserved.len()).unwrap_or(u32::MAX)
    }
}

/// In-memory quota store backed by a concurrent map
///
/// Each `DashMap` entry guard serializes mutation of its window, which is
/// what makes check-and-reserve atomic per (user, day, category).
#[derive(Default)]
pub struct InMemoryQuotaStore {
    windows: DashMap<WindowKey, WindowUsage>,
    last_sweep: Mutex<Option<NaiveDate>>,
}

impl InMemoryQuotaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(user_id: Uuid, category: QuotaCategory, date: NaiveDate) -> WindowKey {
        WindowKey {
            user_id,
            date,
            category,
        }
    }

    /// Drop windows from previous days the first time a new day is seen
    fn sweep_expired(&self, today: NaiveDate) {
        let mut last = match self.last_sweep.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *last == Some(today) {
            return;
        }
        *last = Some(today);
        drop(last);

        let before = self.windows.len();
        self.windows.retain(|key, _| key.date >= today);
        let removed = before - self.windows.len();
        if removed > 0 {
            debug!(removed, "swept expired quota windows");
        }
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn check_and_reserve(
        &self,
        user_id: Uuid,
        category: QuotaCategory,
        limit: u32,
        reservation_id: Uuid,
    ) -> AppResult<QuotaDecision> {
        let today = Utc::now().date_naive();
        self.sweep_expired(today);
        let reset_at = next_utc_midnight(today);

        let mut window = self
            .windows
            .entry(Self::key(user_id, category, today))
            .or_default();

        // Idempotent re-check: the reservation already landed
        if window.reserved.contains(&reservation_id) {
            let remaining = limit.saturating_sub(window.in_flight());
            return Ok(QuotaDecision {
                allowed: true,
                remaining,
                reset_at,
            });
        }

        let in_flight = window.in_flight();
        if in_flight >= limit {
            return Ok(QuotaDecision {
                allowed: false,
                remaining: 0,
                reset_at,
            });
        }

        window.reserved.insert(reservation_id);
        let remaining = limit.saturating_sub(in_flight + 1);
        Ok(QuotaDecision {
            allowed: true,
            remaining,
            reset_at,
        })
    }

    async fn commit(
        &self,
        user_id: Uuid,
        category: QuotaCategory,
        reservation_id: Uuid,
    ) -> AppResult<()> {
        let today = Utc::now().date_naive();
        if let Some(mut window) = self.windows.get_mut(&Self::key(user_id, category, today)) {
            if window.reserved.remove(&reservation_id) {
                window.committed += 1;
            }
        }
        Ok(())
    }

    async fn release(
        &self,
        user_id: Uuid,
        category: QuotaCategory,
        reservation_id: Uuid,
    ) -> AppResult<()> {
        let today = Utc::now().date_naive();
        if let Some(mut window) = self.windows.get_mut(&Self::key(user_id, category, today)) {
            window.reserved.remove(&reservation_id);
        }
        Ok(())
    }

    async fn record(&self, user_id: Uuid, category: QuotaCategory) -> AppResult<u32> {
        let today = Utc::now().date_naive();
        self.sweep_expired(today);
        let mut window = self
            .windows
            .entry(Self::key(user_id, category, today))
            .or_default();
        window.committed += 1;
        Ok(window.committed)
    }

    async fn committed_usage(&self, user_id: Uuid, category: QuotaCategory) -> AppResult<u32> {
        let today = Utc::now().date_naive();
        Ok(self
            .windows
            .get(&Self::key(user_id, category, today))
            .map_or(0, |window| window.committed))
    }
}
