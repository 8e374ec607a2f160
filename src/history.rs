// ABOUTME: Persistence of analysis results and the XP counter behind a narrow trait
// ABOUTME: SQLite (sqlx) implementation plus an in-memory store for tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! # Analysis History Store
//!
//! The orchestrator persists every successful analysis and increments the
//! user's XP counter through this seam. Results are stored as JSON payload
//! rows: the schema stays stable while the result model evolves, and the
//! (external) API layer reads history through the same trait.

use crate::errors::{AppError, AppResult};
use crate::models::AnalysisResult;
use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::sync::Mutex;
use uuid::Uuid;

/// Storage seam for analysis history and the XP counter
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one completed analysis
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the write fails
    async fn save_analysis(&self, result: &AnalysisResult) -> AppResult<()>;

    /// Add XP to a user's running total; returns the new total
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the increment fails
    async fn add_xp(&self, user_id: Uuid, amount: u32) -> AppResult<u32>;

    /// Current XP total for a user
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the read fails
    async fn xp_total(&self, user_id: Uuid) -> AppResult<u32>;

    /// Most recent analyses for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the read fails
    async fn recent_analyses(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<AnalysisResult>>;
}

/// SQLite-backed history store
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Connect and initialize the schema
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the database is unreachable or schema
    /// creation fails
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| AppError::storage("failed to open history database").with_source(e))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> AppResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS analysis_results (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                mode TEXT NOT NULL,
                created_at TEXT NOT NULL,
                payload TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage("failed to create analysis_results").with_source(e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_analysis_results_user
             ON analysis_results (user_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage("failed to create history index").with_source(e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS xp_ledger (
                user_id TEXT PRIMARY KEY,
                total_xp INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage("failed to create xp_ledger").with_source(e))?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn save_analysis(&self, result: &AnalysisResult) -> AppResult<()> {
        let payload = serde_json::to_string(result)?;
        sqlx::query(
            "INSERT INTO analysis_results (id, user_id, mode, created_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(result.id.to_string())
        .bind(result.user_id.to_string())
        .bind(result.mode.as_str())
        .bind(result.created_at.to_rfc3339())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage("failed to persist analysis result").with_source(e))?;
        Ok(())
    }

    async fn add_xp(&self, user_id: Uuid, amount: u32) -> AppResult<u32> {
        sqlx::query(
            "INSERT INTO xp_ledger (user_id, total_xp) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET total_xp = total_xp + excluded.total_xp",
        )
        .bind(user_id.to_string())
        .bind(i64::from(amount))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::storage("failed to increment xp").with_source(e))?;

        self.xp_total(user_id).await
    }

    async fn xp_total(&self, user_id: Uuid) -> AppResult<u32> {
        let row = sqlx::query("SELECT total_xp FROM xp_ledger WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::storage("failed to read xp total").with_source(e))?;

        match row {
            Some(row) => {
                let total: i64 = row
                    .try_get("total_xp")
                    .map_err(|e| AppError::storage("malformed xp row").with_source(e))?;
                Ok(u32::try_from(total).unwrap_or(u32::MAX))
            }
            None => Ok(0),
        }
    }

    async fn recent_analyses(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<AnalysisResult>> {
        let rows = sqlx::query(
            "SELECT payload FROM analysis_results
             WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::storage("failed to read analysis history").with_source(e))?;

        rows.into_iter()
            .map(|row| {
                let payload: String = row
                    .try_get("payload")
                    .map_err(|e| AppError::storage("malformed history row").with_source(e))?;
                Ok(serde_json::from_str(&payload)?)
            })
            .collect()
    }
}

/// In-memory history store for tests and single-process deployments
#[derive(Default)]
pub struct InMemoryHistoryStore {
    results: Mutex<Vec<AnalysisResult>>,
    xp: DashMap<Uuid, u32>,
}

impl InMemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn results_guard(&self) -> std::sync::MutexGuard<'_, Vec<AnalysisResult>> {
        match self.results.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn save_analysis(&self, result: &AnalysisResult) -> AppResult<()> {
        self.results_guard().push(result.clone());
        Ok(())
    }

    async fn add_xp(&self, user_id: Uuid, amount: u32) -> AppResult<u32> {
        let mut entry = self.xp.entry(user_id).or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(*entry)
    }

    async fn xp_total(&self, user_id: Uuid) -> AppResult<u32> {
        Ok(self.xp.get(&user_id).map_or(0, |v| *v))
    }

    async fn recent_analyses(&self, user_id: Uuid, limit: u32) -> AppResult<Vec<AnalysisResult>> {
        let results = self.results_guard();
        Ok(results
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
