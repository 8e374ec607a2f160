// ABOUTME: Main library entry point for the Plateful analysis pipeline
// ABOUTME: Orchestrates detection, vision, emotion, nutrition, and recommendations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

#![deny(unsafe_code)]

//! # Plateful Analysis Pipeline
//!
//! The core of the Plateful backend: takes a single user submission (a food
//! photo, a set of fridge photos, or a biometric reading) and fuses results
//! from several independent, failure-prone collaborators into one coherent
//! [`AnalysisReport`](models::AnalysisReport), while enforcing per-user
//! daily usage quotas that stay consistent under concurrent requests.
//!
//! ## Architecture
//!
//! Small trait seams per concern, composed explicitly in the orchestrator's
//! constructor:
//!
//! - **[`providers`]**: `Detector` and `Describer` adapters over external
//!   model services
//! - **[`intelligence`]**: pure emotion classification and the
//!   recommendation/recipe engine
//! - **[`nutrition`]**: cached canonical per-100g profile resolution
//! - **[`quota`]**: atomic daily check-and-reserve/commit/release counters
//! - **[`history`]**: persisted results and the XP counter
//! - **[`orchestrator`]**: the per-request state machine tying it together
//!
//! ## Example
//!
//! ```rust,no_run
//! use plateful::config::PipelineConfig;
//! use plateful::history::InMemoryHistoryStore;
//! use plateful::nutrition::{CachedNutritionResolver, InMemoryNutritionStore};
//! use plateful::orchestrator::AnalysisOrchestrator;
//! use plateful::providers::{HttpDescriber, HttpDetector};
//! use plateful::quota::InMemoryQuotaStore;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), plateful::errors::AppError> {
//! let config = PipelineConfig::from_env();
//! let orchestrator = AnalysisOrchestrator::new(
//!     Arc::new(HttpDetector::new(
//!         "http://detector.internal",
//!         config.detection.confidence_floor,
//!         config.detection.timeout,
//!     )?),
//!     Arc::new(HttpDescriber::new(
//!         "http://vision.internal",
//!         config.vision.soft_deadline,
//!     )?),
//!     Arc::new(CachedNutritionResolver::new(
//!         InMemoryNutritionStore::with_builtin_table(),
//!         config.nutrition.clone(),
//!     )),
//!     Arc::new(InMemoryQuotaStore::new()),
//!     Arc::new(InMemoryHistoryStore::new()),
//!     config,
//! );
//! # let _ = orchestrator;
//! # Ok(())
//! # }
//! ```

/// Bounded TTL cache used by the nutrition resolver
pub mod cache;
/// Environment-driven pipeline configuration
pub mod config;
/// Validation limits, physiological baselines, and defaults
pub mod constants;
/// Unified error taxonomy
pub mod errors;
/// Analysis result persistence and the XP counter
pub mod history;
/// Emotion classification and recommendations
pub mod intelligence;
/// Structured logging setup
pub mod logging;
/// Shared domain models
pub mod models;
/// Nutrition profile resolution and caching
pub mod nutrition;
/// The per-request analysis state machine
pub mod orchestrator;
/// External detection and vision service adapters
pub mod providers;
/// Atomic daily usage quotas
pub mod quota;
