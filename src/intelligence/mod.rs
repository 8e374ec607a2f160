// ABOUTME: Analysis engines: biometric emotion classification and recommendations
// ABOUTME: Pure, deterministic logic with no I/O so every engine is unit-testable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! Intelligence engines for the analysis pipeline

/// Biometric-to-emotion classification
pub mod emotion;
/// Recommendation texts, wellness advice, and recipe matching
pub mod recommendation;

pub use emotion::EmotionClassifier;
pub use recommendation::{Recipe, RecipeCatalog, RecommendationEngine};
