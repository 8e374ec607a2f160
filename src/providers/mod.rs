// ABOUTME: Provider trait seams for the external detection and vision services
// ABOUTME: Concrete HTTP adapters convert provider DTOs into shared domain models
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! # Pluggable Provider Architecture
//!
//! The orchestrator talks to external model services only through the
//! narrow traits in this module. Concrete adapters own their DTOs and
//! conversion logic internally and expose shared domain models, so the
//! orchestration logic stays testable with fakes.

/// Object-detection adapter over an HTTP model service
pub mod detector;
/// Vision-description adapter over an HTTP multimodal service
pub mod vision;

use crate::errors::AppResult;
use crate::models::{DetectedItem, ImageInput};
use async_trait::async_trait;

pub use detector::HttpDetector;
pub use vision::HttpDescriber;

/// Food/ingredient object detection
///
/// Implementations enforce the confidence floor themselves: items below
/// threshold are discarded, not flagged, because downstream nutrition and
/// recommendation logic assumes usable labels. An empty vector means "the
/// detector answered and found nothing usable" and is distinct from an
/// error.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect candidate food items in one image
    ///
    /// # Errors
    ///
    /// Returns `UpstreamTimeout` or `UpstreamUnavailable` on transport
    /// failures; both are retryable exactly once by the orchestrator
    async fn detect(&self, image: &ImageInput) -> AppResult<Vec<DetectedItem>>;
}

/// Advisory free-text enrichment for a detection set
///
/// This collaborator is never required: the orchestrator bounds it with a
/// soft deadline and proceeds without enrichment on any failure.
#[async_trait]
pub trait Describer: Send + Sync {
    /// Describe an image, optionally steered by already-detected labels
    ///
    /// # Errors
    ///
    /// Returns `UpstreamTimeout` or `UpstreamUnavailable` on transport
    /// failures; the orchestrator degrades instead of propagating
    async fn describe(&self, image: &ImageInput, labels: &[String]) -> AppResult<String>;
}
