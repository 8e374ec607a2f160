// ABOUTME: Shared constants for validation limits, physiological baselines, and defaults
// ABOUTME: Single source of truth for values used across the analysis pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! Pipeline-wide constants

/// Service name for structured logging
pub const SERVICE_NAME: &str = "plateful-analysis";

/// Input validation limits enforced before any collaborator is called
pub mod limits {
    /// Minimum accepted heart-rate variability (ms, RMSSD)
    pub const HRV_MIN_MS: f64 = 10.0;

    /// Maximum accepted heart-rate variability (ms, RMSSD)
    pub const HRV_MAX_MS: f64 = 200.0;

    /// Minimum accepted heart rate (bpm)
    pub const HEART_RATE_MIN_BPM: u32 = 30;

    /// Maximum realistic heart rate (bpm), Fox formula upper bound
    pub const HEART_RATE_MAX_BPM: u32 = 220;

    /// Maximum number of images accepted for a fridge analysis
    pub const MAX_FRIDGE_IMAGES: usize = 5;

    /// Maximum accepted image payload (bytes)
    pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
}

/// Physiological baselines for the biometric emotion model
///
/// HRV interpretation follows the common RMSSD framing: sustained values
/// below ~20 ms indicate sympathetic dominance (stress), values above
/// ~100 ms indicate strong parasympathetic recovery. Heart-rate arousal is
/// scaled from a resting floor of 50 bpm across a 70 bpm span.
pub mod baselines {
    /// HRV (ms) at or below which the normalized recovery signal is 0.0
    pub const HRV_NORM_FLOOR_MS: f64 = 20.0;

    /// HRV (ms) at or above which the normalized recovery signal is 1.0
    pub const HRV_NORM_CEIL_MS: f64 = 100.0;

    /// Heart rate (bpm) at or below which the arousal signal is 0.0
    pub const HR_AROUSAL_FLOOR_BPM: f64 = 50.0;

    /// Arousal span (bpm): arousal reaches 1.0 at floor + span
    pub const HR_AROUSAL_SPAN_BPM: f64 = 70.0;
}

/// Default configuration values (overridable via environment, see `config`)
pub mod defaults {
    use std::time::Duration;

    /// Daily food analyses for standard-tier users
    pub const FOOD_DAILY_LIMIT: u32 = 10;

    /// Daily fridge analyses for standard-tier users
    pub const FRIDGE_DAILY_LIMIT: u32 = 5;

    /// Confidence floor below which detections are discarded
    pub const DETECTION_CONFIDENCE_FLOOR: f64 = 0.5;

    /// Wall-clock budget for one detection call
    pub const DETECTION_TIMEOUT: Duration = Duration::from_secs(3);

    /// Soft deadline for the advisory vision-description call
    pub const VISION_SOFT_DEADLINE: Duration = Duration::from_secs(2);

    /// Wall-clock budget for one nutrition backend lookup
    pub const NUTRITION_TIMEOUT: Duration = Duration::from_secs(2);

    /// Overall deadline for a single analysis request
    pub const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

    /// Backoff before the single bounded retry of a transient failure
    pub const RETRY_BACKOFF: Duration = Duration::from_millis(200);

    /// Nutrition cache TTL; nutrient facts rarely change
    pub const NUTRITION_CACHE_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

    /// Nutrition cache capacity (distinct labels)
    pub const NUTRITION_CACHE_CAPACITY: usize = 2048;
}

/// Numeric tolerance for nutrition total reconciliation
pub const RECONCILIATION_EPSILON: f64 = 1e-6;

/// Tolerance for the emotion distribution sum (must be 100 +/- this)
pub const DISTRIBUTION_EPSILON: f64 = 1e-6;
