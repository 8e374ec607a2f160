// ABOUTME: Environment-driven configuration for the analysis pipeline
// ABOUTME: Typed sub-configs per concern with warn-and-fallback env parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! Environment-based configuration management
//!
//! Configuration is environment-only: every knob has a typed default from
//! [`crate::constants::defaults`] and an optional `PLATEFUL_*` environment
//! override. Unparseable values log a warning and fall back to the default
//! rather than failing startup.

use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("invalid value for {key}, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .unwrap_or_else(|_| {
                warn!("invalid millisecond value for {key}, using default");
                default
            }),
        Err(_) => default,
    }
}

/// Daily quota limits for standard-tier users, per category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Daily `food_analyses` limit
    pub food_daily_limit: u32,
    /// Daily `fridge_analyses` limit
    pub fridge_daily_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            food_daily_limit: defaults::FOOD_DAILY_LIMIT,
            fridge_daily_limit: defaults::FRIDGE_DAILY_LIMIT,
        }
    }
}

/// Detection adapter tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Detections below this confidence are discarded entirely
    pub confidence_floor: f64,
    /// Wall-clock budget for one detection call
    pub timeout: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: defaults::DETECTION_CONFIDENCE_FLOOR,
            timeout: defaults::DETECTION_TIMEOUT,
        }
    }
}

/// Vision-description adapter tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Soft deadline: the pipeline proceeds without the description once
    /// this elapses
    pub soft_deadline: Duration,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            soft_deadline: defaults::VISION_SOFT_DEADLINE,
        }
    }
}

/// Nutrition resolver and cache tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionConfig {
    /// TTL for cached canonical per-100g profiles
    pub cache_ttl: Duration,
    /// Maximum distinct labels held in the cache
    pub cache_capacity: usize,
    /// Wall-clock budget for one backend lookup
    pub timeout: Duration,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: defaults::NUTRITION_CACHE_TTL,
            cache_capacity: defaults::NUTRITION_CACHE_CAPACITY,
            timeout: defaults::NUTRITION_TIMEOUT,
        }
    }
}

/// Bounded retry policy for transient upstream failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Backoff before the single retry attempt
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: defaults::RETRY_BACKOFF,
        }
    }
}

/// Recipe matching and recommendation weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Recipes below this ingredient coverage are excluded, not ranked last
    pub min_coverage: f64,
    /// Weight of ingredient coverage in the combined match score
    pub coverage_weight: f64,
    /// Bonus when the recipe's comfort emotion matches exactly
    pub exact_emotion_bonus: f64,
    /// Smaller bonus for emotion-adjacent categories
    pub adjacent_emotion_bonus: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            min_coverage: 0.4,
            coverage_weight: 0.75,
            exact_emotion_bonus: 0.25,
            adjacent_emotion_bonus: 0.125,
        }
    }
}

/// XP awarded per successful analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpConfig {
    pub food_base: u32,
    pub fridge_base: u32,
    pub per_item: u32,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            food_base: 10,
            fridge_base: 15,
            per_item: 2,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub quotas: QuotaConfig,
    pub detection: DetectionConfig,
    pub vision: VisionConfig,
    pub nutrition: NutritionConfig,
    pub retry: RetryConfig,
    pub recommendation: RecommendationConfig,
    pub xp: XpConfig,
    /// Overall deadline for one analysis request
    pub request_deadline: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quotas: QuotaConfig::default(),
            detection: DetectionConfig::default(),
            vision: VisionConfig::default(),
            nutrition: NutritionConfig::default(),
            retry: RetryConfig::default(),
            recommendation: RecommendationConfig::default(),
            xp: XpConfig::default(),
            request_deadline: defaults::REQUEST_DEADLINE,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the environment, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            quotas: QuotaConfig {
                food_daily_limit: env_parse(
                    "PLATEFUL_FOOD_DAILY_LIMIT",
                    defaults::FOOD_DAILY_LIMIT,
                ),
                fridge_daily_limit: env_parse(
                    "PLATEFUL_FRIDGE_DAILY_LIMIT",
                    defaults::FRIDGE_DAILY_LIMIT,
                ),
            },
            detection: DetectionConfig {
                confidence_floor: env_parse(
                    "PLATEFUL_CONFIDENCE_FLOOR",
                    defaults::DETECTION_CONFIDENCE_FLOOR,
                ),
                timeout: env_duration_ms("PLATEFUL_DETECTION_TIMEOUT_MS", defaults::DETECTION_TIMEOUT),
            },
            vision: VisionConfig {
                soft_deadline: env_duration_ms(
                    "PLATEFUL_VISION_SOFT_DEADLINE_MS",
                    defaults::VISION_SOFT_DEADLINE,
                ),
            },
            nutrition: NutritionConfig {
                cache_ttl: env_duration_ms(
                    "PLATEFUL_NUTRITION_CACHE_TTL_MS",
                    defaults::NUTRITION_CACHE_TTL,
                ),
                cache_capacity: env_parse(
                    "PLATEFUL_NUTRITION_CACHE_CAPACITY",
                    defaults::NUTRITION_CACHE_CAPACITY,
                ),
                timeout: env_duration_ms("PLATEFUL_NUTRITION_TIMEOUT_MS", defaults::NUTRITION_TIMEOUT),
            },
            retry: RetryConfig {
                backoff: env_duration_ms("PLATEFUL_RETRY_BACKOFF_MS", defaults::RETRY_BACKOFF),
            },
            recommendation: RecommendationConfig::default(),
            xp: XpConfig::default(),
            request_deadline: env_duration_ms(
                "PLATEFUL_REQUEST_DEADLINE_MS",
                defaults::REQUEST_DEADLINE,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = PipelineConfig::default();
        assert_eq!(config.detection.confidence_floor, 0.5);
        assert!(config.vision.soft_deadline < config.request_deadline);
        assert!(config.detection.timeout < config.request_deadline);
        assert!(config.recommendation.min_coverage > 0.0);
        assert!(config.recommendation.exact_emotion_bonus > config.recommendation.adjacent_emotion_bonus);
    }

    #[test]
    fn test_env_parse_fallback() {
        // Key is absent: default wins
        assert_eq!(env_parse("PLATEFUL_TEST_UNSET_KEY", 7u32), 7);
    }
}
