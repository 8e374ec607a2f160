// ABOUTME: Deterministic biometric emotion classifier over HRV and heart rate
// ABOUTME: Weighted affinities per emotion, normalized to a distribution summing to 100
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! Emotion Classifier
//!
//! Maps one biometric reading to a probability-like distribution over the
//! fixed eight-emotion taxonomy. The model is a pure function of two
//! normalized signals:
//!
//! - **recovery** `h`: HRV scaled linearly across the RMSSD interpretation
//!   band (20 ms -> 0.0, 100 ms -> 1.0). Low HRV indicates sympathetic
//!   dominance.
//! - **arousal** `a`: heart rate scaled from a 50 bpm resting floor across
//!   a 70 bpm span.
//!
//! Each emotion's affinity is a fixed linear combination of `h`, `a`, and
//! their complements. The eight affinities are normalized to sum to 100
//! (the distribution); the reported `score` is the winning emotion's raw
//! affinity on a 0-100 scale, so a strongly stressed reading scores high
//! regardless of how the remaining mass spreads.
//!
//! No I/O and no randomness: identical inputs always produce identical
//! readings.

use crate::constants::baselines;
use crate::errors::AppResult;
use crate::models::{BiometricReading, Emotion, EmotionReading};
use std::collections::HashMap;

/// Per-emotion affinity weights applied to the normalized signals
///
/// Affinity = `w_h * h + w_inv_h * (1 - h) + w_a * a + w_inv_a * (1 - a) + bias`
#[derive(Debug, Clone, Copy)]
struct AffinityWeights {
    w_h: f64,
    w_inv_h: f64,
    w_a: f64,
    w_inv_a: f64,
    bias: f64,
}

const fn weights(w_h: f64, w_inv_h: f64, w_a: f64, w_inv_a: f64, bias: f64) -> AffinityWeights {
    AffinityWeights {
        w_h,
        w_inv_h,
        w_a,
        w_inv_a,
        bias,
    }
}

/// The fixed affinity model, in taxonomy order
const AFFINITY_MODEL: [(Emotion, AffinityWeights); 8] = [
    (Emotion::Calm, weights(0.60, 0.0, 0.0, 0.40, 0.0)),
    (Emotion::Happy, weights(0.45, 0.0, 0.0, 0.25, 0.15)),
    (Emotion::Excited, weights(0.30, 0.0, 0.55, 0.0, 0.0)),
    (Emotion::Focused, weights(0.40, 0.0, 0.35, 0.0, 0.0)),
    (Emotion::Tired, weights(0.0, 0.30, 0.0, 0.45, 0.0)),
    (Emotion::Stressed, weights(0.0, 0.60, 0.40, 0.0, 0.0)),
    (Emotion::Anxious, weights(0.0, 0.45, 0.45, 0.0, 0.0)),
    (Emotion::Sad, weights(0.0, 0.35, 0.0, 0.35, 0.0)),
];

/// Pure biometric emotion classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct EmotionClassifier;

impl EmotionClassifier {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classify one biometric reading
    ///
    /// Inputs are validated against physiological plausibility ranges
    /// before any scoring; the orchestrator also rejects implausible
    /// readings before dispatch, so a failure here means a programming
    /// error in the caller.
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` when HRV or heart rate is implausible
    pub fn classify(&self, reading: &BiometricReading) -> AppResult<EmotionReading> {
        reading.validate()?;

        let h = ((reading.hrv_ms - baselines::HRV_NORM_FLOOR_MS)
            / (baselines::HRV_NORM_CEIL_MS - baselines::HRV_NORM_FLOOR_MS))
            .clamp(0.0, 1.0);
        let a = ((f64::from(reading.heart_rate_bpm) - baselines::HR_AROUSAL_FLOOR_BPM)
            / baselines::HR_AROUSAL_SPAN_BPM)
            .clamp(0.0, 1.0);

        let affinities: Vec<(Emotion, f64)> = AFFINITY_MODEL
            .iter()
            .map(|(emotion, w)| {
                let affinity = w.w_h * h
                    + w.w_inv_h * (1.0 - h)
                    + w.w_a * a
                    + w.w_inv_a * (1.0 - a)
                    + w.bias;
                (*emotion, affinity.max(0.0))
            })
            .collect();

        let sum: f64 = affinities.iter().map(|(_, v)| v).sum();

        // Ties resolve to the first emotion in taxonomy order, which keeps
        // the classifier deterministic.
        let (dominant, peak) = affinities
            .iter()
            .copied()
            .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
            .unwrap_or((Emotion::Calm, 0.0));

        let distribution: HashMap<Emotion, f64> = affinities
            .iter()
            .map(|(emotion, v)| (*emotion, if sum > 0.0 { v / sum * 100.0 } else { 12.5 }))
            .collect();

        Ok(EmotionReading {
            emotion: dominant,
            score: (peak * 100.0).clamp(0.0, 100.0),
            distribution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DISTRIBUTION_EPSILON;

    fn classify(hrv: f64, hr: u32) -> EmotionReading {
        EmotionClassifier::new()
            .classify(&BiometricReading::new(hrv, hr))
            .unwrap()
    }

    #[test]
    fn test_low_hrv_high_hr_reads_stressed() {
        let reading = classify(35.0, 95);
        assert_eq!(reading.emotion, Emotion::Stressed);
        assert!(
            reading.score >= 60.0,
            "stressed score {} below documented high range",
            reading.score
        );
    }

    #[test]
    fn test_high_hrv_resting_hr_reads_calm() {
        let reading = classify(70.0, 65);
        assert_eq!(reading.emotion, Emotion::Calm);
    }

    #[test]
    fn test_distribution_sums_to_one_hundred() {
        for (hrv, hr) in [(35.0, 95), (70.0, 65), (10.0, 220), (200.0, 30), (55.0, 80)] {
            let reading = classify(hrv, hr);
            let sum: f64 = reading.distribution.values().sum();
            assert!(
                (sum - 100.0).abs() <= DISTRIBUTION_EPSILON,
                "distribution for ({hrv}, {hr}) sums to {sum}"
            );
            assert_eq!(reading.distribution.len(), 8);
        }
    }

    #[test]
    fn test_type_is_argmax_of_distribution() {
        for (hrv, hr) in [(35.0, 95), (70.0, 65), (45.0, 120), (120.0, 55)] {
            let reading = classify(hrv, hr);
            let argmax = reading
                .distribution
                .iter()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(emotion, _)| *emotion)
                .unwrap();
            assert_eq!(reading.emotion, argmax, "mismatch for ({hrv}, {hr})");
        }
    }

    #[test]
    fn test_classifier_is_deterministic() {
        let first = classify(42.0, 88);
        let second = classify(42.0, 88);
        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_range_inputs_rejected() {
        let classifier = EmotionClassifier::new();
        assert!(classifier
            .classify(&BiometricReading::new(5.0, 80))
            .is_err());
        assert!(classifier
            .classify(&BiometricReading::new(80.0, 250))
            .is_err());
    }
}
