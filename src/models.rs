// ABOUTME: Domain models for analysis requests, detections, nutrition, emotions, and results
// ABOUTME: Includes request validation enforced before quota or any collaborator is touched
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! Shared domain models for the analysis pipeline

use crate::constants::{limits, RECONCILIATION_EPSILON};
use crate::errors::{AppError, AppResult};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Analysis mode requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Single food photo, per-item nutrition breakdown
    Food,
    /// Up to five fridge/pantry photos, recipe matching
    Fridge,
    /// Biometric-only wellness check, no images
    Wellness,
}

impl AnalysisMode {
    /// Stable string form used in logs and persisted rows
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Fridge => "fridge",
            Self::Wellness => "wellness",
        }
    }
}

/// Subscription tier of the requesting user
///
/// Tier resolution happens in the (external) auth layer; the pipeline only
/// needs to know whether daily quotas apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserTier {
    /// Standard tier, subject to daily per-category quotas
    #[default]
    Standard,
    /// Unlimited tier, bypasses quota checks entirely
    Unlimited,
}

/// The authenticated user on whose behalf an analysis runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: Uuid,
    pub tier: UserTier,
}

impl Requester {
    #[must_use]
    pub const fn new(user_id: Uuid, tier: UserTier) -> Self {
        Self { user_id, tier }
    }
}

/// Supported image container formats, sniffed from magic numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Sniff the container format from leading magic bytes
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }
}

/// Raw image payload submitted by the client
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Bytes,
}

impl ImageInput {
    #[must_use]
    pub const fn new(bytes: Bytes) -> Self {
        Self { bytes }
    }

    /// Validate the payload: non-empty, bounded, and a supported format
    ///
    /// # Errors
    ///
    /// Returns `ImageUnreadable` for empty, oversized, or unrecognized data
    pub fn validate(&self) -> AppResult<ImageFormat> {
        if self.bytes.is_empty() {
            return Err(AppError::image_unreadable("empty image payload"));
        }
        if self.bytes.len() > limits::MAX_IMAGE_BYTES {
            return Err(AppError::image_unreadable(format!(
                "image exceeds {} byte limit",
                limits::MAX_IMAGE_BYTES
            )));
        }
        ImageFormat::sniff(&self.bytes)
            .ok_or_else(|| AppError::image_unreadable("unsupported or corrupt image data"))
    }
}

/// A wearable biometric sample accompanying a request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiometricReading {
    /// Heart-rate variability (RMSSD, milliseconds)
    pub hrv_ms: f64,
    /// Heart rate (beats per minute)
    pub heart_rate_bpm: u32,
}

impl BiometricReading {
    #[must_use]
    pub const fn new(hrv_ms: f64, heart_rate_bpm: u32) -> Self {
        Self {
            hrv_ms,
            heart_rate_bpm,
        }
    }

    /// Validate against physiological plausibility ranges
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` when HRV or heart rate is implausible
    pub fn validate(&self) -> AppResult<()> {
        if !self.hrv_ms.is_finite()
            || self.hrv_ms < limits::HRV_MIN_MS
            || self.hrv_ms > limits::HRV_MAX_MS
        {
            return Err(AppError::value_out_of_range(format!(
                "hrv must be within [{}, {}] ms",
                limits::HRV_MIN_MS,
                limits::HRV_MAX_MS
            )));
        }
        if self.heart_rate_bpm < limits::HEART_RATE_MIN_BPM
            || self.heart_rate_bpm > limits::HEART_RATE_MAX_BPM
        {
            return Err(AppError::value_out_of_range(format!(
                "heart rate must be within [{}, {}] bpm",
                limits::HEART_RATE_MIN_BPM,
                limits::HEART_RATE_MAX_BPM
            )));
        }
        Ok(())
    }
}

/// An immutable analysis request, owned by the orchestrator for its lifetime
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub id: Uuid,
    pub requester: Requester,
    pub mode: AnalysisMode,
    pub images: Vec<ImageInput>,
    pub biometrics: Option<BiometricReading>,
    pub submitted_at: DateTime<Utc>,
}

impl AnalysisRequest {
    /// Build a food-mode request (exactly one image)
    #[must_use]
    pub fn food(
        requester: Requester,
        image: ImageInput,
        biometrics: Option<BiometricReading>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester,
            mode: AnalysisMode::Food,
            images: vec![image],
            biometrics,
            submitted_at: Utc::now(),
        }
    }

    /// Build a fridge-mode request (one to five images)
    #[must_use]
    pub fn fridge(
        requester: Requester,
        images: Vec<ImageInput>,
        biometrics: Option<BiometricReading>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester,
            mode: AnalysisMode::Fridge,
            images,
            biometrics,
            submitted_at: Utc::now(),
        }
    }

    /// Validate request shape before quota or any collaborator is called
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput`, `ImageUnreadable`, or `ValueOutOfRange`
    pub fn validate(&self) -> AppResult<()> {
        match self.mode {
            AnalysisMode::Food => {
                if self.images.len() != 1 {
                    return Err(AppError::invalid_input(
                        "food analysis requires exactly one image",
                    ));
                }
            }
            AnalysisMode::Fridge => {
                if self.images.is_empty() || self.images.len() > limits::MAX_FRIDGE_IMAGES {
                    return Err(AppError::invalid_input(format!(
                        "fridge analysis requires 1 to {} images",
                        limits::MAX_FRIDGE_IMAGES
                    )));
                }
            }
            AnalysisMode::Wellness => {
                if !self.images.is_empty() {
                    return Err(AppError::invalid_input(
                        "wellness checks do not accept images",
                    ));
                }
                if self.biometrics.is_none() {
                    return Err(AppError::invalid_input(
                        "wellness checks require a biometric reading",
                    ));
                }
            }
        }
        for image in &self.images {
            image.validate()?;
        }
        if let Some(reading) = &self.biometrics {
            reading.validate()?;
        }
        Ok(())
    }
}

/// A food or ingredient candidate produced by the detection adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedItem {
    pub label: String,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// Estimated portion mass in grams
    pub estimated_grams: f64,
}

/// Nutrient profile, either canonical per-100g or scaled to a portion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NutritionProfile {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sodium_mg: f64,
    pub vitamins: HashMap<String, f64>,
    pub minerals: HashMap<String, f64>,
}

impl NutritionProfile {
    /// The all-zero profile substituted for unresolved labels
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale every field by a factor (e.g. `grams / 100` from canonical)
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein_g: self.protein_g * factor,
            carbs_g: self.carbs_g * factor,
            fat_g: self.fat_g * factor,
            fiber_g: self.fiber_g * factor,
            sodium_mg: self.sodium_mg * factor,
            vitamins: self.vitamins.iter().map(|(k, v)| (k.clone(), v * factor)).collect(),
            minerals: self.minerals.iter().map(|(k, v)| (k.clone(), v * factor)).collect(),
        }
    }

    /// Field-wise accumulate another profile into this one
    pub fn accumulate(&mut self, other: &Self) {
        self.calories += other.calories;
        self.protein_g += other.protein_g;
        self.carbs_g += other.carbs_g;
        self.fat_g += other.fat_g;
        self.fiber_g += other.fiber_g;
        self.sodium_mg += other.sodium_mg;
        for (k, v) in &other.vitamins {
            *self.vitamins.entry(k.clone()).or_insert(0.0) += v;
        }
        for (k, v) in &other.minerals {
            *self.minerals.entry(k.clone()).or_insert(0.0) += v;
        }
    }

    /// Whether every scalar and map value is non-negative
    #[must_use]
    pub fn is_non_negative(&self) -> bool {
        [
            self.calories,
            self.protein_g,
            self.carbs_g,
            self.fat_g,
            self.fiber_g,
            self.sodium_mg,
        ]
        .iter()
        .all(|v| *v >= 0.0)
            && self.vitamins.values().all(|v| *v >= 0.0)
            && self.minerals.values().all(|v| *v >= 0.0)
    }

    /// Field-wise equality within a tolerance, including the nutrient maps
    #[must_use]
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        let scalars_match = [
            (self.calories, other.calories),
            (self.protein_g, other.protein_g),
            (self.carbs_g, other.carbs_g),
            (self.fat_g, other.fat_g),
            (self.fiber_g, other.fiber_g),
            (self.sodium_mg, other.sodium_mg),
        ]
        .iter()
        .all(|(a, b)| (a - b).abs() <= epsilon);

        scalars_match
            && maps_approx_eq(&self.vitamins, &other.vitamins, epsilon)
            && maps_approx_eq(&self.minerals, &other.minerals, epsilon)
    }
}

fn maps_approx_eq(a: &HashMap<String, f64>, b: &HashMap<String, f64>, epsilon: f64) -> bool {
    let keys: std::collections::HashSet<&String> = a.keys().chain(b.keys()).collect();
    keys.into_iter().all(|k| {
        let va = a.get(k).copied().unwrap_or(0.0);
        let vb = b.get(k).copied().unwrap_or(0.0);
        (va - vb).abs() <= epsilon
    })
}

/// Reconcile a total against the field-wise sum of its parts
///
/// The orchestrator enforces this invariant before returning any result.
#[must_use]
pub fn reconcile_totals(items: &[AnalyzedItem], total: &NutritionProfile) -> bool {
    let mut sum = NutritionProfile::zero();
    for item in items {
        sum.accumulate(&item.nutrition);
    }
    sum.approx_eq(total, RECONCILIATION_EPSILON)
}

/// The fixed eight-emotion taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Calm,
    Happy,
    Excited,
    Focused,
    Tired,
    Stressed,
    Anxious,
    Sad,
}

impl Emotion {
    /// All taxonomy members, in canonical order
    pub const ALL: [Self; 8] = [
        Self::Calm,
        Self::Happy,
        Self::Excited,
        Self::Focused,
        Self::Tired,
        Self::Stressed,
        Self::Anxious,
        Self::Sad,
    ];

    /// Stable string form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Happy => "happy",
            Self::Excited => "excited",
            Self::Focused => "focused",
            Self::Tired => "tired",
            Self::Stressed => "stressed",
            Self::Anxious => "anxious",
            Self::Sad => "sad",
        }
    }

    /// Emotion-adjacent categories used for the recipe affinity bonus
    #[must_use]
    pub const fn adjacent(&self) -> [Self; 2] {
        match self {
            Self::Calm => [Self::Happy, Self::Focused],
            Self::Happy => [Self::Calm, Self::Excited],
            Self::Excited => [Self::Happy, Self::Focused],
            Self::Focused => [Self::Calm, Self::Excited],
            Self::Tired => [Self::Sad, Self::Calm],
            Self::Stressed => [Self::Anxious, Self::Tired],
            Self::Anxious => [Self::Stressed, Self::Sad],
            Self::Sad => [Self::Tired, Self::Anxious],
        }
    }

    /// Whether `other` is this emotion's neighbor in the taxonomy
    #[must_use]
    pub fn is_adjacent_to(&self, other: Self) -> bool {
        self.adjacent().contains(&other)
    }
}

/// A classified emotional state derived from one biometric reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    /// The dominant emotion (argmax of the distribution)
    pub emotion: Emotion,
    /// Raw affinity of the dominant emotion on a 0-100 scale
    pub score: f64,
    /// Full distribution over the taxonomy, values sum to 100
    pub distribution: HashMap<Emotion, f64>,
}

/// One candidate recipe match for a fridge analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeMatch {
    pub recipe_id: String,
    pub recipe_name: String,
    /// Combined coverage + emotion-affinity score in [0, 1]
    pub match_score: f64,
    pub available_ingredient_count: usize,
    pub total_ingredient_count: usize,
    pub missing_ingredients: Vec<String>,
    pub cooking_time_minutes: u32,
}

/// A detected item paired with its resolved (scaled) nutrition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedItem {
    pub item: DetectedItem,
    pub nutrition: NutritionProfile,
    /// False when the label missed the nutrition store and a zero profile
    /// was substituted
    pub nutrition_resolved: bool,
}

/// The persisted aggregate produced by one successful analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub mode: AnalysisMode,
    pub items: Vec<AnalyzedItem>,
    pub total_nutrition: NutritionProfile,
    pub emotion: Option<EmotionReading>,
    /// Advisory free-text enrichment from the vision service, if it answered
    /// within its soft deadline
    pub description: Option<String>,
    pub recommendation: String,
    /// Populated for fridge mode only
    pub recipe_matches: Vec<RecipeMatch>,
    pub awarded_xp: u32,
    pub created_at: DateTime<Utc>,
}

/// Whether every collaborator answered, or some advisory results were lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Every collaborator contributed
    Complete,
    /// The core pipeline completed but one or more advisory collaborators
    /// failed; see the degradation list
    Degraded,
}

/// A specific advisory failure recovered during the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// The vision-description call timed out or errored
    VisionDescription,
    /// A label missed the nutrition store; a zero profile was substituted
    NutritionUnresolved { label: String },
}

/// The orchestrator's response envelope: result plus degradation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub status: CompletionStatus,
    pub degradations: Vec<Degradation>,
}

/// Response of a wellness check: emotion reading plus advice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellnessReport {
    pub emotion: EmotionReading,
    pub recommendations: Vec<String>,
}
