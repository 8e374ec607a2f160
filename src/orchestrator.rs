// ABOUTME: Analysis orchestrator: validation, quota, concurrent fan-out, assembly, persistence
// ABOUTME: Owns the request state machine and every degradation/abort decision
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! # Analysis Orchestrator
//!
//! Coordinates one submission through the full pipeline:
//!
//! ```text
//! Received -> QuotaChecked -> Detecting -> Resolving -> Recommending
//!          -> Persisted -> Completed
//! ```
//!
//! Aborts surface as errors from any non-terminal stage. Detection,
//! emotion classification, and the advisory vision description fan out
//! concurrently; the vision call is additionally bounded by a soft deadline
//! and its loss degrades the result instead of failing it. Nutrition
//! resolution runs concurrently per detected item once detection has
//! completed.
//!
//! Quota asymmetry: a reservation is released whenever the pipeline aborts
//! before delivering value (hard detection failure, zero detections,
//! deadline), but once the reservation is committed a persistence failure
//! still counts against the daily quota; the caller gets an error, not a
//! free retry.

use crate::config::PipelineConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::history::HistoryStore;
use crate::intelligence::recommendation::normalize_label;
use crate::intelligence::{EmotionClassifier, RecipeCatalog, RecommendationEngine};
use crate::models::{
    AnalysisMode, AnalysisReport, AnalysisRequest, AnalysisResult, AnalyzedItem, BiometricReading,
    CompletionStatus, Degradation, DetectedItem, ImageInput, NutritionProfile, Requester,
    UserTier, WellnessReport,
};
use crate::nutrition::NutritionResolver;
use crate::providers::{Describer, Detector};
use crate::quota::{QuotaCategory, QuotaStore};
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Stages of the per-request state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    QuotaChecked,
    Detecting,
    Resolving,
    Recommending,
    Persisted,
    Completed,
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    debug!(from = ?stage, to = ?next, "pipeline transition");
    *stage = next;
}

/// The pipeline coordinator
///
/// Component seams are injected explicitly at construction, so the
/// orchestration logic is testable with fakes for every collaborator.
pub struct AnalysisOrchestrator {
    detector: Arc<dyn Detector>,
    describer: Arc<dyn Describer>,
    classifier: EmotionClassifier,
    resolver: Arc<dyn NutritionResolver>,
    engine: RecommendationEngine,
    quota: Arc<dyn QuotaStore>,
    history: Arc<dyn HistoryStore>,
    config: PipelineConfig,
}

impl AnalysisOrchestrator {
    /// Compose the pipeline from its collaborators
    #[must_use]
    pub fn new(
        detector: Arc<dyn Detector>,
        describer: Arc<dyn Describer>,
        resolver: Arc<dyn NutritionResolver>,
        quota: Arc<dyn QuotaStore>,
        history: Arc<dyn HistoryStore>,
        config: PipelineConfig,
    ) -> Self {
        let engine = RecommendationEngine::with_builtin_catalog(config.recommendation.clone());
        Self {
            detector,
            describer,
            classifier: EmotionClassifier::new(),
            resolver,
            engine,
            quota,
            history,
            config,
        }
    }

    /// Replace the recipe catalog backing the recommendation engine
    #[must_use]
    pub fn with_recipe_catalog(mut self, catalog: RecipeCatalog) -> Self {
        self.engine = RecommendationEngine::new(self.config.recommendation.clone(), catalog);
        self
    }

    /// `food.analyze`: single image, quota category `food_analyses`
    ///
    /// # Errors
    ///
    /// See [`analyze`](Self::analyze)
    pub async fn analyze_food(
        &self,
        requester: Requester,
        image: ImageInput,
        biometrics: Option<BiometricReading>,
    ) -> AppResult<AnalysisReport> {
        self.analyze(AnalysisRequest::food(requester, image, biometrics))
            .await
    }

    /// `fridge.analyze`: one to five images, quota category `fridge_analyses`
    ///
    /// # Errors
    ///
    /// See [`analyze`](Self::analyze)
    pub async fn analyze_fridge(
        &self,
        requester: Requester,
        images: Vec<ImageInput>,
        biometrics: Option<BiometricReading>,
    ) -> AppResult<AnalysisReport> {
        self.analyze(AnalysisRequest::fridge(requester, images, biometrics))
            .await
    }

    /// Run one food or fridge analysis end to end
    ///
    /// # Errors
    ///
    /// `InvalidInput`/`ImageUnreadable`/`ValueOutOfRange` before quota is
    /// touched; `QuotaExceeded`/`QuotaUnavailable` at reservation;
    /// `NoFoodDetected`, `UpstreamUnavailable`/`UpstreamTimeout`,
    /// `RequestTimeout`, or `StorageError` afterwards
    pub async fn analyze(&self, request: AnalysisRequest) -> AppResult<AnalysisReport> {
        let span = tracing::info_span!(
            "analyze",
            request_id = %request.id,
            user_id = %request.requester.user_id,
            mode = request.mode.as_str(),
        );
        let user_id = request.requester.user_id;
        let request_id = request.id;

        async move {
            self.analyze_inner(request).await.map_err(|error| {
                warn!(code = ?error.code, %error, "analysis aborted");
                error.with_request_id(request_id).with_user_id(user_id)
            })
        }
        .instrument(span)
        .await
    }

    async fn analyze_inner(&self, request: AnalysisRequest) -> AppResult<AnalysisReport> {
        let mut stage = PipelineStage::Received;

        // Validation is a hard precondition: nothing downstream (quota
        // included) is touched for a malformed request.
        request.validate()?;
        let category = match request.mode {
            AnalysisMode::Food => QuotaCategory::FoodAnalyses,
            AnalysisMode::Fridge => QuotaCategory::FridgeAnalyses,
            AnalysisMode::Wellness => {
                return Err(AppError::invalid_input(
                    "wellness checks go through wellness_check",
                ))
            }
        };

        let limit = match request.requester.tier {
            // Unlimited tier bypasses metering entirely
            UserTier::Unlimited => None,
            UserTier::Standard => Some(match category {
                QuotaCategory::FoodAnalyses => self.config.quotas.food_daily_limit,
                QuotaCategory::FridgeAnalyses => self.config.quotas.fridge_daily_limit,
                QuotaCategory::WellnessChecks => u32::MAX,
            }),
        };

        let reserved = if let Some(limit) = limit {
            let decision = self
                .quota
                .check_and_reserve(request.requester.user_id, category, limit, request.id)
                .await
                .map_err(|e| {
                    // Fail closed: unmetered access is worse than downtime
                    AppError::quota_unavailable("quota backend unreachable").with_source(e)
                })?;
            if !decision.allowed {
                return Err(AppError::quota_exceeded(category.as_str(), decision.reset_at));
            }
            true
        } else {
            false
        };
        advance(&mut stage, PipelineStage::QuotaChecked);

        // One deadline bounds the whole request; elapsing it drops every
        // in-flight sub-call.
        let mut committed = false;
        let outcome = match timeout(
            self.config.request_deadline,
            self.run_pipeline(&request, category, reserved, &mut stage, &mut committed),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AppError::request_timeout()),
        };

        match outcome {
            Ok(report) => Ok(report),
            Err(error) => {
                // An aborted attempt is not billed; a committed one is,
                // even if persistence failed afterwards.
                if reserved && !committed {
                    if let Err(release_error) = self
                        .quota
                        .release(request.requester.user_id, category, request.id)
                        .await
                    {
                        warn!(%release_error, "failed to release quota reservation");
                    }
                }
                Err(error)
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &AnalysisRequest,
        category: QuotaCategory,
        reserved: bool,
        stage: &mut PipelineStage,
        committed: &mut bool,
    ) -> AppResult<AnalysisReport> {
        let mut degradations: Vec<Degradation> = Vec::new();

        advance(stage, PipelineStage::Detecting);
        let detect_fut = self.detect_all(&request.images);
        let emotion_fut = async {
            request
                .biometrics
                .as_ref()
                .map(|reading| self.classifier.classify(reading))
                .transpose()
        };
        // Advisory: bounded by its own soft deadline so it can never hold
        // back the join once detection and emotion are done.
        let vision_fut = async {
            match timeout(
                self.config.vision.soft_deadline,
                self.describer.describe(&request.images[0], &[]),
            )
            .await
            {
                Ok(Ok(text)) => Some(text),
                Ok(Err(error)) => {
                    warn!(%error, "vision description failed, proceeding without enrichment");
                    None
                }
                Err(_) => {
                    warn!("vision description missed its soft deadline");
                    None
                }
            }
        };

        let (detected, emotion, description) = tokio::join!(detect_fut, emotion_fut, vision_fut);
        let items = detected?;
        let emotion = emotion?;
        if description.is_none() {
            degradations.push(Degradation::VisionDescription);
        }
        if items.is_empty() {
            // Distinct from an empty-but-successful result: the user-facing
            // messaging differs and the attempt is not billed.
            return Err(AppError::no_food_detected());
        }

        advance(stage, PipelineStage::Resolving);
        let resolutions = join_all(items.iter().map(|item| self.resolve_item(item))).await;
        let mut analyzed: Vec<AnalyzedItem> = Vec::with_capacity(items.len());
        for resolution in resolutions {
            let item = resolution?;
            if !item.nutrition_resolved {
                degradations.push(Degradation::NutritionUnresolved {
                    label: item.item.label.clone(),
                });
            }
            analyzed.push(item);
        }

        let mut total_nutrition = NutritionProfile::zero();
        for item in &analyzed {
            total_nutrition.accumulate(&item.nutrition);
        }
        if !crate::models::reconcile_totals(&analyzed, &total_nutrition) {
            return Err(AppError::internal(
                "total nutrition does not reconcile with per-item sum",
            ));
        }

        advance(stage, PipelineStage::Recommending);
        let labels: Vec<String> = analyzed
            .iter()
            .map(|a| normalize_label(&a.item.label))
            .collect();
        let recipe_matches = if request.mode == AnalysisMode::Fridge {
            self.engine.match_recipes(&labels, emotion.as_ref())
        } else {
            Vec::new()
        };
        let recommendation = self.engine.recommend(&total_nutrition, emotion.as_ref());

        let awarded_xp = self.award_xp(request.mode, analyzed.len());
        let result = AnalysisResult {
            id: Uuid::new_v4(),
            request_id: request.id,
            user_id: request.requester.user_id,
            mode: request.mode,
            items: analyzed,
            total_nutrition,
            emotion,
            description,
            recommendation,
            recipe_matches,
            awarded_xp,
            created_at: Utc::now(),
        };

        // Commit before persisting: the analysis was serviced, so the
        // attempt counts even if storage fails below.
        if reserved {
            self.quota
                .commit(request.requester.user_id, category, request.id)
                .await?;
            *committed = true;
        }

        advance(stage, PipelineStage::Persisted);
        self.history.save_analysis(&result).await?;
        if let Err(error) = self
            .history
            .add_xp(request.requester.user_id, awarded_xp)
            .await
        {
            // The result row is the record of truth; a lost XP increment is
            // recoverable from it later.
            warn!(%error, "failed to increment xp counter");
        }

        advance(stage, PipelineStage::Completed);
        let status = if degradations.is_empty() {
            CompletionStatus::Complete
        } else {
            CompletionStatus::Degraded
        };
        info!(
            items = result.items.len(),
            xp = awarded_xp,
            degraded = !degradations.is_empty(),
            "analysis completed"
        );
        Ok(AnalysisReport {
            result,
            status,
            degradations,
        })
    }

    /// `wellness.check`: no image, category tracked but not enforced
    ///
    /// # Errors
    ///
    /// Returns `ValueOutOfRange` for implausible biometrics
    pub async fn wellness_check(
        &self,
        requester: Requester,
        reading: BiometricReading,
    ) -> AppResult<WellnessReport> {
        reading.validate()?;

        // Tracked, never enforced: a metering outage must not block a
        // wellness check, unlike the fail-closed enforced categories.
        if let Err(error) = self
            .quota
            .record(requester.user_id, QuotaCategory::WellnessChecks)
            .await
        {
            warn!(%error, "failed to record wellness check usage");
        }

        let emotion = self.classifier.classify(&reading)?;
        let recommendations = self.engine.wellness_advice(&emotion);
        Ok(WellnessReport {
            emotion,
            recommendations,
        })
    }

    /// Detect over every image concurrently and merge items by label
    ///
    /// Duplicate labels across fridge photos merge into one item: grams
    /// sum, confidence keeps its maximum.
    async fn detect_all(&self, images: &[ImageInput]) -> AppResult<Vec<DetectedItem>> {
        let detections = join_all(images.iter().map(|image| self.detect_with_retry(image))).await;

        let mut merged: Vec<DetectedItem> = Vec::new();
        for detection in detections {
            for item in detection? {
                let key = normalize_label(&item.label);
                match merged
                    .iter_mut()
                    .find(|existing| normalize_label(&existing.label) == key)
                {
                    Some(existing) => {
                        existing.estimated_grams += item.estimated_grams;
                        existing.confidence = existing.confidence.max(item.confidence);
                    }
                    None => merged.push(item),
                }
            }
        }
        Ok(merged)
    }

    /// One detection call with a bounded timeout and a single retry for
    /// transient failures
    async fn detect_with_retry(&self, image: &ImageInput) -> AppResult<Vec<DetectedItem>> {
        let mut last_error = AppError::upstream_unavailable("detector", "no attempt made");
        for attempt in 0..2 {
            if attempt > 0 {
                debug!(attempt, "retrying detection after transient failure");
                tokio::time::sleep(self.config.retry.backoff).await;
            }
            match timeout(self.config.detection.timeout, self.detector.detect(image)).await {
                Ok(Ok(items)) => return Ok(items),
                Ok(Err(error)) if error.is_retryable() => last_error = error,
                Ok(Err(error)) => return Err(error),
                Err(_) => last_error = AppError::upstream_timeout("detector"),
            }
        }
        Err(last_error)
    }

    /// Resolve one item's nutrition with a single bounded retry
    ///
    /// A missing label degrades to a zero-valued, flagged profile; only
    /// transport failures surviving the retry become hard errors.
    async fn resolve_item(&self, item: &DetectedItem) -> AppResult<AnalyzedItem> {
        let mut last_error = AppError::upstream_unavailable("nutrition", "no attempt made");
        for attempt in 0..2 {
            if attempt > 0 {
                debug!(attempt, label = %item.label, "retrying nutrition lookup");
                tokio::time::sleep(self.config.retry.backoff).await;
            }
            match timeout(
                self.config.nutrition.timeout,
                self.resolver.resolve(&item.label, item.estimated_grams),
            )
            .await
            {
                Ok(Ok(nutrition)) => {
                    return Ok(AnalyzedItem {
                        item: item.clone(),
                        nutrition,
                        nutrition_resolved: true,
                    })
                }
                Ok(Err(error)) if error.code == ErrorCode::ResourceNotFound => {
                    warn!(label = %item.label, "unknown label, substituting zero nutrition");
                    return Ok(AnalyzedItem {
                        item: item.clone(),
                        nutrition: NutritionProfile::zero(),
                        nutrition_resolved: false,
                    });
                }
                Ok(Err(error)) if error.is_retryable() => last_error = error,
                Ok(Err(error)) => return Err(error),
                Err(_) => last_error = AppError::upstream_timeout("nutrition"),
            }
        }
        Err(last_error)
    }

    const fn award_xp(&self, mode: AnalysisMode, item_count: usize) -> u32 {
        let base = match mode {
            AnalysisMode::Food => self.config.xp.food_base,
            AnalysisMode::Fridge => self.config.xp.fridge_base,
            AnalysisMode::Wellness => 0,
        };
        base + self.config.xp.per_item * (item_count as u32)
    }
}
