// ABOUTME: Shared test utilities: mock collaborators and orchestrator wiring helpers
// ABOUTME: Keeps integration tests focused on pipeline behavior, not setup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful
#![allow(dead_code)]

//! Shared test utilities for `plateful` integration tests

use async_trait::async_trait;
use bytes::Bytes;
use plateful::config::PipelineConfig;
use plateful::errors::{AppError, AppResult};
use plateful::history::{HistoryStore, InMemoryHistoryStore};
use plateful::models::{DetectedItem, ImageInput, Requester, UserTier};
use plateful::nutrition::{CachedNutritionResolver, InMemoryNutritionStore, NutritionResolver};
use plateful::orchestrator::AnalysisOrchestrator;
use plateful::providers::{Describer, Detector};
use plateful::quota::{InMemoryQuotaStore, QuotaCategory, QuotaDecision, QuotaStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .try_init();
    });
}

/// Pipeline config with short deadlines so failure paths resolve quickly
pub fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.detection.timeout = Duration::from_millis(200);
    config.vision.soft_deadline = Duration::from_millis(100);
    config.nutrition.timeout = Duration::from_millis(200);
    config.retry.backoff = Duration::from_millis(10);
    config.request_deadline = Duration::from_secs(2);
    config
}

/// A minimal valid JPEG payload (magic bytes only; adapters never decode)
pub fn jpeg_image() -> ImageInput {
    ImageInput::new(Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]))
}

pub fn standard_requester() -> Requester {
    Requester::new(Uuid::new_v4(), UserTier::Standard)
}

pub fn unlimited_requester() -> Requester {
    Requester::new(Uuid::new_v4(), UserTier::Unlimited)
}

pub fn item(label: &str, confidence: f64, grams: f64) -> DetectedItem {
    DetectedItem {
        label: label.to_owned(),
        confidence,
        estimated_grams: grams,
    }
}

/// Scripted detector behaviors
pub enum DetectorMode {
    /// Always return these items
    Items(Vec<DetectedItem>),
    /// Detector answered; nothing cleared the confidence floor
    Empty,
    /// Hard transport failure on every call
    Unavailable,
    /// Transient failure on the first call, then these items
    FailOnce(Vec<DetectedItem>),
    /// Never answers within any timeout
    Hang,
}

pub struct MockDetector {
    mode: DetectorMode,
    calls: AtomicUsize,
}

impl MockDetector {
    pub fn new(mode: DetectorMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Detector for MockDetector {
    async fn detect(&self, _image: &ImageInput) -> AppResult<Vec<DetectedItem>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            DetectorMode::Items(items) => Ok(items.clone()),
            DetectorMode::Empty => Ok(Vec::new()),
            DetectorMode::Unavailable => {
                Err(AppError::upstream_unavailable("detector", "mock outage"))
            }
            DetectorMode::FailOnce(items) => {
                if call == 0 {
                    Err(AppError::upstream_unavailable("detector", "transient"))
                } else {
                    Ok(items.clone())
                }
            }
            DetectorMode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Scripted describer behaviors
pub enum DescriberMode {
    Text(String),
    /// Never answers; exercises the soft deadline
    Hang,
    Fail,
}

pub struct MockDescriber {
    mode: DescriberMode,
}

impl MockDescriber {
    pub fn new(mode: DescriberMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Describer for MockDescriber {
    async fn describe(&self, _image: &ImageInput, _labels: &[String]) -> AppResult<String> {
        match &self.mode {
            DescriberMode::Text(text) => Ok(text.clone()),
            DescriberMode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(String::new())
            }
            DescriberMode::Fail => Err(AppError::upstream_unavailable("describer", "mock outage")),
        }
    }
}

/// Quota store whose backend is always unreachable
pub struct UnreachableQuotaStore;

#[async_trait]
impl QuotaStore for UnreachableQuotaStore {
    async fn check_and_reserve(
        &self,
        _user_id: Uuid,
        _category: QuotaCategory,
        _limit: u32,
        _reservation_id: Uuid,
    ) -> AppResult<QuotaDecision> {
        Err(AppError::quota_unavailable("mock backend down"))
    }

    async fn commit(
        &self,
        _user_id: Uuid,
        _category: QuotaCategory,
        _reservation_id: Uuid,
    ) -> AppResult<()> {
        Err(AppError::quota_unavailable("mock backend down"))
    }

    async fn release(
        &self,
        _user_id: Uuid,
        _category: QuotaCategory,
        _reservation_id: Uuid,
    ) -> AppResult<()> {
        Err(AppError::quota_unavailable("mock backend down"))
    }

    async fn record(&self, _user_id: Uuid, _category: QuotaCategory) -> AppResult<u32> {
        Err(AppError::quota_unavailable("mock backend down"))
    }

    async fn committed_usage(&self, _user_id: Uuid, _category: QuotaCategory) -> AppResult<u32> {
        Err(AppError::quota_unavailable("mock backend down"))
    }
}

/// History store whose writes always fail
pub struct FailingHistoryStore;

#[async_trait]
impl HistoryStore for FailingHistoryStore {
    async fn save_analysis(&self, _result: &plateful::models::AnalysisResult) -> AppResult<()> {
        Err(AppError::storage("mock write failure"))
    }

    async fn add_xp(&self, _user_id: Uuid, _amount: u32) -> AppResult<u32> {
        Err(AppError::storage("mock write failure"))
    }

    async fn xp_total(&self, _user_id: Uuid) -> AppResult<u32> {
        Ok(0)
    }

    async fn recent_analyses(
        &self,
        _user_id: Uuid,
        _limit: u32,
    ) -> AppResult<Vec<plateful::models::AnalysisResult>> {
        Ok(Vec::new())
    }
}

/// Nutrition resolver whose backend is always down
pub struct UnavailableNutritionResolver;

#[async_trait]
impl NutritionResolver for UnavailableNutritionResolver {
    async fn resolve(
        &self,
        _label: &str,
        _grams: f64,
    ) -> AppResult<plateful::models::NutritionProfile> {
        Err(AppError::upstream_unavailable("nutrition", "mock outage"))
    }
}

/// Default resolver over the built-in table
pub fn builtin_resolver() -> Arc<dyn NutritionResolver> {
    Arc::new(CachedNutritionResolver::new(
        InMemoryNutritionStore::with_builtin_table(),
        test_config().nutrition,
    ))
}

/// Everything an orchestrator test needs to wire and inspect
pub struct TestPipeline {
    pub orchestrator: AnalysisOrchestrator,
    pub quota: Arc<InMemoryQuotaStore>,
    pub history: Arc<InMemoryHistoryStore>,
}

/// Orchestrator with an in-memory quota and history store around the given
/// adapters
pub fn pipeline_with(
    detector: Arc<dyn Detector>,
    describer: Arc<dyn Describer>,
    config: PipelineConfig,
) -> TestPipeline {
    init_test_logging();
    let quota = Arc::new(InMemoryQuotaStore::new());
    let history = Arc::new(InMemoryHistoryStore::new());
    let orchestrator = AnalysisOrchestrator::new(
        detector,
        describer,
        builtin_resolver(),
        quota.clone(),
        history.clone(),
        config,
    );
    TestPipeline {
        orchestrator,
        quota,
        history,
    }
}

/// Happy-path pipeline: fixed detections and a fast describer
pub fn happy_pipeline(items: Vec<DetectedItem>) -> TestPipeline {
    pipeline_with(
        Arc::new(MockDetector::new(DetectorMode::Items(items))),
        Arc::new(MockDescriber::new(DescriberMode::Text(
            "A plate of grilled chicken with broccoli.".to_owned(),
        ))),
        test_config(),
    )
}
