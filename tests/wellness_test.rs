// ABOUTME: Integration tests for the wellness check path
// ABOUTME: Tracked-but-unenforced quota, emotion fixed points, advice content
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

mod common;

use common::{
    happy_pipeline, item, standard_requester, test_config, DescriberMode, DetectorMode,
    MockDescriber, MockDetector, UnreachableQuotaStore,
};
use plateful::errors::ErrorCode;
use plateful::history::InMemoryHistoryStore;
use plateful::models::{BiometricReading, Emotion};
use plateful::orchestrator::AnalysisOrchestrator;
use plateful::quota::{QuotaCategory, QuotaStore};
use std::sync::Arc;

#[tokio::test]
async fn test_wellness_check_stressed_fixed_point() {
    let pipeline = happy_pipeline(vec![item("apple", 0.9, 100.0)]);

    let report = pipeline
        .orchestrator
        .wellness_check(standard_requester(), BiometricReading::new(35.0, 95))
        .await
        .unwrap();

    assert_eq!(report.emotion.emotion, Emotion::Stressed);
    assert!(report.emotion.score >= 60.0);
    assert!(report.recommendations.len() >= 2);
}

#[tokio::test]
async fn test_wellness_check_calm_fixed_point() {
    let pipeline = happy_pipeline(vec![item("apple", 0.9, 100.0)]);

    let report = pipeline
        .orchestrator
        .wellness_check(standard_requester(), BiometricReading::new(70.0, 65))
        .await
        .unwrap();
    assert_eq!(report.emotion.emotion, Emotion::Calm);
}

#[tokio::test]
async fn test_wellness_usage_is_tracked() {
    let pipeline = happy_pipeline(vec![item("apple", 0.9, 100.0)]);
    let requester = standard_requester();

    for _ in 0..3 {
        pipeline
            .orchestrator
            .wellness_check(requester, BiometricReading::new(60.0, 70))
            .await
            .unwrap();
    }

    assert_eq!(
        pipeline
            .quota
            .committed_usage(requester.user_id, QuotaCategory::WellnessChecks)
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn test_wellness_is_never_quota_limited() {
    // Even a dead metering backend must not block a wellness check
    common::init_test_logging();
    let orchestrator = AnalysisOrchestrator::new(
        Arc::new(MockDetector::new(DetectorMode::Empty)),
        Arc::new(MockDescriber::new(DescriberMode::Fail)),
        common::builtin_resolver(),
        Arc::new(UnreachableQuotaStore),
        Arc::new(InMemoryHistoryStore::new()),
        test_config(),
    );

    let report = orchestrator
        .wellness_check(standard_requester(), BiometricReading::new(70.0, 65))
        .await
        .unwrap();
    assert_eq!(report.emotion.emotion, Emotion::Calm);
}

#[tokio::test]
async fn test_wellness_rejects_out_of_range_biometrics() {
    let pipeline = happy_pipeline(vec![item("apple", 0.9, 100.0)]);

    let error = pipeline
        .orchestrator
        .wellness_check(standard_requester(), BiometricReading::new(9.0, 65))
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::ValueOutOfRange);
}
