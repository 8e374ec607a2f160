// ABOUTME: Concurrency property tests for the daily quota invariant
// ABOUTME: limit+5 racing requests must yield exactly `limit` committed analyses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

mod common;

use common::{item, jpeg_image, test_config, DescriberMode, DetectorMode, MockDescriber, MockDetector};
use plateful::errors::ErrorCode;
use plateful::history::InMemoryHistoryStore;
use plateful::models::{Requester, UserTier};
use plateful::orchestrator::AnalysisOrchestrator;
use plateful::quota::{InMemoryQuotaStore, QuotaCategory, QuotaStore};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_store_level_race_never_exceeds_limit() {
    let store = Arc::new(InMemoryQuotaStore::new());
    let user = Uuid::new_v4();
    let limit = 5u32;

    let mut handles = Vec::new();
    for _ in 0..(limit + 5) {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .check_and_reserve(user, QuotaCategory::FoodAnalyses, limit, Uuid::new_v4())
                .await
                .unwrap()
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap().allowed {
            allowed += 1;
        }
    }
    assert_eq!(allowed, limit, "exactly `limit` reservations may be granted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipeline_race_commits_exactly_limit() {
    common::init_test_logging();
    let limit = 5u32;
    let mut config = test_config();
    config.quotas.food_daily_limit = limit;

    let quota = Arc::new(InMemoryQuotaStore::new());
    let orchestrator = Arc::new(AnalysisOrchestrator::new(
        Arc::new(MockDetector::new(DetectorMode::Items(vec![item(
            "chicken", 0.9, 120.0,
        )]))),
        Arc::new(MockDescriber::new(DescriberMode::Text("plate".into()))),
        common::builtin_resolver(),
        quota.clone(),
        Arc::new(InMemoryHistoryStore::new()),
        config,
    ));

    let requester = Requester::new(Uuid::new_v4(), UserTier::Standard);
    let mut handles = Vec::new();
    for _ in 0..(limit + 5) {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .analyze_food(requester, jpeg_image(), None)
                .await
        }));
    }

    let mut succeeded = 0u32;
    let mut quota_denied = 0u32;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(error) => {
                assert_eq!(error.code, ErrorCode::QuotaExceeded);
                quota_denied += 1;
            }
        }
    }

    assert_eq!(succeeded, limit);
    assert_eq!(quota_denied, 5);
    assert_eq!(
        quota
            .committed_usage(requester.user_id, QuotaCategory::FoodAnalyses)
            .await
            .unwrap(),
        limit
    );
}

#[tokio::test]
async fn test_denied_request_reports_reset_time() {
    let store = InMemoryQuotaStore::new();
    let user = Uuid::new_v4();

    let first = store
        .check_and_reserve(user, QuotaCategory::FridgeAnalyses, 1, Uuid::new_v4())
        .await
        .unwrap();
    assert!(first.allowed);

    let denied = store
        .check_and_reserve(user, QuotaCategory::FridgeAnalyses, 1, Uuid::new_v4())
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    assert!(denied.reset_at > chrono::Utc::now());
}
