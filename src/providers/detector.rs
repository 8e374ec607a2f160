// ABOUTME: HTTP adapter for the object-detection model service
// ABOUTME: Applies the confidence floor and converts detection DTOs to domain items
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

use super::Detector;
use crate::errors::{AppError, AppResult};
use crate::models::{DetectedItem, ImageInput};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Request body for the detection service
#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    image_b64: &'a str,
}

/// One raw detection from the model service
#[derive(Debug, Deserialize)]
struct DetectionDto {
    label: String,
    confidence: f64,
    estimated_grams: f64,
}

/// Response body of the detection service
#[derive(Debug, Deserialize)]
struct DetectResponse {
    detections: Vec<DetectionDto>,
}

/// Detection adapter over an HTTP model service
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
    confidence_floor: f64,
}

impl HttpDetector {
    /// Create a detector adapter with a bounded per-call timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(base_url: impl Into<String>, confidence_floor: f64, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal("failed to build detector HTTP client").with_source(e))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            confidence_floor,
        })
    }

    fn classify_transport_error(error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::upstream_timeout("detector")
        } else {
            AppError::upstream_unavailable("detector", error.to_string()).with_source(error)
        }
    }
}

#[async_trait]
impl Detector for HttpDetector {
    async fn detect(&self, image: &ImageInput) -> AppResult<Vec<DetectedItem>> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let url = format!("{}/v1/detect", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&DetectRequest { image_b64: &encoded })
            .send()
            .await
            .map_err(Self::classify_transport_error)?;

        if !response.status().is_success() {
            return Err(AppError::upstream_unavailable(
                "detector",
                format!("status {}", response.status()),
            ));
        }

        let body: DetectResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream_unavailable("detector", "malformed response").with_source(e))?;

        let total = body.detections.len();
        let items: Vec<DetectedItem> = body
            .detections
            .into_iter()
            .filter(|d| d.confidence >= self.confidence_floor)
            .map(|d| DetectedItem {
                label: d.label,
                confidence: d.confidence.clamp(0.0, 1.0),
                estimated_grams: d.estimated_grams.max(0.0),
            })
            .collect();

        debug!(
            total,
            kept = items.len(),
            floor = self.confidence_floor,
            "detection results filtered"
        );
        Ok(items)
    }
}
