// ABOUTME: HTTP adapter for the advisory vision-description service
// ABOUTME: Best-effort enrichment; every failure here is recoverable upstream
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

use super::Describer;
use crate::errors::{AppError, AppResult};
use crate::models::ImageInput;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for the description service
#[derive(Debug, Serialize)]
struct DescribeRequest<'a> {
    image_b64: &'a str,
    labels: &'a [String],
}

/// Response body of the description service
#[derive(Debug, Deserialize)]
struct DescribeResponse {
    description: String,
}

/// Vision-description adapter over an HTTP multimodal service
pub struct HttpDescriber {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDescriber {
    /// Create a describer adapter with a bounded per-call timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal("failed to build describer HTTP client").with_source(e))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Describer for HttpDescriber {
    async fn describe(&self, image: &ImageInput, labels: &[String]) -> AppResult<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
        let url = format!("{}/v1/describe", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&DescribeRequest {
                image_b64: &encoded,
                labels,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::upstream_timeout("describer")
                } else {
                    AppError::upstream_unavailable("describer", e.to_string()).with_source(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(AppError::upstream_unavailable(
                "describer",
                format!("status {}", response.status()),
            ));
        }

        let body: DescribeResponse = response.json().await.map_err(|e| {
            AppError::upstream_unavailable("describer", "malformed response").with_source(e)
        })?;
        Ok(body.description)
    }
}
