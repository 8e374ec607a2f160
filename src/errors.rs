// ABOUTME: Unified error taxonomy for the analysis pipeline with HTTP status mapping
// ABOUTME: Distinguishes quota, validation, detection, upstream, and storage failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Plateful

//! # Unified Error Handling
//!
//! Centralized error types for the analysis pipeline. Every failure the
//! orchestrator can surface is an [`AppError`] carrying a stable
//! [`ErrorCode`], so the (external) API layer can map errors to HTTP
//! responses without string matching. Degraded-but-successful analyses are
//! *not* errors; they are reported through
//! [`CompletionStatus`](crate::models::CompletionStatus).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Standard error codes used throughout the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Quota & rate limiting (2000-2999)
    #[serde(rename = "QUOTA_EXCEEDED")]
    QuotaExceeded = 2000,
    #[serde(rename = "QUOTA_UNAVAILABLE")]
    QuotaUnavailable = 2001,

    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    #[serde(rename = "VALUE_OUT_OF_RANGE")]
    ValueOutOfRange = 3001,
    #[serde(rename = "IMAGE_UNREADABLE")]
    ImageUnreadable = 3002,

    // Analysis outcomes (4000-4999)
    #[serde(rename = "NO_FOOD_DETECTED")]
    NoFoodDetected = 4000,
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4001,

    // External collaborators (5000-5999)
    #[serde(rename = "UPSTREAM_UNAVAILABLE")]
    UpstreamUnavailable = 5000,
    #[serde(rename = "UPSTREAM_TIMEOUT")]
    UpstreamTimeout = 5001,
    #[serde(rename = "REQUEST_TIMEOUT")]
    RequestTimeout = 5002,

    // Internal (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9001,
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9002,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidInput | Self::ValueOutOfRange | Self::ImageUnreadable => 400,

            // 404 Not Found
            Self::ResourceNotFound => 404,

            // 422 Unprocessable Entity: valid image, nothing usable in it
            Self::NoFoodDetected => 422,

            // 429 Too Many Requests
            Self::QuotaExceeded => 429,

            // 502 Bad Gateway
            Self::UpstreamUnavailable => 502,

            // 503 Service Unavailable: quota backend down, fail closed
            Self::QuotaUnavailable => 503,

            // 504 Gateway Timeout
            Self::UpstreamTimeout | Self::RequestTimeout => 504,

            // 500 Internal Server Error
            Self::InternalError | Self::StorageError | Self::SerializationError => 500,
        }
    }

    /// Get a user-facing description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::QuotaExceeded => "Daily usage quota exceeded for this analysis type",
            Self::QuotaUnavailable => "Usage metering is temporarily unavailable",
            Self::InvalidInput => "The provided input is invalid",
            Self::ValueOutOfRange => "The provided value is outside the acceptable range",
            Self::ImageUnreadable => "The image could not be read or is not a supported format",
            Self::NoFoodDetected => "No food items could be detected in the image",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::UpstreamUnavailable => "A required analysis service is unavailable",
            Self::UpstreamTimeout => "A required analysis service did not respond in time",
            Self::RequestTimeout => "The analysis did not complete within its deadline",
            Self::InternalError => "An internal error occurred",
            Self::StorageError => "Storing the analysis result failed",
            Self::SerializationError => "Data serialization failed",
        }
    }
}

/// Additional context that can be attached to errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Request ID for tracing
    pub request_id: Option<Uuid>,
    /// User ID if available
    pub user_id: Option<Uuid>,
    /// Additional key-value context
    pub details: serde_json::Value,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            request_id: None,
            user_id: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Unified error type for the analysis pipeline
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a request ID to the error context
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.context.request_id = Some(request_id);
        self
    }

    /// Add a user ID to the error context
    #[must_use]
    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.context.user_id = Some(user_id);
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Whether a single bounded retry is appropriate for this failure
    ///
    /// Only transient upstream conditions qualify. Quota operations are
    /// deliberately excluded: an ambiguous quota failure must be re-checked
    /// through the idempotent reservation path, never retried blindly.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UpstreamUnavailable | ErrorCode::UpstreamTimeout
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors for common errors
impl AppError {
    /// Daily quota exhausted for a category
    pub fn quota_exceeded(category: impl Into<String>, reset_at: DateTime<Utc>) -> Self {
        Self::new(
            ErrorCode::QuotaExceeded,
            format!("daily limit reached for {}", category.into()),
        )
        .with_details(serde_json::json!({
            "remaining": 0,
            "reset_at": reset_at.to_rfc3339(),
        }))
    }

    /// Quota backend unreachable; the pipeline fails closed
    pub fn quota_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::QuotaUnavailable, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Value outside its documented range
    pub fn value_out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValueOutOfRange, message)
    }

    /// Corrupt or unsupported image payload
    pub fn image_unreadable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ImageUnreadable, message)
    }

    /// Zero detections survived confidence filtering
    pub fn no_food_detected() -> Self {
        Self::new(
            ErrorCode::NoFoodDetected,
            "no items above the confidence floor",
        )
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Hard failure from a required collaborator
    pub fn upstream_unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UpstreamUnavailable,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// A collaborator exceeded its wall-clock budget
    pub fn upstream_timeout(service: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UpstreamTimeout,
            format!("{} timed out", service.into()),
        )
    }

    /// The whole request exceeded its deadline
    pub fn request_timeout() -> Self {
        Self::new(ErrorCode::RequestTimeout, "request deadline elapsed")
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.source() {
            Some(source) => Self::new(ErrorCode::InternalError, error.to_string()).with_details(
                serde_json::json!({
                    "source": source.to_string()
                }),
            ),
            None => Self::new(ErrorCode::InternalError, error.to_string()),
        }
    }
}
