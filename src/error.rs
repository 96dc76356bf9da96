// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP error types.

use crate::guards::Surface;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    #[error("{surface} rate limit exceeded")]
    RateLimited {
        surface: Surface,
        retry_after: Duration,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::InvalidIp(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "MISSING_PARAMETER",
            Self::InvalidIp(_) => "INVALID_IP",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

/// Whole seconds, rounded up so clients never retry early.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_secs = match &self {
            Self::RateLimited { retry_after, .. } => Some(retry_after_secs(*retry_after)),
            _ => None,
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code(),
            retry_after_secs: retry_secs,
        });

        match retry_secs {
            Some(secs) => (
                self.status(),
                [(header::RETRY_AFTER, secs.to_string())],
                body,
            )
                .into_response(),
            None => (self.status(), body).into_response(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
