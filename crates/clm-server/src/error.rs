//! HTTP error responses.
//!
//! Client errors carry their own message. Server errors carry the
//! endpoint's generic message, plus the underlying error text as `details`
//! outside production.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clm_core::ClmError;

use crate::envelope::ApiResponse;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(context: &str, detail: impl std::fmt::Display, expose_details: bool) -> Self {
        tracing::error!(error = %detail, "{context}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: context.to_string(),
            details: expose_details.then(|| detail.to_string()),
        }
    }

    /// Client-facing errors keep their message; `Internal` becomes `context`.
    pub fn from_clm(err: ClmError, context: &str, expose_details: bool) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match err.public_message() {
            Some(message) => Self {
                status,
                message,
                details: None,
            },
            None => Self::internal(context, &err, expose_details),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiResponse::failure(self.message).with_details(self.details);
        (self.status, Json(body)).into_response()
    }
}

/// Response for a handler that panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::internal("Internal server error", detail, expose_details).into_response()
}
