//! HTTP handlers, one module per route group.

pub mod contracts;
pub mod docs;
pub mod export;
pub mod health;
pub mod reports;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use crate::envelope::ApiResponse;
use crate::error::AppError;
use crate::router::AVAILABLE_ROUTES;

pub const USER_HEADER: &str = "x-user-id";
pub const ANONYMOUS_USER: &str = "anonymous";

/// Upper bound accepted for `days` windows.
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Structured 404 for unmatched routes.
pub async fn not_found() -> impl IntoResponse {
    let routes: Vec<&str> = AVAILABLE_ROUTES.iter().map(|(route, _)| *route).collect();
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure("Route not found").with_meta("availableRoutes", routes)),
    )
}

pub(crate) fn parse_contract_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::bad_request("Invalid contract ID format"))
}

pub(crate) fn acting_user(headers: &HeaderMap) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}

/// Blank query values count as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_days(raw: Option<String>, default: u32) -> Result<u32, AppError> {
    match non_empty(raw) {
        None => Ok(default),
        Some(v) => v
            .parse::<u32>()
            .ok()
            .filter(|d| *d <= MAX_WINDOW_DAYS)
            .ok_or_else(|| {
                AppError::bad_request(format!(
                    "days must be an integer between 0 and {MAX_WINDOW_DAYS}"
                ))
            }),
    }
}

pub(crate) fn query_rejected(rejection: QueryRejection) -> AppError {
    AppError::with_status(rejection.status(), rejection.body_text())
}

pub(crate) fn json_rejected(rejection: JsonRejection) -> AppError {
    AppError::with_status(rejection.status(), rejection.body_text())
}
