//! Read-only reporting endpoints: stats, search, filter, expiring, reviews.

use std::str::FromStr;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use clm_core::service::DEFAULT_WINDOW_DAYS;
use clm_core::types::{Contract, DashboardStats, FilterCriteria, UpcomingReview};

use super::{non_empty, parse_days, query_rejected};
use crate::envelope::ApiResponse;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub contract_type: Option<String>,
    pub owner_user_id: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
}

impl FilterParams {
    fn criteria(self) -> Result<FilterCriteria, AppError> {
        Ok(FilterCriteria {
            status: non_empty(self.status),
            contract_type: non_empty(self.contract_type),
            owner_user_id: non_empty(self.owner_user_id),
            min_value: parse_amount("min_value", self.min_value)?,
            max_value: parse_amount("max_value", self.max_value)?,
        })
    }
}

fn parse_amount(name: &str, raw: Option<String>) -> Result<Option<Decimal>, AppError> {
    non_empty(raw)
        .map(|v| {
            Decimal::from_str(&v)
                .map_err(|_| AppError::bad_request(format!("{name} must be a number")))
        })
        .transpose()
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysParams {
    pub days: Option<String>,
}

/// GET /api/contracts/stats
pub async fn stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardStats>>, AppError> {
    let stats = state
        .service
        .dashboard_stats()
        .await
        .map_err(state.fail("Failed to fetch statistics"))?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/contracts/search?q=
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Contract>>>, AppError> {
    let Query(params) = query.map_err(query_rejected)?;
    let q = params.q.unwrap_or_default();
    let contracts = state
        .service
        .search(&q)
        .await
        .map_err(state.fail("Failed to search contracts"))?;

    let count = contracts.len();
    Ok(Json(
        ApiResponse::ok(contracts)
            .with_count(count)
            .with_meta("query", q.trim()),
    ))
}

/// GET /api/contracts/filter
pub async fn filter(
    State(state): State<AppState>,
    query: Result<Query<FilterParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Contract>>>, AppError> {
    let Query(params) = query.map_err(query_rejected)?;
    let criteria = params.criteria()?;
    let contracts = state
        .service
        .filter(&criteria)
        .await
        .map_err(state.fail("Failed to filter contracts"))?;

    let count = contracts.len();
    Ok(Json(
        ApiResponse::ok(contracts)
            .with_count(count)
            .with_meta("filters", &criteria),
    ))
}

/// GET /api/contracts/expiring-soon?days=
pub async fn expiring_soon(
    State(state): State<AppState>,
    query: Result<Query<DaysParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Contract>>>, AppError> {
    let Query(params) = query.map_err(query_rejected)?;
    let days = parse_days(params.days, DEFAULT_WINDOW_DAYS)?;
    let contracts = state
        .service
        .expiring_soon(days)
        .await
        .map_err(state.fail("Failed to fetch expiring contracts"))?;

    let count = contracts.len();
    Ok(Json(
        ApiResponse::ok(contracts)
            .with_count(count)
            .with_meta("days", days),
    ))
}

/// GET /api/contracts/upcoming-reviews?days=
pub async fn upcoming_reviews(
    State(state): State<AppState>,
    query: Result<Query<DaysParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<UpcomingReview>>>, AppError> {
    let Query(params) = query.map_err(query_rejected)?;
    let days = parse_days(params.days, DEFAULT_WINDOW_DAYS)?;
    let reviews = state
        .service
        .upcoming_reviews(days)
        .await
        .map_err(state.fail("Failed to fetch upcoming reviews"))?;

    let count = reviews.len();
    Ok(Json(
        ApiResponse::ok(reviews)
            .with_count(count)
            .with_meta("days", days),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_params_parse_amounts() {
        let criteria = FilterParams {
            min_value: Some("1000".into()),
            max_value: Some(" ".into()),
            status: Some("active".into()),
            ..Default::default()
        }
        .criteria()
        .unwrap();
        assert_eq!(criteria.min_value, Some(Decimal::new(1000, 0)));
        assert_eq!(criteria.max_value, None);
        assert_eq!(criteria.status.as_deref(), Some("active"));
    }

    #[test]
    fn filter_params_reject_non_numeric_amount() {
        let err = FilterParams {
            max_value: Some("lots".into()),
            ..Default::default()
        }
        .criteria()
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
