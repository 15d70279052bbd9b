//! GET /api/contracts/export/csv: every contract as a CSV attachment.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use clm_core::export::{contracts_to_csv, EXPORT_FILENAME};

use crate::error::AppError;
use crate::state::AppState;

const CONTEXT: &str = "Failed to export contracts";

pub async fn export_csv(State(state): State<AppState>) -> Result<Response, AppError> {
    let contracts = state.service.export_all().await.map_err(state.fail(CONTEXT))?;
    if contracts.is_empty() {
        return Err(AppError::not_found("No contracts to export"));
    }

    let csv = contracts_to_csv(&contracts)
        .map_err(|e| AppError::internal(CONTEXT, format!("{e:#}"), state.expose_details()))?;
    tracing::debug!(rows = contracts.len(), "contracts exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        csv,
    )
        .into_response())
}
