//! /api/contracts CRUD endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use clm_core::columns::{ContractColumn, ContractPatch, FieldValue};
use clm_core::types::{Contract, ContractDetail, ContractFilter, NewContract, PageRequest};

use super::{acting_user, json_rejected, non_empty, parse_contract_id, query_rejected};
use crate::envelope::ApiResponse;
use crate::error::AppError;
use crate::state::AppState;

const REQUIRED_ON_CREATE: [ContractColumn; 3] = [
    ContractColumn::Title,
    ContractColumn::CounterpartyName,
    ContractColumn::OwnerUserId,
];

/// Columns with an insert default; a null for these on create means "use
/// the default".
const DEFAULTED_ON_CREATE: [ContractColumn; 3] = [
    ContractColumn::Status,
    ContractColumn::Type,
    ContractColumn::Currency,
];

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub contract_type: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    fn page_request(&self) -> Result<PageRequest, AppError> {
        let page = match non_empty(self.page.clone()) {
            None => PageRequest::DEFAULT_PAGE,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| AppError::bad_request("page must be a positive integer"))?,
        };
        let limit = match non_empty(self.limit.clone()) {
            None => PageRequest::DEFAULT_LIMIT,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|l| (1..=PageRequest::MAX_LIMIT).contains(l))
                .ok_or_else(|| {
                    AppError::bad_request(format!(
                        "limit must be between 1 and {}",
                        PageRequest::MAX_LIMIT
                    ))
                })?,
        };
        Ok(PageRequest { page, limit })
    }
}

/// GET /api/contracts
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Contract>>>, AppError> {
    let Query(params) = query.map_err(query_rejected)?;
    let page = params.page_request()?;
    let filter = ContractFilter {
        status: non_empty(params.status),
        contract_type: non_empty(params.contract_type),
        search: non_empty(params.search),
    };

    let result = state
        .service
        .find_all(filter, page)
        .await
        .map_err(state.fail("Failed to fetch contracts"))?;

    Ok(Json(
        ApiResponse::ok(result.contracts).with_pagination(result.pagination),
    ))
}

/// GET /api/contracts/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ContractDetail>>, AppError> {
    let id = parse_contract_id(&id)?;
    let detail = state
        .service
        .find_by_id(id)
        .await
        .map_err(state.fail("Failed to fetch contract"))?;
    Ok(Json(ApiResponse::ok(detail)))
}

/// POST /api/contracts
///
/// The CREATE audit entry is attributed to the `x-user-id` caller, which
/// overrides any `created_by` in the body.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Contract>>), AppError> {
    let Json(body) = body.map_err(json_rejected)?;
    let mut input = parse_create_body(&body)?;
    input.created_by = Some(acting_user(&headers));

    let contract = state
        .service
        .create(input)
        .await
        .map_err(state.fail("Failed to create contract"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(contract).with_message("Contract created successfully")),
    ))
}

/// PUT /api/contracts/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let id = parse_contract_id(&id)?;
    let Json(body) = body.map_err(json_rejected)?;
    let patch = ContractPatch::from_json(&body).map_err(state.fail("Failed to update contract"))?;

    let contract = state
        .service
        .update(id, patch, &acting_user(&headers))
        .await
        .map_err(state.fail("Failed to update contract"))?;

    Ok(Json(
        ApiResponse::ok(contract).with_message("Contract updated successfully"),
    ))
}

/// DELETE /api/contracts/:id (soft delete)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Contract>>, AppError> {
    let id = parse_contract_id(&id)?;
    let contract = state
        .service
        .delete(id, &acting_user(&headers))
        .await
        .map_err(state.fail("Failed to delete contract"))?;

    Ok(Json(
        ApiResponse::ok(contract).with_message("Contract terminated successfully"),
    ))
}

/// Validate a create body into a `NewContract`.
///
/// The three required fields are checked first; remaining keys go through
/// the same column allowlist and typing as updates. `created_by` is the
/// only accepted key outside the allowlist.
pub fn parse_create_body(body: &Value) -> Result<NewContract, AppError> {
    let object = body
        .as_object()
        .ok_or_else(|| AppError::bad_request("Request body must be a JSON object"))?;

    let missing = REQUIRED_ON_CREATE.iter().any(|column| {
        object
            .get(column.as_str())
            .and_then(Value::as_str)
            .map_or(true, |v| v.trim().is_empty())
    });
    if missing {
        return Err(AppError::bad_request(
            "Missing required fields: title, counterparty_name, owner_user_id",
        ));
    }

    let mut fields = object.clone();
    fields.retain(|key, value| {
        !(value.is_null()
            && ContractColumn::from_key(key).is_some_and(|c| DEFAULTED_ON_CREATE.contains(&c)))
    });
    let created_by = match fields.remove("created_by") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => non_empty(Some(s)),
        Some(_) => return Err(AppError::bad_request("'created_by' must be a string")),
    };

    let patch = ContractPatch::from_map(&fields).map_err(|e| {
        AppError::bad_request(e.public_message().unwrap_or_else(|| e.to_string()))
    })?;

    let mut input = NewContract {
        created_by,
        ..Default::default()
    };
    for (column, value) in patch.changes() {
        assign(&mut input, *column, value.clone());
    }
    Ok(input)
}

fn assign(input: &mut NewContract, column: ContractColumn, value: FieldValue) {
    match (column, value) {
        (ContractColumn::ContractNumber, FieldValue::Text(v)) => input.contract_number = v,
        (ContractColumn::Title, FieldValue::Text(v)) => input.title = v.unwrap_or_default(),
        (ContractColumn::Description, FieldValue::Text(v)) => input.description = v,
        (ContractColumn::CounterpartyName, FieldValue::Text(v)) => {
            input.counterparty_name = v.unwrap_or_default()
        }
        (ContractColumn::CounterpartyEmail, FieldValue::Text(v)) => input.counterparty_email = v,
        (ContractColumn::CounterpartyAddress, FieldValue::Text(v)) => {
            input.counterparty_address = v
        }
        (ContractColumn::OwnerUserId, FieldValue::Text(v)) => {
            input.owner_user_id = v.unwrap_or_default()
        }
        (ContractColumn::OwnerDepartment, FieldValue::Text(v)) => input.owner_department = v,
        (ContractColumn::Status, FieldValue::Text(v)) => input.status = v,
        (ContractColumn::Type, FieldValue::Text(v)) => input.contract_type = v,
        (ContractColumn::Category, FieldValue::Text(v)) => input.category = v,
        (ContractColumn::EffectiveDate, FieldValue::Date(v)) => input.effective_date = v,
        (ContractColumn::ExpirationDate, FieldValue::Date(v)) => input.expiration_date = v,
        (ContractColumn::ContractValue, FieldValue::Decimal(v)) => input.contract_value = v,
        (ContractColumn::Currency, FieldValue::Text(v)) => input.currency = v,
        (ContractColumn::PaymentTerms, FieldValue::Text(v)) => input.payment_terms = v,
        (ContractColumn::Tags, FieldValue::TextArray(v)) => input.tags = Some(v),
        _ => {}
    }
}
