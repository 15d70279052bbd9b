//! Dynamic SQL assembled with `QueryBuilder`.
//!
//! Column names come only from `ContractColumn`; every value is a bind
//! parameter.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use clm_core::columns::{ContractPatch, FieldValue};
use clm_core::types::{ContractFilter, FilterCriteria, PageRequest};

use crate::rows::CONTRACT_COLUMNS;

fn push_list_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ContractFilter) {
    qb.push(" WHERE 1=1");
    if let Some(status) = &filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(contract_type) = &filter.contract_type {
        qb.push(" AND type = ").push_bind(contract_type);
    }
    if let Some(search) = &filter.search {
        qb.push(" AND search_vector @@ plainto_tsquery('english', ")
            .push_bind(search)
            .push(")");
    }
}

/// One page of `filter` matches, newest first.
pub fn list_contracts<'a>(
    filter: &'a ContractFilter,
    page: PageRequest,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {CONTRACT_COLUMNS} FROM contracts"));
    push_list_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
    qb
}

pub fn count_contracts(filter: &ContractFilter) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM contracts");
    push_list_filter(&mut qb, filter);
    qb
}

pub fn filter_contracts(criteria: &FilterCriteria) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE 1=1"
    ));
    if let Some(status) = &criteria.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(contract_type) = &criteria.contract_type {
        qb.push(" AND type = ").push_bind(contract_type);
    }
    if let Some(owner) = &criteria.owner_user_id {
        qb.push(" AND owner_user_id = ").push_bind(owner);
    }
    if let Some(min) = criteria.min_value {
        qb.push(" AND contract_value >= ").push_bind(min);
    }
    if let Some(max) = criteria.max_value {
        qb.push(" AND contract_value <= ").push_bind(max);
    }
    qb.push(" ORDER BY created_at DESC");
    qb
}

/// `UPDATE contracts SET <patch columns>, updated_at = NOW() WHERE id = $n`.
/// The caller rejects empty patches before getting here.
pub fn update_contract(id: Uuid, patch: &ContractPatch) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE contracts SET ");
    for (column, value) in patch.changes() {
        qb.push(column.as_str()).push(" = ");
        match value {
            FieldValue::Text(v) => qb.push_bind(v),
            FieldValue::Date(v) => qb.push_bind(*v),
            FieldValue::Decimal(v) => qb.push_bind(*v),
            FieldValue::TextArray(v) => qb.push_bind(v),
        };
        qb.push(", ");
    }
    qb.push("updated_at = NOW() WHERE id = ")
        .push_bind(id)
        .push(format!(" RETURNING {CONTRACT_COLUMNS}"));
    qb
}
