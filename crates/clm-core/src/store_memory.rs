//! In-process implementation of every store port.
//!
//! Backs the service and HTTP tests.
//! Query semantics follow the Postgres adapter: newest-first listings,
//! conjunctive filters, date windows inclusive on both ends.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::columns::{ContractColumn, ContractPatch, FieldValue};
use crate::error::ClmError;
use crate::ports::{AuditStore, ContractStore, HealthCheck, MilestoneStore, Result};
use crate::types::*;

#[derive(Default)]
struct MemoryState {
    contracts: Vec<Contract>,
    milestones: Vec<Milestone>,
    audit: Vec<AuditEntry>,
    next_audit_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every audit entry of one contract, oldest first.
    pub async fn audit_entries_for(&self, contract_id: Uuid) -> Vec<AuditEntry> {
        let state = self.state.read().await;
        state
            .audit
            .iter()
            .filter(|a| a.contract_id == contract_id)
            .cloned()
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClmError::Internal(anyhow!("connection refused")));
        }
        Ok(())
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Returned rows carry a freshly computed `days_until_expiry`.
fn present(contract: &Contract) -> Contract {
    let mut out = contract.clone();
    out.days_until_expiry = contract
        .expiration_date
        .map(|d| d.signed_duration_since(today()).num_days());
    out
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first<'a>(rows: impl DoubleEndedIterator<Item = &'a Contract>) -> Vec<Contract> {
    let mut out: Vec<Contract> = rows.rev().map(present).collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn matches_search(contract: &Contract, terms: &str) -> bool {
    let document = [
        Some(contract.title.as_str()),
        contract.description.as_deref(),
        Some(contract.counterparty_name.as_str()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();
    let words: Vec<&str> = document
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    terms
        .to_lowercase()
        .split_whitespace()
        .all(|term| words.iter().any(|w| w.starts_with(term)))
}

fn apply(contract: &mut Contract, column: ContractColumn, value: &FieldValue) -> Result<()> {
    let mismatch = || ClmError::InvalidInput(format!("type mismatch for '{column}'"));
    match (column, value) {
        (ContractColumn::ContractNumber, FieldValue::Text(v)) => contract.contract_number = v.clone(),
        (ContractColumn::Title, FieldValue::Text(Some(v))) => contract.title = v.clone(),
        (ContractColumn::Description, FieldValue::Text(v)) => contract.description = v.clone(),
        (ContractColumn::CounterpartyName, FieldValue::Text(Some(v))) => {
            contract.counterparty_name = v.clone()
        }
        (ContractColumn::CounterpartyEmail, FieldValue::Text(v)) => {
            contract.counterparty_email = v.clone()
        }
        (ContractColumn::CounterpartyAddress, FieldValue::Text(v)) => {
            contract.counterparty_address = v.clone()
        }
        (ContractColumn::OwnerUserId, FieldValue::Text(Some(v))) => {
            contract.owner_user_id = v.clone()
        }
        (ContractColumn::OwnerDepartment, FieldValue::Text(v)) => {
            contract.owner_department = v.clone()
        }
        (ContractColumn::Status, FieldValue::Text(Some(v))) => contract.status = v.clone(),
        (ContractColumn::Type, FieldValue::Text(Some(v))) => contract.contract_type = v.clone(),
        (ContractColumn::Category, FieldValue::Text(v)) => contract.category = v.clone(),
        (ContractColumn::EffectiveDate, FieldValue::Date(v)) => contract.effective_date = *v,
        (ContractColumn::ExpirationDate, FieldValue::Date(v)) => contract.expiration_date = *v,
        (ContractColumn::ContractValue, FieldValue::Decimal(v)) => contract.contract_value = *v,
        (ContractColumn::Currency, FieldValue::Text(Some(v))) => contract.currency = v.clone(),
        (ContractColumn::PaymentTerms, FieldValue::Text(v)) => contract.payment_terms = v.clone(),
        (ContractColumn::Tags, FieldValue::TextArray(v)) => contract.tags = v.clone(),
        _ => return Err(mismatch()),
    }
    Ok(())
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn insert_contract(&self, record: &ContractRecord) -> Result<Contract> {
        self.check()?;
        let mut state = self.state.write().await;
        if state
            .contracts
            .iter()
            .any(|c| c.contract_number.as_deref() == Some(record.contract_number.as_str()))
        {
            return Err(ClmError::Internal(anyhow!(
                "duplicate key value violates unique constraint \"contracts_contract_number_key\""
            )));
        }
        let now = Utc::now();
        let contract = Contract {
            id: record.id,
            contract_number: Some(record.contract_number.clone()),
            title: record.title.clone(),
            description: record.description.clone(),
            counterparty_name: record.counterparty_name.clone(),
            counterparty_email: record.counterparty_email.clone(),
            counterparty_address: record.counterparty_address.clone(),
            owner_user_id: record.owner_user_id.clone(),
            owner_department: record.owner_department.clone(),
            status: record.status.clone(),
            contract_type: record.contract_type.clone(),
            category: record.category.clone(),
            effective_date: record.effective_date,
            expiration_date: record.expiration_date,
            contract_value: record.contract_value,
            currency: record.currency.clone(),
            payment_terms: record.payment_terms.clone(),
            tags: record.tags.clone(),
            created_at: now,
            updated_at: now,
            days_until_expiry: None,
        };
        state.contracts.push(contract.clone());
        Ok(present(&contract))
    }

    async fn update_contract(&self, id: Uuid, patch: &ContractPatch) -> Result<Option<Contract>> {
        self.check()?;
        let mut state = self.state.write().await;
        let Some(contract) = state.contracts.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        let mut updated = contract.clone();
        for (column, value) in patch.changes() {
            apply(&mut updated, *column, value)?;
        }
        updated.updated_at = Utc::now();
        *contract = updated;
        Ok(Some(present(contract)))
    }

    async fn terminate_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        self.check()?;
        let mut state = self.state.write().await;
        let Some(contract) = state.contracts.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        contract.status = STATUS_TERMINATED.to_string();
        contract.updated_at = Utc::now();
        Ok(Some(present(contract)))
    }

    async fn find_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        self.check()?;
        let state = self.state.read().await;
        Ok(state.contracts.iter().find(|c| c.id == id).map(present))
    }

    async fn list_contracts(
        &self,
        filter: &ContractFilter,
        page: PageRequest,
    ) -> Result<(Vec<Contract>, u64)> {
        self.check()?;
        let state = self.state.read().await;
        let matching = newest_first(state.contracts.iter().filter(|c| {
            filter.status.as_ref().map_or(true, |s| &c.status == s)
                && filter
                    .contract_type
                    .as_ref()
                    .map_or(true, |t| &c.contract_type == t)
                && filter
                    .search
                    .as_ref()
                    .map_or(true, |q| matches_search(c, q))
        }));
        let total = matching.len() as u64;
        let rows = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok((rows, total))
    }

    async fn search_contracts(&self, term: &str) -> Result<Vec<Contract>> {
        self.check()?;
        let needle = term.to_lowercase();
        let state = self.state.read().await;
        Ok(newest_first(state.contracts.iter().filter(|c| {
            contains_ci(Some(c.title.as_str()), &needle)
                || contains_ci(c.description.as_deref(), &needle)
                || contains_ci(Some(c.counterparty_name.as_str()), &needle)
                || contains_ci(c.counterparty_email.as_deref(), &needle)
        })))
    }

    async fn filter_contracts(&self, criteria: &FilterCriteria) -> Result<Vec<Contract>> {
        self.check()?;
        let state = self.state.read().await;
        Ok(newest_first(state.contracts.iter().filter(|c| {
            criteria.status.as_ref().map_or(true, |s| &c.status == s)
                && criteria
                    .contract_type
                    .as_ref()
                    .map_or(true, |t| &c.contract_type == t)
                && criteria
                    .owner_user_id
                    .as_ref()
                    .map_or(true, |o| &c.owner_user_id == o)
                && criteria
                    .min_value
                    .map_or(true, |min| c.contract_value.is_some_and(|v| v >= min))
                && criteria
                    .max_value
                    .map_or(true, |max| c.contract_value.is_some_and(|v| v <= max))
        })))
    }

    async fn expiring_between(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<Contract>> {
        self.check()?;
        let state = self.state.read().await;
        let mut rows: Vec<Contract> = state
            .contracts
            .iter()
            .filter(|c| c.status == STATUS_ACTIVE)
            .filter(|c| c.expiration_date.is_some_and(|d| d >= from && d <= until))
            .map(present)
            .collect();
        rows.sort_by_key(|c| c.expiration_date);
        Ok(rows)
    }

    async fn upcoming_reviews(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<UpcomingReview>> {
        self.check()?;
        let state = self.state.read().await;
        let mut rows: Vec<UpcomingReview> = state
            .contracts
            .iter()
            .filter(|c| c.status != STATUS_TERMINATED)
            .filter_map(|c| {
                state
                    .milestones
                    .iter()
                    .filter(|m| m.contract_id == c.id && m.milestone_type == MilestoneType::Review)
                    .map(|m| m.due_date)
                    .filter(|d| *d >= from && *d <= until)
                    .min()
                    .map(|next_review_date| UpcomingReview {
                        contract: present(c),
                        next_review_date,
                    })
            })
            .collect();
        rows.sort_by_key(|r| r.next_review_date);
        Ok(rows)
    }

    async fn all_contracts(&self) -> Result<Vec<Contract>> {
        self.check()?;
        let state = self.state.read().await;
        Ok(newest_first(state.contracts.iter()))
    }

    async fn dashboard_stats(&self, from: NaiveDate, until: NaiveDate) -> Result<DashboardStats> {
        self.check()?;
        let state = self.state.read().await;
        let contracts = &state.contracts;

        let mut by_type: Vec<TypeCount> = Vec::new();
        let mut by_status: Vec<StatusCount> = Vec::new();
        for c in contracts {
            match by_type.iter_mut().find(|t| t.contract_type == c.contract_type) {
                Some(t) => t.count += 1,
                None => by_type.push(TypeCount {
                    contract_type: c.contract_type.clone(),
                    count: 1,
                }),
            }
            match by_status.iter_mut().find(|s| s.status == c.status) {
                Some(s) => s.count += 1,
                None => by_status.push(StatusCount {
                    status: c.status.clone(),
                    count: 1,
                }),
            }
        }

        let active = contracts.iter().filter(|c| c.status == STATUS_ACTIVE);
        Ok(DashboardStats {
            total: contracts.len() as i64,
            active: active.clone().count() as i64,
            expiring_soon: active
                .filter(|c| c.expiration_date.is_some_and(|d| d >= from && d <= until))
                .count() as i64,
            by_type,
            by_status,
        })
    }
}

#[async_trait]
impl MilestoneStore for MemoryStore {
    async fn insert_milestone(&self, milestone: &NewMilestone) -> Result<Milestone> {
        self.check()?;
        let mut state = self.state.write().await;
        let row = Milestone {
            id: milestone.id,
            contract_id: milestone.contract_id,
            milestone_type: milestone.milestone_type,
            name: milestone.name.clone(),
            due_date: milestone.due_date,
            assignee_email: milestone.assignee_email.clone(),
            notes: milestone.notes.clone(),
            created_at: Utc::now(),
        };
        state.milestones.push(row.clone());
        Ok(row)
    }

    async fn milestones_for(&self, contract_id: Uuid) -> Result<Vec<Milestone>> {
        self.check()?;
        let state = self.state.read().await;
        let mut rows: Vec<Milestone> = state
            .milestones
            .iter()
            .filter(|m| m.contract_id == contract_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.due_date);
        Ok(rows)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntry> {
        self.check()?;
        let mut state = self.state.write().await;
        state.next_audit_id += 1;
        let row = AuditEntry {
            id: state.next_audit_id,
            contract_id: entry.contract_id,
            action: entry.action,
            user_id: entry.user_id.clone(),
            details: entry.details.clone(),
            created_at: Utc::now(),
        };
        state.audit.push(row.clone());
        Ok(row)
    }

    async fn recent_audit(&self, contract_id: Uuid, limit: i64) -> Result<Vec<AuditEntry>> {
        self.check()?;
        let state = self.state.read().await;
        let mut rows: Vec<AuditEntry> = state
            .audit
            .iter()
            .rev()
            .filter(|a| a.contract_id == contract_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(title: &str) -> ContractRecord {
        ContractRecord::from_new(
            Uuid::new_v4(),
            format!("CON-2025-{}", 1000 + title.len()),
            &NewContract {
                title: title.into(),
                counterparty_name: "Acme".into(),
                owner_user_id: "u1".into(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn duplicate_contract_number_is_rejected() {
        let store = MemoryStore::new();
        let a = record("abc");
        let mut b = record("xyz");
        b.contract_number = a.contract_number.clone();
        store.insert_contract(&a).await.unwrap();
        assert!(store.insert_contract(&b).await.is_err());
    }

    #[tokio::test]
    async fn full_text_search_requires_every_term() {
        let store = MemoryStore::new();
        store
            .insert_contract(&record("Software Development Agreement"))
            .await
            .unwrap();
        store
            .insert_contract(&record("Office Lease Agreement"))
            .await
            .unwrap();

        let filter = ContractFilter {
            search: Some("agreement software".into()),
            ..Default::default()
        };
        let (rows, total) = store
            .list_contracts(&filter, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].title, "Software Development Agreement");
    }

    #[tokio::test]
    async fn recent_audit_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let contract_id = Uuid::new_v4();
        for i in 0..12 {
            store
                .append_audit(&NewAuditEntry {
                    contract_id,
                    action: AuditAction::Update,
                    user_id: "u1".into(),
                    details: json!({ "n": i }),
                })
                .await
                .unwrap();
        }
        let rows = store.recent_audit(contract_id, 10).await.unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].details["n"], 11);
        assert_eq!(rows[9].details["n"], 2);
    }

    #[tokio::test]
    async fn filter_by_value_range_skips_unvalued_rows() {
        let store = MemoryStore::new();
        let mut cheap = record("cheap");
        cheap.contract_value = Some(rust_decimal::Decimal::new(1_000, 0));
        let mut dear = record("dear");
        dear.contract_value = Some(rust_decimal::Decimal::new(90_000, 0));
        store.insert_contract(&cheap).await.unwrap();
        store.insert_contract(&dear).await.unwrap();
        store.insert_contract(&record("unvalued")).await.unwrap();

        let criteria = FilterCriteria {
            min_value: Some(rust_decimal::Decimal::new(5_000, 0)),
            ..Default::default()
        };
        let rows = store.filter_contracts(&criteria).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "dear");
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.ping().await.is_err());
        assert!(store.all_contracts().await.is_err());
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
