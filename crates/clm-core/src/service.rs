//! Contract lifecycle orchestration over the store ports.
//!
//! Mutations trigger their side effects here: default milestones on create,
//! and exactly one audit entry per successful create/update/delete. Side
//! writes are separate statements with no wrapping transaction; a failure
//! after the contract insert leaves the contract without its milestones or
//! audit entry and is reported to the caller.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::columns::ContractPatch;
use crate::contract_number::generate_contract_number;
use crate::error::ClmError;
use crate::milestones::default_schedule;
use crate::ports::{AuditStore, ContractStore, MilestoneStore, Result};
use crate::types::*;

/// Window used by the dashboard expiring-soon count and the default for
/// the expiring-soon and upcoming-review listings.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Audit entries returned with a single contract.
pub const RECENT_AUDIT_LIMIT: i64 = 10;

pub struct ContractService {
    contracts: Arc<dyn ContractStore>,
    milestones: Arc<dyn MilestoneStore>,
    audit: Arc<dyn AuditStore>,
}

impl ContractService {
    pub fn new(
        contracts: Arc<dyn ContractStore>,
        milestones: Arc<dyn MilestoneStore>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            contracts,
            milestones,
            audit,
        }
    }

    // ── Mutations ─────────────────────────────────────────────

    pub async fn create(&self, input: NewContract) -> Result<Contract> {
        let id = Uuid::new_v4();
        let number = input
            .contract_number
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(generate_contract_number);
        let record = ContractRecord::from_new(id, number, &input);

        let contract = self.contracts.insert_contract(&record).await?;
        info!(contract_id = %id, contract_number = %record.contract_number, "contract created");

        if let Some(expiration) = record.expiration_date {
            for plan in default_schedule(expiration) {
                let milestone = plan.into_new(id);
                if let Err(e) = self.milestones.insert_milestone(&milestone).await {
                    error!(contract_id = %id, error = %e, "contract persisted without its milestones");
                    return Err(e);
                }
            }
            debug!(contract_id = %id, "default milestones created");
        }

        let user_id = input
            .created_by
            .clone()
            .unwrap_or_else(|| SYSTEM_USER.to_string());
        let details = json!({
            "action": "contract_created",
            "details": input,
        });
        self.record_audit(id, AuditAction::Create, user_id, details)
            .await?;

        Ok(contract)
    }

    pub async fn update(&self, id: Uuid, patch: ContractPatch, user_id: &str) -> Result<Contract> {
        if patch.is_empty() {
            return Err(ClmError::NoFieldsToUpdate);
        }

        let contract = self
            .contracts
            .update_contract(id, &patch)
            .await?
            .ok_or_else(not_found)?;

        let details = json!({
            "action": "contract_updated",
            "changes": patch.to_json(),
        });
        self.record_audit(id, AuditAction::Update, user_id.to_string(), details)
            .await?;

        info!(contract_id = %id, fields = patch.len(), "contract updated");
        Ok(contract)
    }

    /// Soft delete. The row remains retrievable with status `terminated`.
    pub async fn delete(&self, id: Uuid, user_id: &str) -> Result<Contract> {
        let contract = self
            .contracts
            .terminate_contract(id)
            .await?
            .ok_or_else(not_found)?;

        let details = json!({ "action": "contract_terminated" });
        self.record_audit(id, AuditAction::Delete, user_id.to_string(), details)
            .await?;

        info!(contract_id = %id, "contract terminated");
        Ok(contract)
    }

    // ── Reads ─────────────────────────────────────────────────

    pub async fn find_all(&self, filter: ContractFilter, page: PageRequest) -> Result<ContractPage> {
        let (contracts, total) = self.contracts.list_contracts(&filter, page).await?;
        Ok(ContractPage {
            contracts,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<ContractDetail> {
        let (contract, milestones, audit_logs) = tokio::try_join!(
            self.contracts.find_contract(id),
            self.milestones.milestones_for(id),
            self.audit.recent_audit(id, RECENT_AUDIT_LIMIT),
        )?;

        let contract = contract.ok_or_else(not_found)?;
        Ok(ContractDetail {
            contract,
            milestones,
            audit_logs,
        })
    }

    pub async fn search(&self, term: &str) -> Result<Vec<Contract>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ClmError::InvalidInput(
                "Search query parameter \"q\" is required".to_string(),
            ));
        }
        self.contracts.search_contracts(term).await
    }

    pub async fn filter(&self, criteria: &FilterCriteria) -> Result<Vec<Contract>> {
        self.contracts.filter_contracts(criteria).await
    }

    pub async fn expiring_soon(&self, days: u32) -> Result<Vec<Contract>> {
        let (from, until) = window(days);
        self.contracts.expiring_between(from, until).await
    }

    pub async fn upcoming_reviews(&self, days: u32) -> Result<Vec<UpcomingReview>> {
        let (from, until) = window(days);
        self.contracts.upcoming_reviews(from, until).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let (from, until) = window(DEFAULT_WINDOW_DAYS);
        self.contracts.dashboard_stats(from, until).await
    }

    pub async fn export_all(&self) -> Result<Vec<Contract>> {
        self.contracts.all_contracts().await
    }

    async fn record_audit(
        &self,
        contract_id: Uuid,
        action: AuditAction,
        user_id: String,
        details: serde_json::Value,
    ) -> Result<()> {
        let entry = NewAuditEntry {
            contract_id,
            action,
            user_id,
            details,
        };
        if let Err(e) = self.audit.append_audit(&entry).await {
            error!(%contract_id, action = action.as_str(), error = %e, "audit write failed after mutation");
            return Err(e);
        }
        Ok(())
    }
}

fn not_found() -> ClmError {
    ClmError::NotFound("Contract".to_string())
}

/// `[today, today + days]` in UTC.
fn window(days: u32) -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    let until = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    (today, until)
}
