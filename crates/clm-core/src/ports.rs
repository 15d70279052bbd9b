//! Persistence port traits.
//!
//! `ContractService` operates exclusively through these traits so the same
//! orchestration runs against Postgres (`clm-postgres`) or `MemoryStore`.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::columns::ContractPatch;
use crate::error::ClmError;
use crate::types::*;

pub type Result<T> = std::result::Result<T, ClmError>;

#[async_trait]
pub trait ContractStore: Send + Sync {
    // ── Mutations ──

    async fn insert_contract(&self, record: &ContractRecord) -> Result<Contract>;

    /// Apply `patch` and bump `updated_at`. `None` when no row has `id`.
    async fn update_contract(&self, id: Uuid, patch: &ContractPatch) -> Result<Option<Contract>>;

    /// Soft delete: status becomes `terminated`, the row stays.
    async fn terminate_contract(&self, id: Uuid) -> Result<Option<Contract>>;

    // ── Reads ──

    async fn find_contract(&self, id: Uuid) -> Result<Option<Contract>>;

    /// One page of matching contracts, newest first, plus the total match count.
    async fn list_contracts(
        &self,
        filter: &ContractFilter,
        page: PageRequest,
    ) -> Result<(Vec<Contract>, u64)>;

    /// Case-insensitive keyword match over title, description and counterparty.
    async fn search_contracts(&self, term: &str) -> Result<Vec<Contract>>;

    async fn filter_contracts(&self, criteria: &FilterCriteria) -> Result<Vec<Contract>>;

    /// Active contracts expiring within `[from, until]`, soonest first.
    async fn expiring_between(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<Contract>>;

    /// Non-terminated contracts with a review milestone due within `[from, until]`.
    async fn upcoming_reviews(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<UpcomingReview>>;

    async fn all_contracts(&self) -> Result<Vec<Contract>>;

    // ── Aggregates ──

    /// `expiring_soon` counts active contracts expiring within `[from, until]`.
    async fn dashboard_stats(&self, from: NaiveDate, until: NaiveDate) -> Result<DashboardStats>;
}

#[async_trait]
pub trait MilestoneStore: Send + Sync {
    async fn insert_milestone(&self, milestone: &NewMilestone) -> Result<Milestone>;

    /// Milestones of one contract ordered by due date ascending.
    async fn milestones_for(&self, contract_id: Uuid) -> Result<Vec<Milestone>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntry>;

    /// Most recent entries first.
    async fn recent_audit(&self, contract_id: Uuid, limit: i64) -> Result<Vec<AuditEntry>>;
}

/// Liveness probe of the backing store.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
