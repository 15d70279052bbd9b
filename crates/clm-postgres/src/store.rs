//! Postgres implementations of all clm-core port traits.
//!
//! Each adapter is a newtype wrapping PgPool.

use std::time::Instant;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use clm_core::columns::ContractPatch;
use clm_core::error::ClmError;
use clm_core::ports::{AuditStore, ContractStore, HealthCheck, MilestoneStore, Result};
use clm_core::types::*;

use crate::query;
use crate::rows::{
    PgAuditRow, PgContractRow, PgMilestoneRow, PgUpcomingReviewRow, AUDIT_COLUMNS,
    CONTRACT_COLUMNS, MILESTONE_COLUMNS,
};

fn contracts(rows: Vec<PgContractRow>) -> Vec<Contract> {
    rows.into_iter().map(Contract::from).collect()
}

// ── PgContractStore ───────────────────────────────────────────

pub struct PgContractStore {
    pool: PgPool,
}

impl PgContractStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContractStore for PgContractStore {
    async fn insert_contract(&self, record: &ContractRecord) -> Result<Contract> {
        let sql = format!(
            r#"
            INSERT INTO contracts (
                id, contract_number, title, description,
                counterparty_name, counterparty_email, counterparty_address,
                owner_user_id, owner_department, status, type, category,
                effective_date, expiration_date, contract_value, currency,
                payment_terms, tags
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING {CONTRACT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PgContractRow>(&sql)
            .bind(record.id)
            .bind(&record.contract_number)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.counterparty_name)
            .bind(&record.counterparty_email)
            .bind(&record.counterparty_address)
            .bind(&record.owner_user_id)
            .bind(&record.owner_department)
            .bind(&record.status)
            .bind(&record.contract_type)
            .bind(&record.category)
            .bind(record.effective_date)
            .bind(record.expiration_date)
            .bind(record.contract_value)
            .bind(&record.currency)
            .bind(&record.payment_terms)
            .bind(&record.tags)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.into())
    }

    async fn update_contract(&self, id: Uuid, patch: &ContractPatch) -> Result<Option<Contract>> {
        if patch.is_empty() {
            return Err(ClmError::NoFieldsToUpdate);
        }
        let row = query::update_contract(id, patch)
            .build_query_as::<PgContractRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Contract::from))
    }

    async fn terminate_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        let sql = format!(
            "UPDATE contracts SET status = $1, updated_at = NOW() \
             WHERE id = $2 RETURNING {CONTRACT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PgContractRow>(&sql)
            .bind(STATUS_TERMINATED)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Contract::from))
    }

    async fn find_contract(&self, id: Uuid) -> Result<Option<Contract>> {
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1");
        let row = sqlx::query_as::<_, PgContractRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Contract::from))
    }

    async fn list_contracts(
        &self,
        filter: &ContractFilter,
        page: PageRequest,
    ) -> Result<(Vec<Contract>, u64)> {
        let started = Instant::now();
        let mut list = query::list_contracts(filter, page);
        let mut count = query::count_contracts(filter);
        let (rows, total) = tokio::try_join!(
            list.build_query_as::<PgContractRow>().fetch_all(&self.pool),
            count.build_query_scalar::<i64>().fetch_one(&self.pool),
        )
        .map_err(|e| anyhow!(e))?;
        debug!(
            rows = rows.len(),
            total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "list_contracts"
        );
        Ok((contracts(rows), total.max(0) as u64))
    }

    async fn search_contracts(&self, term: &str) -> Result<Vec<Contract>> {
        let sql = format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM contracts
            WHERE title ILIKE $1
               OR description ILIKE $1
               OR counterparty_name ILIKE $1
               OR counterparty_email ILIKE $1
            ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, PgContractRow>(&sql)
            .bind(format!("%{term}%"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(contracts(rows))
    }

    async fn filter_contracts(&self, criteria: &FilterCriteria) -> Result<Vec<Contract>> {
        let rows = query::filter_contracts(criteria)
            .build_query_as::<PgContractRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(contracts(rows))
    }

    async fn expiring_between(&self, from: NaiveDate, until: NaiveDate) -> Result<Vec<Contract>> {
        let sql = format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM contracts
            WHERE status = $1
              AND expiration_date BETWEEN $2 AND $3
            ORDER BY expiration_date ASC
            "#
        );
        let rows = sqlx::query_as::<_, PgContractRow>(&sql)
            .bind(STATUS_ACTIVE)
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(contracts(rows))
    }

    async fn upcoming_reviews(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<UpcomingReview>> {
        let sql = format!(
            r#"
            SELECT {CONTRACT_COLUMNS}, r.next_review_date
            FROM contracts
            JOIN (
                SELECT contract_id, MIN(due_date) AS next_review_date
                FROM contract_milestones
                WHERE milestone_type = $1
                  AND due_date BETWEEN $2 AND $3
                GROUP BY contract_id
            ) r ON r.contract_id = contracts.id
            WHERE status <> $4
            ORDER BY r.next_review_date ASC
            "#
        );
        let rows = sqlx::query_as::<_, PgUpcomingReviewRow>(&sql)
            .bind(MilestoneType::Review.as_str())
            .bind(from)
            .bind(until)
            .bind(STATUS_TERMINATED)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(UpcomingReview::from).collect())
    }

    async fn all_contracts(&self) -> Result<Vec<Contract>> {
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, PgContractRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(contracts(rows))
    }

    async fn dashboard_stats(&self, from: NaiveDate, until: NaiveDate) -> Result<DashboardStats> {
        let started = Instant::now();
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contracts")
            .fetch_one(&self.pool);
        let active = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contracts WHERE status = $1")
            .bind(STATUS_ACTIVE)
            .fetch_one(&self.pool);
        let expiring = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM contracts \
             WHERE status = $1 AND expiration_date BETWEEN $2 AND $3",
        )
        .bind(STATUS_ACTIVE)
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool);
        let by_type = sqlx::query_as::<_, (String, i64)>(
            "SELECT type, COUNT(*) FROM contracts GROUP BY type ORDER BY COUNT(*) DESC, type",
        )
        .fetch_all(&self.pool);
        let by_status = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM contracts GROUP BY status ORDER BY COUNT(*) DESC, status",
        )
        .fetch_all(&self.pool);

        let (total, active, expiring_soon, by_type, by_status) =
            tokio::try_join!(total, active, expiring, by_type, by_status)
                .map_err(|e| anyhow!(e))?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dashboard_stats"
        );

        Ok(DashboardStats {
            total,
            active,
            expiring_soon,
            by_type: by_type
                .into_iter()
                .map(|(contract_type, count)| TypeCount {
                    contract_type,
                    count,
                })
                .collect(),
            by_status: by_status
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
        })
    }
}

// ── PgMilestoneStore ──────────────────────────────────────────

pub struct PgMilestoneStore {
    pool: PgPool,
}

impl PgMilestoneStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MilestoneStore for PgMilestoneStore {
    async fn insert_milestone(&self, milestone: &NewMilestone) -> Result<Milestone> {
        let sql = format!(
            r#"
            INSERT INTO contract_milestones (
                id, contract_id, milestone_type, name, due_date, assignee_email, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MILESTONE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PgMilestoneRow>(&sql)
            .bind(milestone.id)
            .bind(milestone.contract_id)
            .bind(milestone.milestone_type.as_str())
            .bind(&milestone.name)
            .bind(milestone.due_date)
            .bind(&milestone.assignee_email)
            .bind(&milestone.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        row.try_into()
            .map_err(|e: String| ClmError::Internal(anyhow!(e)))
    }

    async fn milestones_for(&self, contract_id: Uuid) -> Result<Vec<Milestone>> {
        let sql = format!(
            "SELECT {MILESTONE_COLUMNS} FROM contract_milestones \
             WHERE contract_id = $1 ORDER BY due_date ASC"
        );
        let rows = sqlx::query_as::<_, PgMilestoneRow>(&sql)
            .bind(contract_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        rows.into_iter()
            .map(|r| {
                r.try_into()
                    .map_err(|e: String| ClmError::Internal(anyhow!(e)))
            })
            .collect()
    }
}

// ── PgAuditStore ──────────────────────────────────────────────

pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntry> {
        let sql = format!(
            "INSERT INTO audit_logs (contract_id, action, user_id, details) \
             VALUES ($1, $2, $3, $4) RETURNING {AUDIT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PgAuditRow>(&sql)
            .bind(entry.contract_id)
            .bind(entry.action.as_str())
            .bind(&entry.user_id)
            .bind(&entry.details)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        row.try_into()
            .map_err(|e: String| ClmError::Internal(anyhow!(e)))
    }

    async fn recent_audit(&self, contract_id: Uuid, limit: i64) -> Result<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs \
             WHERE contract_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, PgAuditRow>(&sql)
            .bind(contract_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        rows.into_iter()
            .map(|r| {
                r.try_into()
                    .map_err(|e: String| ClmError::Internal(anyhow!(e)))
            })
            .collect()
    }
}

// ── PgHealthCheck ─────────────────────────────────────────────

pub struct PgHealthCheck {
    pool: PgPool,
}

impl PgHealthCheck {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthCheck for PgHealthCheck {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
