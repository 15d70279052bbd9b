//! sqlx row types and their conversion into clm-core domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use clm_core::types::{AuditEntry, Contract, Milestone, UpcomingReview};

/// Column list shared by every query that returns contracts.
pub const CONTRACT_COLUMNS: &str = "id, contract_number, title, description, \
     counterparty_name, counterparty_email, counterparty_address, \
     owner_user_id, owner_department, status, type, category, \
     effective_date, expiration_date, contract_value, currency, \
     payment_terms, tags, created_at, updated_at, \
     (expiration_date - CURRENT_DATE) AS days_until_expiry";

pub const MILESTONE_COLUMNS: &str =
    "id, contract_id, milestone_type, name, due_date, assignee_email, notes, created_at";

pub const AUDIT_COLUMNS: &str = "id, contract_id, action, user_id, details, created_at";

#[derive(Debug, sqlx::FromRow)]
pub struct PgContractRow {
    pub id: Uuid,
    pub contract_number: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub counterparty_name: String,
    pub counterparty_email: Option<String>,
    pub counterparty_address: Option<String>,
    pub owner_user_id: String,
    pub owner_department: Option<String>,
    pub status: String,
    #[sqlx(rename = "type")]
    pub contract_type: String,
    pub category: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub contract_value: Option<Decimal>,
    pub currency: String,
    pub payment_terms: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub days_until_expiry: Option<i32>,
}

impl From<PgContractRow> for Contract {
    fn from(r: PgContractRow) -> Self {
        Contract {
            id: r.id,
            contract_number: r.contract_number,
            title: r.title,
            description: r.description,
            counterparty_name: r.counterparty_name,
            counterparty_email: r.counterparty_email,
            counterparty_address: r.counterparty_address,
            owner_user_id: r.owner_user_id,
            owner_department: r.owner_department,
            status: r.status,
            contract_type: r.contract_type,
            category: r.category,
            effective_date: r.effective_date,
            expiration_date: r.expiration_date,
            contract_value: r.contract_value,
            currency: r.currency,
            payment_terms: r.payment_terms,
            tags: r.tags,
            created_at: r.created_at,
            updated_at: r.updated_at,
            days_until_expiry: r.days_until_expiry.map(i64::from),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgUpcomingReviewRow {
    #[sqlx(flatten)]
    pub contract: PgContractRow,
    pub next_review_date: NaiveDate,
}

impl From<PgUpcomingReviewRow> for UpcomingReview {
    fn from(r: PgUpcomingReviewRow) -> Self {
        UpcomingReview {
            contract: r.contract.into(),
            next_review_date: r.next_review_date,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgMilestoneRow {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub milestone_type: String,
    pub name: String,
    pub due_date: NaiveDate,
    pub assignee_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PgMilestoneRow> for Milestone {
    type Error = String;

    fn try_from(r: PgMilestoneRow) -> Result<Self, Self::Error> {
        Ok(Milestone {
            id: r.id,
            contract_id: r.contract_id,
            milestone_type: r.milestone_type.parse()?,
            name: r.name,
            due_date: r.due_date,
            assignee_email: r.assignee_email,
            notes: r.notes,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgAuditRow {
    pub id: i64,
    pub contract_id: Uuid,
    pub action: String,
    pub user_id: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PgAuditRow> for AuditEntry {
    type Error = String;

    fn try_from(r: PgAuditRow) -> Result<Self, Self::Error> {
        Ok(AuditEntry {
            id: r.id,
            contract_id: r.contract_id,
            action: r.action.parse()?,
            user_id: r.user_id,
            details: r.details,
            created_at: r.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clm_core::types::{AuditAction, MilestoneType};
    use serde_json::json;

    #[test]
    fn milestone_row_parses_type() {
        let row = PgMilestoneRow {
            id: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            milestone_type: "renewal".into(),
            name: "60-Day Renewal Notice".into(),
            due_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            assignee_email: None,
            notes: None,
            created_at: Utc::now(),
        };
        let m = Milestone::try_from(row).unwrap();
        assert_eq!(m.milestone_type, MilestoneType::Renewal);
    }

    #[test]
    fn audit_row_rejects_unknown_action() {
        let row = PgAuditRow {
            id: 1,
            contract_id: Uuid::new_v4(),
            action: "PURGE".into(),
            user_id: "u1".into(),
            details: json!({}),
            created_at: Utc::now(),
        };
        assert!(AuditEntry::try_from(row).is_err());
    }

    #[test]
    fn audit_row_parses_action() {
        let row = PgAuditRow {
            id: 7,
            contract_id: Uuid::new_v4(),
            action: "UPDATE".into(),
            user_id: "u1".into(),
            details: json!({"action": "contract_updated"}),
            created_at: Utc::now(),
        };
        let entry = AuditEntry::try_from(row).unwrap();
        assert_eq!(entry.action, AuditAction::Update);
        assert_eq!(entry.details["action"], "contract_updated");
    }

    #[test]
    fn contract_columns_select_expiry_in_days() {
        assert!(CONTRACT_COLUMNS.contains("(expiration_date - CURRENT_DATE) AS days_until_expiry"));
    }

    #[test]
    fn migration_creates_contract_milestones_table() {
        let ddl = include_str!("../migrations/0001_init.sql");
        assert!(ddl.contains("CREATE TABLE IF NOT EXISTS contract_milestones ("));
        assert!(!ddl.contains("CREATE TABLE IF NOT EXISTS milestones ("));
        assert!(ddl.contains("ON contract_milestones (contract_id, due_date)"));
    }
}
