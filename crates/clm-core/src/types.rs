use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Defaults ─────────────────────────────────────────────────

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_TERMINATED: &str = "terminated";

pub const DEFAULT_CONTRACT_TYPE: &str = "Other";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Acting user recorded when a mutation carries no explicit identity.
pub const SYSTEM_USER: &str = "system";

// ─── Contract ─────────────────────────────────────────────────

/// A persisted contract row as returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
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
    #[serde(rename = "type")]
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
    /// Whole days from today until expiration; negative once expired.
    pub days_until_expiry: Option<i64>,
}

/// Validated create input. Serialized verbatim into the CREATE audit entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContract {
    pub contract_number: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub counterparty_name: String,
    pub counterparty_email: Option<String>,
    pub counterparty_address: Option<String>,
    pub owner_user_id: String,
    pub owner_department: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub contract_type: Option<String>,
    pub category: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub contract_value: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_terms: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_by: Option<String>,
}

/// Fully resolved insert row: identifiers assigned, defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractRecord {
    pub id: Uuid,
    pub contract_number: String,
    pub title: String,
    pub description: Option<String>,
    pub counterparty_name: String,
    pub counterparty_email: Option<String>,
    pub counterparty_address: Option<String>,
    pub owner_user_id: String,
    pub owner_department: Option<String>,
    pub status: String,
    pub contract_type: String,
    pub category: Option<String>,
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
    pub contract_value: Option<Decimal>,
    pub currency: String,
    pub payment_terms: Option<String>,
    pub tags: Vec<String>,
}

impl ContractRecord {
    pub fn from_new(id: Uuid, contract_number: String, input: &NewContract) -> Self {
        Self {
            id,
            contract_number,
            title: input.title.clone(),
            description: input.description.clone(),
            counterparty_name: input.counterparty_name.clone(),
            counterparty_email: input.counterparty_email.clone(),
            counterparty_address: input.counterparty_address.clone(),
            owner_user_id: input.owner_user_id.clone(),
            owner_department: input.owner_department.clone(),
            status: input
                .status
                .clone()
                .unwrap_or_else(|| STATUS_DRAFT.to_string()),
            contract_type: input
                .contract_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTRACT_TYPE.to_string()),
            category: input.category.clone(),
            effective_date: input.effective_date,
            expiration_date: input.expiration_date,
            contract_value: input.contract_value,
            currency: input
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            payment_terms: input.payment_terms.clone(),
            tags: input.tags.clone().unwrap_or_default(),
        }
    }
}

/// A contract with its milestones and most recent audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractDetail {
    #[serde(flatten)]
    pub contract: Contract,
    pub milestones: Vec<Milestone>,
    pub audit_logs: Vec<AuditEntry>,
}

// ─── Milestones ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneType {
    Review,
    Renewal,
    Expiration,
}

impl MilestoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Renewal => "renewal",
            Self::Expiration => "expiration",
        }
    }
}

impl std::str::FromStr for MilestoneType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "review" => Ok(Self::Review),
            "renewal" => Ok(Self::Renewal),
            "expiration" => Ok(Self::Expiration),
            other => Err(format!("unknown milestone type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub milestone_type: MilestoneType,
    pub name: String,
    pub due_date: NaiveDate,
    pub assignee_email: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMilestone {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub milestone_type: MilestoneType,
    pub name: String,
    pub due_date: NaiveDate,
    pub assignee_email: Option<String>,
    pub notes: Option<String>,
}

// ─── Audit log ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unknown audit action: {other}")),
        }
    }
}

/// Append-only audit row. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub contract_id: Uuid,
    pub action: AuditAction,
    pub user_id: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub contract_id: Uuid,
    pub action: AuditAction,
    pub user_id: String,
    pub details: serde_json::Value,
}

// ─── Queries ──────────────────────────────────────────────────

/// Optional list filters; absent fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractFilter {
    pub status: Option<String>,
    pub contract_type: Option<String>,
    /// Full-text search terms (all terms must match).
    pub search: Option<String>,
}

/// Criteria for the unpaginated filter endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: PageRequest, total: u64) -> Self {
        let limit = u64::from(page.limit.max(1));
        Self {
            page: page.page,
            limit: page.limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractPage {
    pub contracts: Vec<Contract>,
    pub pagination: Pagination,
}

/// A contract with its next review milestone date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingReview {
    #[serde(flatten)]
    pub contract: Contract,
    pub next_review_date: NaiveDate,
}

// ─── Dashboard ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub contract_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: i64,
    pub active: i64,
    pub expiring_soon: i64,
    pub by_type: Vec<TypeCount>,
    pub by_status: Vec<StatusCount>,
}
