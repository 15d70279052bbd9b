//! Postgres implementations of the clm-core store ports.
//!
//! All SQL is runtime-checked (`sqlx::query_as`, not `sqlx::query!`) so the
//! crate builds without a live database.

pub mod database;
pub mod query;
pub mod rows;
pub mod store;

pub use database::{mask_database_url, ConnectionStats, Database, DatabaseConfig};
pub use store::{PgAuditStore, PgContractStore, PgHealthCheck, PgMilestoneStore};

use sqlx::PgPool;

/// Every adapter over one shared pool.
pub struct PgStores {
    pub contracts: PgContractStore,
    pub milestones: PgMilestoneStore,
    pub audit: PgAuditStore,
    pub health: PgHealthCheck,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            contracts: PgContractStore::new(pool.clone()),
            milestones: PgMilestoneStore::new(pool.clone()),
            audit: PgAuditStore::new(pool.clone()),
            health: PgHealthCheck::new(pool),
        }
    }
}
