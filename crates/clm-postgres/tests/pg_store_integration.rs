//! Store adapter tests against a live PostgreSQL database.
//!
//! Run with: DATABASE_URL="postgresql:///clm_test" cargo test -p clm-postgres --test pg_store_integration -- --ignored

use std::sync::Arc;

use chrono::{Days, Utc};
use clm_core::columns::{ContractColumn, ContractPatch, FieldValue};
use clm_core::ports::HealthCheck;
use clm_core::types::*;
use clm_core::ContractService;
use clm_postgres::{Database, DatabaseConfig};
use uuid::Uuid;

async fn connect() -> (Database, ContractService) {
    let db = Database::connect(&DatabaseConfig::from_env())
        .await
        .expect("failed to connect to test database");
    db.run_migrations().await.expect("migrations failed");
    let stores = db.stores();
    let service = ContractService::new(
        Arc::new(stores.contracts),
        Arc::new(stores.milestones),
        Arc::new(stores.audit),
    );
    (db, service)
}

fn input(tag: &str) -> NewContract {
    NewContract {
        title: format!("Integration {tag}"),
        counterparty_name: format!("Counterparty {tag}"),
        owner_user_id: "it-user".into(),
        status: Some(STATUS_ACTIVE.into()),
        expiration_date: Utc::now().date_naive().checked_add_days(Days::new(20)),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn create_read_update_delete_round() {
    let (db, service) = connect().await;
    let tag = Uuid::new_v4().simple().to_string();

    let created = service.create(input(&tag)).await.unwrap();
    assert_eq!(created.days_until_expiry, Some(20));

    let detail = service.find_by_id(created.id).await.unwrap();
    assert_eq!(detail.milestones.len(), 3);
    assert_eq!(detail.audit_logs.len(), 1);

    let patch = ContractPatch::new().set(
        ContractColumn::Tags,
        FieldValue::TextArray(vec!["renewal".into(), "it".into()]),
    );
    let updated = service.update(created.id, patch, "it-user").await.unwrap();
    assert_eq!(updated.tags, vec!["renewal".to_string(), "it".to_string()]);

    let terminated = service.delete(created.id, "it-user").await.unwrap();
    assert_eq!(terminated.status, STATUS_TERMINATED);

    let detail = service.find_by_id(created.id).await.unwrap();
    assert_eq!(detail.audit_logs[0].action, AuditAction::Delete);
    assert_eq!(detail.audit_logs.len(), 3);

    db.close().await;
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn full_text_search_and_expiring_window() {
    let (db, service) = connect().await;
    let tag = Uuid::new_v4().simple().to_string();
    let created = service.create(input(&tag)).await.unwrap();

    let filter = ContractFilter {
        search: Some(format!("counterparty {tag}")),
        ..Default::default()
    };
    let page = service
        .find_all(filter, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.contracts[0].id, created.id);

    let expiring = service.expiring_soon(30).await.unwrap();
    assert!(expiring.iter().any(|c| c.id == created.id));

    let found = service.search(&tag).await.unwrap();
    assert_eq!(found.len(), 1);

    db.close().await;
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn health_check_pings() {
    let (db, _service) = connect().await;
    db.stores().health.ping().await.unwrap();
    db.test_connection().await.unwrap();
    db.close().await;
}
