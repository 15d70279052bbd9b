//! HTTP-level tests for the contract API, backed by the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use chrono::{Days, Utc};
use clm_core::store_memory::MemoryStore;
use clm_core::types::AuditAction;
use clm_core::ContractService;
use clm_server::config::ServerConfig;
use clm_server::router::build_router;
use clm_server::state::AppState;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

// ── Test app builder ───────────────────────────────────────────

fn build_test_app_with(store: Arc<MemoryStore>, config: ServerConfig) -> axum::Router {
    let service = Arc::new(ContractService::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));
    build_router(AppState::new(service, store, config))
}

fn build_test_app(store: Arc<MemoryStore>) -> axum::Router {
    build_test_app_with(store, ServerConfig::default())
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn msa_body() -> Value {
    json!({
        "title": "MSA",
        "counterparty_name": "Acme",
        "owner_user_id": "u1",
        "expiration_date": "2025-12-31"
    })
}

async fn create(app: &axum::Router, body: Value) -> Value {
    let (status, json) = send(app, json_request("POST", "/api/contracts", body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["data"].clone()
}

// ── Health & docs ──────────────────────────────────────────────

#[tokio::test]
async fn health_reports_database_state() {
    let store = Arc::new(MemoryStore::new());
    let app = build_test_app(store.clone());

    let (status, json) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "connected");
    assert!(json["timestamp"].is_string());
    assert!(json["version"].is_string());

    store.set_unavailable(true);
    let (status, json) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["database"], "disconnected");
}

#[tokio::test]
async fn api_docs_lists_endpoints() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let (status, json) = send(&app, get("/api-docs")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["endpoints"]["GET /api/contracts/export/csv"].is_string());
}

#[tokio::test]
async fn unknown_route_is_structured_404() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let (status, json) = send(&app, get("/api/nothing-here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Route not found");
    assert!(json["availableRoutes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r == "GET /health"));
}

// ── Create & read ──────────────────────────────────────────────

#[tokio::test]
async fn create_returns_201_and_generates_milestones() {
    let app = build_test_app(Arc::new(MemoryStore::new()));

    let (status, json) = send(&app, json_request("POST", "/api/contracts", msa_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Contract created successfully");
    assert_eq!(json["data"]["status"], "draft");
    assert_eq!(json["data"]["type"], "Other");
    assert_eq!(json["data"]["currency"], "USD");

    let id = json["data"]["id"].as_str().unwrap();
    let (status, json) = send(&app, get(&format!("/api/contracts/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let dates: Vec<_> = json["data"]["milestones"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["due_date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dates, vec!["2025-10-02", "2025-11-01", "2025-12-31"]);
    assert_eq!(json["data"]["audit_logs"][0]["action"], "CREATE");
}

#[tokio::test]
async fn create_audits_the_header_user() {
    let store = Arc::new(MemoryStore::new());
    let app = build_test_app(store.clone());

    let mut body = msa_body();
    body["created_by"] = json!("someone-else");
    let request = Request::builder()
        .method("POST")
        .uri("/api/contracts")
        .header("content-type", "application/json")
        .header("x-user-id", "jane")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");

    let id = Uuid::parse_str(json["data"]["id"].as_str().unwrap()).unwrap();
    let audit = store.audit_entries_for(id).await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::Create);
    assert_eq!(audit[0].user_id, "jane");

    // no header: anonymous, same as the other mutations
    let created = create(&app, msa_body()).await;
    let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
    assert_eq!(store.audit_entries_for(id).await[0].user_id, "anonymous");
}

#[tokio::test]
async fn create_with_null_defaults_uses_defaults() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let mut body = msa_body();
    body["status"] = Value::Null;
    body["currency"] = Value::Null;
    let created = create(&app, body).await;
    assert_eq!(created["status"], "draft");
    assert_eq!(created["currency"], "USD");
}

#[tokio::test]
async fn create_without_required_fields_is_400() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let (status, json) = send(
        &app,
        json_request("POST", "/api/contracts", json!({ "title": "MSA" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(
        json["error"],
        "Missing required fields: title, counterparty_name, owner_user_id"
    );
}

#[tokio::test]
async fn malformed_json_body_is_rejected_with_envelope() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let request = Request::builder()
        .method("POST")
        .uri("/api/contracts")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert!(status.is_client_error());
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn malformed_id_is_400_and_missing_is_404() {
    let app = build_test_app(Arc::new(MemoryStore::new()));

    let (status, json) = send(&app, get("/api/contracts/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid contract ID format");

    let (status, json) = send(&app, get(&format!("/api/contracts/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Contract not found");
}

// ── Update & delete ────────────────────────────────────────────

#[tokio::test]
async fn update_applies_patch_and_audits_acting_user() {
    let store = Arc::new(MemoryStore::new());
    let app = build_test_app(store.clone());
    let created = create(&app, msa_body()).await;
    let id = created["id"].as_str().unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/contracts/{id}"))
        .header("content-type", "application/json")
        .header("x-user-id", "jane")
        .body(Body::from(
            json!({ "id": id, "status": "active", "contract_value": 50000 }).to_string(),
        ))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["message"], "Contract updated successfully");
    assert_eq!(json["data"]["status"], "active");

    let audit = store
        .audit_entries_for(Uuid::parse_str(id).unwrap())
        .await;
    let update = audit
        .iter()
        .find(|a| a.action == AuditAction::Update)
        .unwrap();
    assert_eq!(update.user_id, "jane");
    assert_eq!(update.details["changes"]["status"], "active");
    assert_eq!(update.details["changes"]["contract_value"], json!(50000));
}

#[tokio::test]
async fn update_rejects_empty_and_unknown_fields() {
    let store = Arc::new(MemoryStore::new());
    let app = build_test_app(store.clone());
    let created = create(&app, msa_body()).await;
    let id = created["id"].as_str().unwrap();
    let uri = format!("/api/contracts/{id}");

    let (status, json) = send(&app, json_request("PUT", &uri, json!({ "id": id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No fields to update");

    let (status, json) = send(
        &app,
        json_request(
            "PUT",
            &uri,
            json!({ "status": "active", "owner_user_id = 'x'; --": 1 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Unknown field"));

    // neither request touched the row or the audit log
    let audit = store.audit_entries_for(Uuid::parse_str(id).unwrap()).await;
    assert_eq!(audit.len(), 1);
}

#[tokio::test]
async fn update_missing_contract_is_404() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let uri = format!("/api/contracts/{}", Uuid::new_v4());
    let (status, _) = send(&app, json_request("PUT", &uri, json!({ "title": "x" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_terminates_and_keeps_row() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let created = create(&app, msa_body()).await;
    let uri = format!("/api/contracts/{}", created["id"].as_str().unwrap());

    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Contract terminated successfully");
    assert_eq!(json["data"]["status"], "terminated");

    let (status, json) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "terminated");
    assert_eq!(json["data"]["audit_logs"][0]["action"], "DELETE");
    assert_eq!(json["data"]["audit_logs"][0]["user_id"], "anonymous");
}

// ── Listing & reports ──────────────────────────────────────────

#[tokio::test]
async fn list_filters_and_paginates() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    for (status, kind) in [("active", "MSA"), ("active", "NDA"), ("draft", "MSA")] {
        let mut body = msa_body();
        body["status"] = json!(status);
        body["type"] = json!(kind);
        create(&app, body).await;
    }

    let (status, json) = send(&app, get("/api/contracts?status=active&type=MSA")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["pagination"]["total"], 1);

    let (_, json) = send(&app, get("/api/contracts?page=2&limit=2")).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(
        json["pagination"],
        json!({ "page": 2, "limit": 2, "total": 3, "totalPages": 2 })
    );
}

#[tokio::test]
async fn list_rejects_out_of_range_paging() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    for uri in ["/api/contracts?page=0", "/api/contracts?limit=500", "/api/contracts?limit=x"] {
        let (status, json) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["success"], false);
    }
}

#[tokio::test]
async fn search_requires_q_and_reports_count() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let mut body = msa_body();
    body["counterparty_email"] = json!("legal@techcorp.example");
    create(&app, body).await;
    create(&app, msa_body()).await;

    let (status, json) = send(&app, get("/api/contracts/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Search query parameter \"q\" is required");

    let (status, json) = send(&app, get("/api/contracts/search?q=TECHCORP")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["query"], "TECHCORP");
}

#[tokio::test]
async fn filter_reports_criteria() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let mut body = msa_body();
    body["contract_value"] = json!(250000);
    create(&app, body).await;
    create(&app, msa_body()).await;

    let (status, json) = send(&app, get("/api/contracts/filter?min_value=100000")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert!(json["filters"]["min_value"].is_string() || json["filters"]["min_value"].is_number());

    let (status, _) = send(&app, get("/api/contracts/filter?max_value=lots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expiring_soon_and_upcoming_reviews() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    let today = Utc::now().date_naive();

    let mut expiring = msa_body();
    expiring["status"] = json!("active");
    expiring["expiration_date"] = json!(today.checked_add_days(Days::new(10)).unwrap().to_string());
    create(&app, expiring).await;

    let mut review = msa_body();
    review["expiration_date"] =
        json!(today.checked_add_days(Days::new(100)).unwrap().to_string());
    create(&app, review).await;

    let (status, json) = send(&app, get("/api/contracts/expiring-soon")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["days_until_expiry"], 10);

    let (status, json) = send(&app, get("/api/contracts/upcoming-reviews?days=30")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["days"], 30);
    assert_eq!(json["count"], 1);
    assert_eq!(
        json["data"][0]["next_review_date"],
        today.checked_add_days(Days::new(10)).unwrap().to_string()
    );

    let (status, _) = send(&app, get("/api/contracts/expiring-soon?days=soon")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_shape() {
    let app = build_test_app(Arc::new(MemoryStore::new()));
    create(&app, msa_body()).await;

    let (status, json) = send(&app, get("/api/contracts/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["active"], 0);
    assert_eq!(json["data"]["byStatus"][0]["status"], "draft");
    assert_eq!(json["data"]["byType"][0]["type"], "Other");
}

// ── Export ─────────────────────────────────────────────────────

#[tokio::test]
async fn export_csv_is_attachment_or_404_when_empty() {
    let app = build_test_app(Arc::new(MemoryStore::new()));

    let (status, json) = send(&app, get("/api/contracts/export/csv")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "No contracts to export");

    create(&app, msa_body()).await;
    let resp = app
        .clone()
        .oneshot(get("/api/contracts/export/csv"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"contracts_export.csv\""
    );
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 2);
}

// ── Failures ───────────────────────────────────────────────────

#[tokio::test]
async fn store_failure_is_generic_500_with_details_outside_production() {
    let store = Arc::new(MemoryStore::new());
    let app = build_test_app(store.clone());
    store.set_unavailable(true);

    let (status, json) = send(&app, get("/api/contracts")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Failed to fetch contracts");
    assert!(json["details"].is_string());
}

#[tokio::test]
async fn production_hides_error_details() {
    let store = Arc::new(MemoryStore::new());
    let config = ServerConfig::from_vars(|k| (k == "CLM_ENV").then(|| "production".to_string()));
    let app = build_test_app_with(store.clone(), config);
    store.set_unavailable(true);

    let (status, json) = send(&app, get("/api/contracts/stats")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to fetch statistics");
    assert!(json.get("details").is_none());
}
