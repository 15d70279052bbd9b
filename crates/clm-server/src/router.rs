//! Router construction for the CLM server.

use std::any::Any;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::panic_response;
use crate::handlers;
use crate::state::AppState;

pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Every route with a one-line description. Served by `/api-docs` and
/// listed in the 404 body.
pub const AVAILABLE_ROUTES: &[(&str, &str)] = &[
    ("GET /health", "Service and database health"),
    ("GET /api-docs", "This document"),
    ("GET /api/contracts", "List contracts (page, limit, status, type, search)"),
    ("POST /api/contracts", "Create a contract"),
    ("GET /api/contracts/:id", "Get a contract with milestones and recent audit log"),
    ("PUT /api/contracts/:id", "Update a contract"),
    ("DELETE /api/contracts/:id", "Terminate a contract (soft delete)"),
    ("GET /api/contracts/stats", "Dashboard statistics"),
    ("GET /api/contracts/search", "Search contracts by keyword (q)"),
    ("GET /api/contracts/filter", "Filter contracts by status, type, owner and value range"),
    ("GET /api/contracts/expiring-soon", "Active contracts expiring within days (default 30)"),
    ("GET /api/contracts/upcoming-reviews", "Contracts with a review due within days (default 30)"),
    ("GET /api/contracts/export/csv", "Export all contracts as CSV"),
];

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let expose_details = state.expose_details();
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api-docs", get(handlers::docs::api_docs))
        .route(
            "/api/contracts",
            get(handlers::contracts::list).post(handlers::contracts::create),
        )
        .route("/api/contracts/stats", get(handlers::reports::stats))
        .route("/api/contracts/search", get(handlers::reports::search))
        .route("/api/contracts/filter", get(handlers::reports::filter))
        .route(
            "/api/contracts/expiring-soon",
            get(handlers::reports::expiring_soon),
        )
        .route(
            "/api/contracts/upcoming-reviews",
            get(handlers::reports::upcoming_reviews),
        )
        .route("/api/contracts/export/csv", get(handlers::export::export_csv))
        .route(
            "/api/contracts/:id",
            get(handlers::contracts::get)
                .put(handlers::contracts::update)
                .delete(handlers::contracts::delete),
        )
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| panic_response(panic, expose_details),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::from(cors::Any)
    } else {
        match origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(origin, "invalid CORS_ORIGIN, allowing any origin");
                AllowOrigin::from(cors::Any)
            }
        }
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any)
}
