//! GET /api-docs

use axum::Json;
use serde_json::{json, Map, Value};

use super::health::VERSION;
use crate::router::AVAILABLE_ROUTES;

pub async fn api_docs() -> Json<Value> {
    let endpoints: Map<String, Value> = AVAILABLE_ROUTES
        .iter()
        .map(|(route, description)| (route.to_string(), Value::from(*description)))
        .collect();
    Json(json!({
        "message": "CLM Automation API Documentation",
        "version": VERSION,
        "endpoints": endpoints,
    }))
}
