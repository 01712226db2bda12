//! Liveness endpoints. None of these touch the store.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(ok))
        .route("/probe", get(ok))
}

async fn ping() -> &'static str {
    "."
}

async fn ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
