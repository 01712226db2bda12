//! HTTP route handlers for user credential bundles.
//!
//! Endpoints:
//! - `POST /`: issue a fresh bundle (`X-User-ID`, `X-Service-Key`)
//! - `GET  /`: read the current bundle (`X-User-ID`, `X-Service-Key`)
//! - `GET  /validate/{key}`: check a key against the user's bundle (`X-User-ID`)

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};

use keysvc_core::principal::BundleRecord;

use super::header_str;
use crate::error::{AppError, NOT_ALLOWED};
use crate::state::AppState;

const USER_ID: &str = "x-user-id";
const SERVICE_KEY: &str = "x-service-key";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_bundle).post(create_bundle))
        .route("/validate/{key}", get(validate_key))
}

/// Response body for `POST /` and `GET /`.
#[derive(Debug, Serialize)]
pub struct BundleResponse {
    pub status: &'static str,
    pub user_service: String,
    pub hooks_service: String,
    pub company_service: String,
    pub billing_service: String,
    pub permissions: String,
}

impl From<BundleRecord> for BundleResponse {
    fn from(record: BundleRecord) -> Self {
        let bundle = record.bundle;
        Self {
            status: "ok",
            user_service: bundle.user_service,
            hooks_service: bundle.hooks_service,
            company_service: bundle.company_service,
            billing_service: bundle.billing_service,
            permissions: bundle.permissions_service,
        }
    }
}

async fn create_bundle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BundleResponse>, AppError> {
    let record = state
        .service
        .create_bundle(header_str(&headers, USER_ID), header_str(&headers, SERVICE_KEY))
        .await?;
    Ok(Json(record.into()))
}

async fn get_bundle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<BundleResponse>, AppError> {
    let record = state
        .service
        .get_bundle(header_str(&headers, USER_ID), header_str(&headers, SERVICE_KEY))
        .await?;
    Ok(Json(record.into()))
}

async fn validate_key(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let valid = state
        .service
        .validate_bundle_key(header_str(&headers, USER_ID), &key)
        .await?;
    if !valid {
        return Err(AppError::Unauthorized(NOT_ALLOWED.to_owned()));
    }
    Ok(Json(json!({ "status": "ok" })))
}
