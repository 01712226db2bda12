//! HTTP route handlers for `keysvc`.
//!
//! Routes are organized by surface:
//! - `keys`: user credential bundles (`/`, `/validate/{key}`)
//! - `rpc`: single key pairs for agents, hooks, and users (`/key.v1.KeyService/*`)
//! - `health`: liveness endpoints (`/ping`, `/health`, `/probe`)

pub mod health;
pub mod keys;
pub mod rpc;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderMap, HeaderValue, header};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router with middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .merge(keys::router())
        .merge(rpc::router())
        .merge(health::router())
        .layer(middleware)
        .with_state(state)
}

/// A header as a string, or `""` when absent or not valid UTF-8.
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
