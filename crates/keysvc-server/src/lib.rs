//! `keysvc` HTTP server.
//!
//! Wires the credential service, a storage backend, and the HTTP routes into
//! a running Axum server. Serves the user bundle routes at `/`, the
//! RPC-style key routes under `/key.v1.KeyService/`, and liveness endpoints.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
