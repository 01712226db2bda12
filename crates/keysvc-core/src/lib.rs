//! Core library for `keysvc`.
//!
//! Mints opaque key/secret credentials for principals (users, hooks
//! integrations, agents), keeps at most one live record per principal, and
//! gates every privileged operation behind a static allow-list of
//! inter-service keys. This crate depends on `keysvc-storage` for the
//! document store trait and knows nothing about HTTP.
//!
//! Leaves first:
//!
//! - [`generator`]: secure random letter strings, key pairs, and bundles
//! - [`freshness`]: the ±2h window applied to bundle reads
//! - [`gate`]: service-key allow-list
//! - [`store`]: principal records on top of a [`keysvc_storage::DocumentStore`]
//! - [`service`]: create / get / validate with the fixed check ordering

pub mod directory;
pub mod error;
pub mod freshness;
pub mod gate;
pub mod generator;
pub mod principal;
pub mod service;
pub mod store;
