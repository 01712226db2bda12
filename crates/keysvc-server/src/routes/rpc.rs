//! RPC-style key routes.
//!
//! Each method is `POST /key.v1.KeyService/<Method>` with a JSON body.
//! Expected outcomes (missing input, rejected service key, not found) come
//! back as `200 OK` with a `status` string. Only system failures use
//! `500`, with status `"system error"`. A body that is not a JSON object
//! of the expected shape is rejected with axum's status code and a
//! `{"status": "invalid request body"}` reply.
//!
//! Methods:
//! - `CreateAgentKeys`, `GetAgentKeys`, `ValidateAgentKey`
//! - `CreateHookKeys`, `GetHookKeys`, `GetHookKeysForCompany`, `ValidateHookKey`
//! - `CreateUserKeys`, `ValidateUserKeys`

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use keysvc_core::error::ServiceError;
use keysvc_core::principal::{PrincipalKey, PrincipalRecord, PrincipalType};

use crate::state::AppState;

/// Route prefix shared by every method.
pub const PREFIX: &str = "/key.v1.KeyService";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("{PREFIX}/CreateAgentKeys"), post(create_agent_keys))
        .route(&format!("{PREFIX}/GetAgentKeys"), post(get_agent_keys))
        .route(&format!("{PREFIX}/ValidateAgentKey"), post(validate_agent_key))
        .route(&format!("{PREFIX}/CreateHookKeys"), post(create_hook_keys))
        .route(&format!("{PREFIX}/GetHookKeys"), post(get_hook_keys))
        .route(
            &format!("{PREFIX}/GetHookKeysForCompany"),
            post(get_hook_keys_for_company),
        )
        .route(&format!("{PREFIX}/ValidateHookKey"), post(validate_hook_key))
        .route(&format!("{PREFIX}/CreateUserKeys"), post(create_user_keys))
        .route(&format!("{PREFIX}/ValidateUserKeys"), post(validate_user_keys))
}

// ── Body extraction ──────────────────────────────────────────────────

/// JSON body whose rejections reply in the RPC `{status}` shape.
pub struct RpcJson<T>(pub T);

impl<S, T> FromRequest<S> for RpcJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(body)) => Ok(Self(body)),
            Err(rejection) => Err(reject(&rejection)),
        }
    }
}

fn reject(rejection: &JsonRejection) -> Response {
    debug!(reason = %rejection.body_text(), "rejected RPC body");
    (
        rejection.status(),
        Json(KeyResponse::with_status(INVALID_BODY.to_owned())),
    )
        .into_response()
}

// ── Request / Response types ─────────────────────────────────────────

/// Body for agent and hooks create/get calls.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyRequest {
    pub service_key: String,
    pub company_id: String,
}

/// Body for `CreateUserKeys`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserRequest {
    pub service_key: String,
    pub user_id: String,
}

/// Body for `ValidateAgentKey` and `ValidateHookKey`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidateCompanyKeyRequest {
    pub service_key: String,
    pub company_id: String,
    pub key: String,
    pub secret: String,
}

/// Body for `ValidateUserKeys`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidateUserKeyRequest {
    pub service_key: String,
    pub user_id: String,
    pub key: String,
    pub secret: String,
}

/// Reply for create and get calls. `secret` is only present on create.
#[derive(Debug, Default, Serialize)]
pub struct KeyResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<i64>,
}

/// Reply for validate calls.
#[derive(Debug, Default, Serialize)]
pub struct ValidKeyResponse {
    pub status: String,
    pub valid: bool,
}

/// One entry of [`MultipleHooksResponse`].
#[derive(Debug, Serialize)]
pub struct HookKey {
    pub company_id: String,
    pub key: String,
    pub generated: i64,
}

/// Reply for `GetHookKeysForCompany`.
#[derive(Debug, Default, Serialize)]
pub struct MultipleHooksResponse {
    pub status: String,
    pub keys: Vec<HookKey>,
}

const OK: &str = "ok";
const INVALID_BODY: &str = "invalid request body";

impl From<PrincipalRecord> for KeyResponse {
    fn from(record: PrincipalRecord) -> Self {
        Self {
            status: OK.to_owned(),
            key: Some(record.key),
            secret: Some(record.secret),
            generated: Some(record.generated_at),
        }
    }
}

impl From<PrincipalKey> for KeyResponse {
    fn from(key: PrincipalKey) -> Self {
        Self {
            status: OK.to_owned(),
            key: Some(key.key),
            secret: None,
            generated: Some(key.generated_at),
        }
    }
}

/// A reply type that can carry a bare status.
trait StatusOnly: Serialize + Default {
    fn with_status(status: String) -> Self;
}

impl StatusOnly for KeyResponse {
    fn with_status(status: String) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}

impl StatusOnly for ValidKeyResponse {
    fn with_status(status: String) -> Self {
        Self {
            status,
            valid: false,
        }
    }
}

impl StatusOnly for MultipleHooksResponse {
    fn with_status(status: String) -> Self {
        Self {
            status,
            keys: Vec::new(),
        }
    }
}

/// Turn a service result into an RPC reply.
fn reply<T, R>(result: Result<T, ServiceError>) -> Response
where
    R: StatusOnly + From<T>,
{
    match result {
        Ok(value) => Json(R::from(value)).into_response(),
        Err(err) if err.is_system() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(R::with_status(err.status())),
        )
            .into_response(),
        Err(err) => Json(R::with_status(err.status())).into_response(),
    }
}

fn valid(result: Result<bool, ServiceError>) -> Response {
    reply::<_, ValidKeyResponse>(result.map(|valid| ValidKeyResponse {
        status: OK.to_owned(),
        valid,
    }))
}

// ── Agent ────────────────────────────────────────────────────────────

async fn create_agent_keys(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<CompanyRequest>,
) -> Response {
    reply::<_, KeyResponse>(
        state
            .service
            .create_key_pair(PrincipalType::Agent, &body.company_id, &body.service_key)
            .await,
    )
}

async fn get_agent_keys(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<CompanyRequest>,
) -> Response {
    reply::<_, KeyResponse>(
        state
            .service
            .get_key_pair(PrincipalType::Agent, &body.company_id, &body.service_key)
            .await,
    )
}

async fn validate_agent_key(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<ValidateCompanyKeyRequest>,
) -> Response {
    valid(
        state
            .service
            .validate_key_pair(
                PrincipalType::Agent,
                &body.company_id,
                &body.service_key,
                &body.key,
                &body.secret,
            )
            .await,
    )
}

// ── Hooks ────────────────────────────────────────────────────────────

async fn create_hook_keys(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<CompanyRequest>,
) -> Response {
    reply::<_, KeyResponse>(
        state
            .service
            .create_key_pair(PrincipalType::Hooks, &body.company_id, &body.service_key)
            .await,
    )
}

async fn get_hook_keys(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<CompanyRequest>,
) -> Response {
    reply::<_, KeyResponse>(
        state
            .service
            .get_key_pair(PrincipalType::Hooks, &body.company_id, &body.service_key)
            .await,
    )
}

/// A company holds at most one hooks key, so this lists zero or one.
async fn get_hook_keys_for_company(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<CompanyRequest>,
) -> Response {
    let result = match state
        .service
        .get_key_pair(PrincipalType::Hooks, &body.company_id, &body.service_key)
        .await
    {
        Ok(key) => Ok(vec![key]),
        Err(ServiceError::NotFound) => Ok(Vec::new()),
        Err(err) => Err(err),
    };
    reply::<_, MultipleHooksResponse>(result)
}

impl From<Vec<PrincipalKey>> for MultipleHooksResponse {
    fn from(keys: Vec<PrincipalKey>) -> Self {
        Self {
            status: OK.to_owned(),
            keys: keys
                .into_iter()
                .map(|k| HookKey {
                    company_id: k.principal_id,
                    key: k.key,
                    generated: k.generated_at,
                })
                .collect(),
        }
    }
}

async fn validate_hook_key(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<ValidateCompanyKeyRequest>,
) -> Response {
    valid(
        state
            .service
            .validate_key_pair(
                PrincipalType::Hooks,
                &body.company_id,
                &body.service_key,
                &body.key,
                &body.secret,
            )
            .await,
    )
}

// ── User ─────────────────────────────────────────────────────────────

async fn create_user_keys(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<UserRequest>,
) -> Response {
    reply::<_, KeyResponse>(
        state
            .service
            .create_key_pair(PrincipalType::User, &body.user_id, &body.service_key)
            .await,
    )
}

async fn validate_user_keys(
    State(state): State<Arc<AppState>>,
    RpcJson(body): RpcJson<ValidateUserKeyRequest>,
) -> Response {
    valid(
        state
            .service
            .validate_key_pair(
                PrincipalType::User,
                &body.user_id,
                &body.service_key,
                &body.key,
                &body.secret,
            )
            .await,
    )
}
