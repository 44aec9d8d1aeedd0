use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use infokeeper_auth::{Principal, TokenManager};
use infokeeper_contracts::{
    CredentialFilter, CreditCardFilter, ErrorCode, ErrorResponse, LoginUserRequest,
    RegisterUserRequest, SaveCredentialRequest, SaveCreditCardRequest, SaveResponse,
    SaveTextDataRequest, TextDataFilter, TokenResponse,
};
use infokeeper_storage::{PgStore, VaultStore};
use serde::Serialize;
use tracing::Instrument;

use crate::config::{ServerConfig, StartupError};
use crate::gate::{self, Caller, Gate};
use crate::operation::Operation;
use crate::service::{LoadRequest, SaveRequest, ServiceError, VaultService};

/// Caller-supplied remaining budget for the request, in milliseconds.
pub const TIMEOUT_HEADER: &str = "x-infokeeper-timeout-ms";

pub type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Clone)]
pub struct AppState<S> {
    service: VaultService<S>,
}

pub async fn router_from_config(config: &ServerConfig) -> Result<Router, StartupError> {
    let tokens = TokenManager::new(config.token_config()).map_err(|err| StartupError {
        code: err.code,
        message: err.message,
    })?;

    for operation in config.unprotected_owner_scoped() {
        tracing::warn!(
            operation = operation.name(),
            "owner-scoped operation is not protected; its calls will fail without a principal"
        );
    }

    let store = PgStore::connect_and_migrate(&config.store_config())
        .await
        .map_err(|err| StartupError {
            code: "ERR_DB_UNAVAILABLE",
            message: format!("failed to initialize storage: {}", err),
        })?;

    Ok(router(store, tokens, config.protected_operations.clone()))
}

pub fn router<S: VaultStore>(
    store: S,
    tokens: TokenManager,
    protected: BTreeSet<Operation>,
) -> Router {
    let gate = Gate::new(tokens.clone(), protected);
    let state = AppState {
        service: VaultService::new(store, tokens),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz::<S>))
        .route("/metrics", get(metrics))
        .route(Operation::RegisterUser.path(), post(register::<S>))
        .route(Operation::LoginUser.path(), post(login::<S>))
        .route(
            Operation::SaveCredential.path(),
            post(save::<S, SaveCredentialRequest>),
        )
        .route(
            Operation::LoadCredentials.path(),
            post(load::<S, CredentialFilter>),
        )
        .route(
            Operation::SaveCreditCard.path(),
            post(save::<S, SaveCreditCardRequest>),
        )
        .route(
            Operation::LoadCreditCards.path(),
            post(load::<S, CreditCardFilter>),
        )
        .route(
            Operation::SaveTextData.path(),
            post(save::<S, SaveTextDataRequest>),
        )
        .route(
            Operation::LoadTextData.path(),
            post(load::<S, TextDataFilter>),
        )
        .layer(middleware::from_fn_with_state(gate, gate::authorize))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct ReadyzResponse {
    status: &'static str,
    checks: BTreeMap<&'static str, bool>,
}

async fn readyz<S: VaultStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let mut checks = BTreeMap::new();
    checks.insert("storage", state.service.store().ping().await.is_ok());

    let all_ready = checks.values().all(|ok| *ok);
    let status = if all_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyzResponse {
            status: if all_ready { "ready" } else { "not_ready" },
            checks,
        }),
    )
}

async fn metrics() -> impl IntoResponse {
    match crate::metrics::render() {
        Ok((body, content_type)) => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(content_type.as_str()) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            (headers, body).into_response()
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn register<S: VaultStore>(
    State(state): State<AppState<S>>,
    Caller(principal): Caller,
    headers: HeaderMap,
    req: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    observed(Operation::RegisterUser, principal.as_ref(), async {
        let Json(req) = req.map_err(|_| ServiceError::InvalidBody)?;
        let token = state
            .service
            .register(req, caller_deadline(&headers))
            .await?;
        Ok::<_, ServiceError>(TokenResponse { token })
    })
    .await
}

async fn login<S: VaultStore>(
    State(state): State<AppState<S>>,
    Caller(principal): Caller,
    headers: HeaderMap,
    req: Result<Json<LoginUserRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    observed(Operation::LoginUser, principal.as_ref(), async {
        let Json(req) = req.map_err(|_| ServiceError::InvalidBody)?;
        let token = state.service.login(req, caller_deadline(&headers)).await?;
        Ok::<_, ServiceError>(TokenResponse { token })
    })
    .await
}

async fn save<S, Q>(
    State(state): State<AppState<S>>,
    Caller(principal): Caller,
    headers: HeaderMap,
    req: Result<Json<Q>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError>
where
    S: VaultStore,
    Q: SaveRequest,
{
    observed(Q::OPERATION, principal.as_ref(), async {
        let Json(req) = req.map_err(|_| ServiceError::InvalidBody)?;
        state
            .service
            .save(principal.as_ref(), req, caller_deadline(&headers))
            .await?;
        Ok::<_, ServiceError>(SaveResponse {})
    })
    .await
}

async fn load<S, Q>(
    State(state): State<AppState<S>>,
    Caller(principal): Caller,
    headers: HeaderMap,
    req: Result<Json<Q>, JsonRejection>,
) -> Result<Json<Q::Response>, ApiError>
where
    S: VaultStore,
    Q: LoadRequest,
{
    observed(Q::OPERATION, principal.as_ref(), async {
        let Json(filter) = req.map_err(|_| ServiceError::InvalidBody)?;
        let records = state
            .service
            .load(principal.as_ref(), &filter, caller_deadline(&headers))
            .await?;
        Ok::<_, ServiceError>(Q::respond(records))
    })
    .await
}

/// Runs one RPC inside its span and records outcome, latency and metrics.
async fn observed<T, F>(
    operation: Operation,
    principal: Option<&Principal>,
    call: F,
) -> Result<Json<T>, ApiError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    let span = tracing::info_span!(
        "rpc",
        operation = operation.name(),
        principal_id = principal.map(|p| p.user_id.as_str()).unwrap_or_default(),
        latency_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );

    let started = Instant::now();
    let result = call.instrument(span.clone()).await;
    let latency = started.elapsed();

    let outcome = match &result {
        Ok(_) => "OK",
        Err(err) => err.code().as_str(),
    };
    span.record("latency_ms", latency.as_millis() as u64);
    span.record("outcome", outcome);
    crate::metrics::observe_rpc(operation.name(), outcome, latency);

    result.map(Json).map_err(error_response)
}

fn caller_deadline(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCode::AlreadyExists => StatusCode::CONFLICT,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: ServiceError) -> ApiError {
    let code = err.code();
    let message = err.to_string();
    let details = match err {
        ServiceError::InvalidArgument { report, .. } => report.into_field_violations(),
        _ => Vec::new(),
    };

    (
        status_for(code),
        Json(ErrorResponse {
            code,
            message,
            details,
        }),
    )
}

pub(crate) fn json_error(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code,
            message: message.into(),
            details: Vec::new(),
        }),
    )
}
