use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::RngCore;
use tracing::{info, warn};
use vhost_gateway::{Gateway, VhostUri};

use crate::dto::{AddRequest, AddResponse, HealthResponse, ListHost, ListResponse, RandomRequest};
use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
struct AppState {
    gateway: Gateway,
    domain: Arc<str>,
}

/// Builds the control-plane router. `domain` is the public suffix appended to
/// every `host_prefix` to form the registry key (`<prefix>.<domain>`).
pub fn build_router(gateway: Gateway, domain: impl Into<String>) -> Router {
    let state = AppState {
        gateway,
        domain: Arc::from(domain.into()),
    };

    Router::new()
        .route(
            "/vhost/",
            get(list_vhosts)
                .post(add_vhost)
                .patch(replace_vhost)
                .fallback(unsupported_method),
        )
        .route(
            "/vhost/{name}",
            get(get_vhost).delete(remove_vhost).fallback(unsupported_method),
        )
        .route("/random/", post(random_vhost).fallback(unsupported_method))
        .route("/health/", get(health).fallback(unsupported_method))
        .with_state(state)
}

async fn unsupported_method(method: Method) -> Response {
    warn!(%method, "unsupported method on control-plane route");
    StatusCode::BAD_REQUEST.into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn build_target(req_target: &str) -> ApiResult<VhostUri> {
    if req_target.is_empty() {
        return Err(ApiError::BadRequest("missing target".into()));
    }
    VhostUri::from_str(req_target)
        .map_err(|e| ApiError::BadRequest(format!("invalid target: {e}")))
}

async fn process_add(state: &AppState, host_prefix: &str, target: &str) -> ApiResult<AddResponse> {
    if host_prefix.is_empty() {
        return Err(ApiError::BadRequest("missing host_prefix".into()));
    }
    let uri = build_target(target)?;
    let vhost = format!("{host_prefix}.{}", state.domain);
    state.gateway.add(vhost.clone(), uri).await?;
    info!(vhost = %vhost, "vhost added via control-plane");
    Ok(AddResponse { hostname: vhost })
}

async fn add_vhost(
    State(state): State<AppState>,
    Json(req): Json<AddRequest>,
) -> ApiResult<Json<AddResponse>> {
    process_add(&state, &req.host_prefix, &req.target)
        .await
        .map(Json)
}

async fn replace_vhost(
    State(state): State<AppState>,
    Json(req): Json<AddRequest>,
) -> ApiResult<Json<AddResponse>> {
    if req.host_prefix.is_empty() {
        return Err(ApiError::BadRequest("missing host_prefix".into()));
    }
    let uri = build_target(&req.target)?;
    let vhost = format!("{}.{}", req.host_prefix, state.domain);
    state.gateway.replace(&vhost, uri).await?;
    info!(vhost = %vhost, "vhost replaced via control-plane");
    Ok(Json(AddResponse { hostname: vhost }))
}

async fn list_vhosts(State(state): State<AppState>) -> Json<ListResponse> {
    let hosts = state.gateway.list().await.into_iter().map(ListHost::from).collect();
    Json(ListResponse { hosts })
}

async fn get_vhost(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ListResponse>> {
    let hosts = state.gateway.list().await;
    let matched = hosts.into_iter().find(|h| h.name == name);
    match matched {
        Some(host) => Ok(Json(ListResponse {
            hosts: vec![ListHost::from(host)],
        })),
        None => Err(ApiError::NotFound),
    }
}

async fn remove_vhost(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<StatusCode> {
    if state.gateway.remove(&name).await.is_ok() {
        info!(vhost = %name, "vhost removed via control-plane");
        return Ok(StatusCode::OK);
    }
    let suffixed = format!("{name}.{}", state.domain);
    state.gateway.remove(&suffixed).await.map_err(|_| ApiError::NotFound)?;
    info!(vhost = %suffixed, "vhost removed via control-plane (suffix fallback)");
    Ok(StatusCode::OK)
}

async fn random_vhost(
    State(state): State<AppState>,
    Json(req): Json<RandomRequest>,
) -> ApiResult<Json<AddResponse>> {
    let mut raw = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut raw);
    let prefix: String = raw.iter().map(|b| format!("{b:02x}")).collect();
    process_add(&state, &prefix, &req.target).await.map(Json)
}
