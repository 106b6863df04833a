use axum::{
    extract::{rejection::QueryRejection, ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analytics::{classify, extract_client_ip, substitute_loopback, GeoResolver};
use crate::config::ClientIpConfig;
use crate::models::{NewVisitor, VisitorRecord, UNKNOWN};
use crate::storage::VisitorStore;

use super::ApiError;

pub struct AppState {
    pub store: Arc<dyn VisitorStore>,
    pub geo: Arc<dyn GeoResolver>,
    pub client_ip: ClientIpConfig,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogVisitQuery {
    pub resolution: Option<String>,
}

/// Record one visit from the calling client
pub async fn log_visit(
    State(state): State<Arc<AppState>>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    query: Result<Query<LogVisitQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    let query = query.map(|Query(q)| q).unwrap_or_else(|rejection| {
        debug!(error = %rejection, "Ignoring malformed log-visit query string");
        LogVisitQuery::default()
    });

    let socket_ip = connect_info.map(|Extension(ConnectInfo(addr))| addr.ip());
    let client_ip = extract_client_ip(&headers, socket_ip, &state.client_ip).map(substitute_loopback);

    let user_agent = headers
        .get(header::USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default();

    // Detached so a client disconnect cannot abandon the lookup or the insert
    let task = tokio::spawn(record_visit(
        Arc::clone(&state),
        client_ip,
        user_agent,
        query.resolution,
    ));

    match task.await {
        Ok(result) => result?,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => return Err(ApiError::Task(e)),
    }

    Ok(Json(SuccessResponse { success: true }))
}

/// Enrich one visit and append it to the store
async fn record_visit(
    state: Arc<AppState>,
    client_ip: Option<IpAddr>,
    user_agent: String,
    resolution: Option<String>,
) -> Result<(), ApiError> {
    let geo = match client_ip {
        Some(ip) => state.geo.resolve(ip).await,
        None => {
            warn!("Could not determine client IP, skipping geolocation");
            None
        }
    };

    let client = classify(&user_agent);

    let ip_address = client_ip.map_or_else(|| UNKNOWN.to_string(), |ip| ip.to_string());
    let visit = NewVisitor::compose(&ip_address, geo.as_ref(), &client, resolution.as_deref());

    state.store.append(&visit).await?;

    info!(
        ip = %visit.ip_address,
        country = %visit.country,
        browser = %visit.browser_name,
        device = %visit.device_type,
        resolver = state.geo.name(),
        "Logged visit"
    );
    Ok(())
}

/// Every logged visit, most recent first
pub async fn get_visitors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VisitorRecord>>, ApiError> {
    let visitors = state.store.list_all().await?;
    debug!(count = visitors.len(), "Listing visitors");
    Ok(Json(visitors))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "OK" })),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}
