use std::time::{Duration, SystemTime};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

const DB_PING_TIMEOUT: Duration = Duration::from_secs(2);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
        .route("/info", get(info))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: String,
    environment: String,
    start_time: String,
    uptime: u64,
}

async fn root(State(state): State<AppState>) -> Response {
    let connected = database_check(&state).await;

    let response = HealthResponse {
        status: if connected { "ok" } else { "degraded" },
        database: if connected { "connected" } else { "disconnected" },
        timestamp: now_iso(),
    };

    let status_code = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    let response = LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    };
    Json(response).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let response = HealthInfoResponse {
        service: "adaptiq-backend",
        version: std::env::var("APP_VERSION")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
        environment: std::env::var("APP_ENV")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "development".to_string()),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
    };
    Json(response).into_response()
}

async fn database_check(state: &AppState) -> bool {
    let Some(proxy) = state.db_proxy() else {
        return false;
    };
    matches!(
        tokio::time::timeout(DB_PING_TIMEOUT, proxy.ping()).await,
        Ok(Ok(()))
    )
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

fn system_time_iso(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}
