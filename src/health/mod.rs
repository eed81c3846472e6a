/*!
 * # Health Check Module
 *
 * - `/api/health` reports database reachability, version and uptime
 * - `/api/health/live` answers as long as the process serves requests
 * - `/api/health/ready` fails with 503 while the database is unreachable
 */

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthDetail {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub environment: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: HashMap<String, HealthDetail>,
}

fn status_code(status: &HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn probe(state: &AppState) -> HealthInfo {
    let database = match crate::db::check_connection(&state.db).await {
        Ok(elapsed) => HealthDetail {
            status: HealthStatus::Up,
            latency_ms: Some(elapsed.as_millis() as u64),
            message: None,
        },
        Err(e) => {
            warn!(error = %e, "Database health probe failed");
            HealthDetail {
                status: HealthStatus::Down,
                latency_ms: None,
                message: Some("database unreachable".to_string()),
            }
        }
    };

    let status = database.status.clone();
    let mut details = HashMap::new();
    details.insert("database".to_string(), database);

    HealthInfo {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        timestamp: Utc::now(),
        uptime_seconds: uptime(state.started_at),
        details,
    }
}

fn uptime(started_at: Instant) -> u64 {
    started_at.elapsed().as_secs()
}

/// Service and database health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthInfo),
        (status = 503, description = "Database unreachable", body = HealthInfo),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthInfo>) {
    debug!("Health check endpoint called");
    let health = probe(&state).await;
    (status_code(&health.status), Json(health))
}

pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let health = probe(&state).await;
    (
        status_code(&health.status),
        Json(serde_json::json!({
            "ready": health.status == HealthStatus::Up,
            "timestamp": health.timestamp,
        })),
    )
}

pub async fn liveness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "alive": true,
        "uptime_seconds": uptime(state.started_at),
        "timestamp": Utc::now(),
    }))
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}
