//! Health check endpoints for probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;
#[cfg(feature = "prometheus")]
use crate::observability::metrics::get_prometheus_handle;

/// Detailed health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: &'static str,
    /// Service version
    pub version: String,
    /// Individual subsystem statuses
    pub subsystems: SubsystemStatus,
}

/// Status of individual subsystems.
#[derive(Debug, Serialize)]
pub struct SubsystemStatus {
    /// Database connection status. Absent when no database is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ComponentStatus>,
    pub snapshot: SnapshotStatus,
}

/// Status of a single component.
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    /// Whether the component is healthy
    pub healthy: bool,
    /// Optional message with details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Latency of the health check in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Whether the fallback snapshot can be read and parsed.
#[derive(Debug, Serialize)]
pub struct SnapshotStatus {
    pub available: bool,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

async fn check_database(state: &AppState) -> Option<ComponentStatus> {
    let db = state.db.as_ref()?;
    let start = std::time::Instant::now();
    let result = db.health_check().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    if let Err(e) = &result {
        tracing::warn!(error = %e, "Database health check failed");
    }

    Some(ComponentStatus {
        healthy: result.is_ok(),
        message: result
            .is_err()
            .then(|| "Database connection failed".to_string()),
        latency_ms: Some(latency_ms),
    })
}

async fn check_snapshot(state: &AppState) -> SnapshotStatus {
    let store = state.reports.snapshot_store();
    let snapshot = store.load().await;
    SnapshotStatus {
        available: snapshot.is_some(),
        path: store.path().display().to_string(),
        generated_at: snapshot.and_then(|s| s.generated_at().map(str::to_string)),
    }
}

/// Full health check with subsystem status.
///
/// A failing database with a readable snapshot is `degraded` (reports are
/// still served). With neither source available the service is `unhealthy`
/// and answers 503.
#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = check_database(&state).await;
    let snapshot = check_snapshot(&state).await;

    let status = match (database.as_ref().map(|d| d.healthy), snapshot.available) {
        (Some(true), _) | (None, true) => "healthy",
        (Some(false), true) => "degraded",
        (_, false) => "unhealthy",
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let health = HealthStatus {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        subsystems: SubsystemStatus { database, snapshot },
    };

    (status_code, Json(health))
}

/// Liveness probe. Always 200 while the process is serving.
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe.
///
/// Returns 200 if at least one data source (database or snapshot) can serve
/// reports.
#[tracing::instrument(name = "health.readiness", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(db) = &state.db
        && db.health_check().await.is_ok()
    {
        return StatusCode::OK;
    }

    if state.reports.snapshot_store().load().await.is_some() {
        return StatusCode::OK;
    }

    StatusCode::SERVICE_UNAVAILABLE
}

/// Prometheus metrics endpoint.
///
/// Returns metrics in Prometheus text format.
#[tracing::instrument(name = "health.metrics")]
pub async fn metrics() -> impl IntoResponse {
    #[cfg(feature = "prometheus")]
    {
        return match get_prometheus_handle() {
            Some(handle) => {
                let metrics: String = handle.render();
                (
                    StatusCode::OK,
                    [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                    metrics,
                )
            }
            None => (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            ),
        };
    }
    #[cfg(not(feature = "prometheus"))]
    (
        StatusCode::NOT_FOUND,
        [("content-type", "text/plain")],
        "Prometheus metrics not enabled".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{SNAPSHOT, TestDb, get_json, get_raw, test_app};

    // ============================================================================
    // Health Check Tests (/health)
    // ============================================================================

    #[tokio::test]
    async fn test_health_snapshot_only_healthy() {
        let t = test_app(TestDb::None, Some(SNAPSHOT)).await;

        let (status, body) = get_json(&t.app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["subsystems"]["database"].is_null());
        assert_eq!(body["subsystems"]["snapshot"]["available"], true);
        assert_eq!(
            body["subsystems"]["snapshot"]["generated_at"],
            "2024-03-01T00:00:00Z"
        );
    }

    #[tokio::test]
    async fn test_health_no_sources_unhealthy() {
        let t = test_app(TestDb::None, None).await;

        let (status, body) = get_json(&t.app, "/health").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["subsystems"]["snapshot"]["available"], false);
    }

    #[tokio::test]
    async fn test_health_returns_version() {
        let t = test_app(TestDb::None, Some(SNAPSHOT)).await;

        let (_, body) = get_json(&t.app, "/health").await;

        let version = body["version"].as_str().unwrap();
        assert!(version.contains('.'));
    }

    #[tokio::test]
    async fn test_health_malformed_snapshot_unavailable() {
        let t = test_app(TestDb::None, Some("{ not json")).await;

        let (status, body) = get_json(&t.app, "/health").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["subsystems"]["snapshot"]["available"], false);
    }

    #[cfg(feature = "database-sqlite")]
    #[tokio::test]
    async fn test_health_with_db_healthy() {
        let t = test_app(TestDb::Sqlite { migrate: true }, None).await;

        let (status, body) = get_json(&t.app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["subsystems"]["database"]["healthy"], true);
        assert!(body["subsystems"]["database"]["latency_ms"].is_number());
    }

    #[cfg(feature = "database-sqlite")]
    #[tokio::test]
    async fn test_health_db_down_with_snapshot_degraded() {
        let t = test_app(TestDb::Sqlite { migrate: true }, Some(SNAPSHOT)).await;
        if let Some(db) = &t.state.db {
            db.close().await;
        }

        let (status, body) = get_json(&t.app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["subsystems"]["database"]["healthy"], false);
    }

    // ============================================================================
    // Liveness / Readiness
    // ============================================================================

    #[tokio::test]
    async fn test_liveness_always_ok() {
        let t = test_app(TestDb::None, None).await;
        let (status, _) = get_raw(&t.app, "/health/live").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_snapshot_only() {
        let t = test_app(TestDb::None, Some(SNAPSHOT)).await;
        let (status, _) = get_raw(&t.app, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_no_sources() {
        let t = test_app(TestDb::None, None).await;
        let (status, _) = get_raw(&t.app, "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[cfg(feature = "database-sqlite")]
    #[tokio::test]
    async fn test_readiness_with_db() {
        let t = test_app(TestDb::Sqlite { migrate: true }, None).await;
        let (status, _) = get_raw(&t.app, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    // ============================================================================
    // Metrics (/metrics)
    // ============================================================================

    #[cfg(not(feature = "prometheus"))]
    #[tokio::test]
    async fn test_metrics_disabled_without_feature() {
        let t = test_app(TestDb::None, None).await;
        let (status, body) = get_raw(&t.app, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("not enabled"));
    }
}
