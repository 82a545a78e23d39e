/// Health check endpoint
///
/// Reports whether the server is up and the database answers.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active_connections": 1, "idle_connections": 4, "total_connections": 5 }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use cyclectl_shared::db::pool::{get_pool_stats, health_check as probe_database};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,

    pub version: String,

    /// "connected" or "disconnected"
    pub database: String,

    pub pool: PoolReport,
}

/// Connection pool usage at the time of the probe
#[derive(Debug, Serialize, Deserialize)]
pub struct PoolReport {
    pub active_connections: usize,
    pub idle_connections: usize,
    pub total_connections: usize,
}

/// Health check handler
///
/// Always answers 200; a failed database probe shows up as
/// `"status": "degraded"`.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_status = match probe_database(&state.db).await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Database health probe failed");
            "disconnected"
        }
    };

    let stats = get_pool_stats(&state.db);

    Ok(Json(HealthResponse {
        status: if database_status == "connected" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database_status.to_string(),
        pool: PoolReport {
            active_connections: stats.active_connections,
            idle_connections: stats.idle_connections,
            total_connections: stats.total_connections,
        },
    }))
}
