use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::poller::SharedScheduleState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when a schedule snapshot is loaded, "degraded" otherwise)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the poller holds an upcoming race weekend
    pub schedule_loaded: bool,
}

/// Health check endpoint.
///
/// Returns status "degraded" (still 200) while no schedule snapshot is
/// available, so load balancers can distinguish partial failures.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(schedule): State<SharedScheduleState>) -> Json<HealthResponse> {
    let loaded = schedule.read().await.next_race.is_some();

    Json(HealthResponse {
        status: if loaded {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        schedule_loaded: loaded,
    })
}
