//! Poller status HTTP endpoint.
//!
//! GET /api/v1/poller/status returns the state of the background schedule
//! poller as JSON.

use axum::extract::State;
use axum::Json;

use crate::services::poller::{PollerStatus, SharedScheduleState};

/// Get the current poller status.
///
/// Reports the refresh period, the last attempt and success, the next
/// scheduled refresh, and running counters of refreshes and failures.
#[utoipa::path(
    get,
    path = "/api/v1/poller/status",
    tag = "Poller",
    responses(
        (status = 200, description = "Current poller status", body = PollerStatus),
    )
)]
pub async fn get_poller_status(State(state): State<SharedScheduleState>) -> Json<PollerStatus> {
    let s = state.read().await;
    Json(s.status.clone())
}
