//! Race calendar endpoints.
//!
//! - GET /api/v1/races/next: upcoming weekend from the poller snapshot
//! - GET /api/v1/schedule?season=

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::helpers::validate_season;
use crate::services::ergast::ErgastClient;
use crate::services::poller::SharedScheduleState;
use crate::services::session::{candidate_sessions, RaceWeekend};

#[derive(Debug, Deserialize, IntoParams)]
pub struct SeasonQuery {
    /// "current" (default) or a four-digit year
    pub season: Option<String>,
}

impl SeasonQuery {
    /// The requested season, "current" when omitted.
    pub fn season(&self) -> Result<&str, AppError> {
        validate_season(self.season.as_deref().unwrap_or("current"))
    }
}

/// One timed session of a race weekend.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionEntry {
    /// Session code, e.g. "FP1"
    pub code: String,
    /// Human-readable name, e.g. "Free Practice 1"
    pub name: String,
    /// Start in RFC 3339 (UTC)
    pub start_time: String,
}

/// Race weekend summary with its session timetable.
#[derive(Debug, Serialize, ToSchema)]
pub struct RaceWeekendResponse {
    pub season: String,
    pub round: String,
    pub race_name: String,
    pub circuit_name: String,
    pub locality: Option<String>,
    pub country: Option<String>,
    /// Race start in RFC 3339 (14:00 UTC when the feed omits the time)
    pub race_start: String,
    /// FP1, FP2, FP3, Qualifying and Race, in weekend order, when timed
    pub sessions: Vec<SessionEntry>,
    /// Sprint start, when the weekend has one
    pub sprint_start: Option<String>,
}

impl From<&RaceWeekend> for RaceWeekendResponse {
    fn from(w: &RaceWeekend) -> Self {
        Self {
            season: w.season.clone(),
            round: w.round.clone(),
            race_name: w.race_name.clone(),
            circuit_name: w.circuit_name.clone(),
            locality: w.locality.clone(),
            country: w.country.clone(),
            race_start: w.race_start().to_rfc3339(),
            sessions: candidate_sessions(w)
                .into_iter()
                .map(|s| SessionEntry {
                    code: s.kind.code().to_string(),
                    name: s.kind.display_name(),
                    start_time: s.start.to_rfc3339(),
                })
                .collect(),
            sprint_start: w
                .sprint
                .and_then(|s| s.start())
                .map(|t| t.to_rfc3339()),
        }
    }
}

/// Get the upcoming race weekend as last fetched by the schedule poller.
#[utoipa::path(
    get,
    path = "/api/v1/races/next",
    tag = "Races",
    responses(
        (status = 200, description = "Upcoming race weekend", body = RaceWeekendResponse),
        (status = 503, description = "Schedule not loaded yet or season over", body = ErrorResponse),
    )
)]
pub async fn get_next_race(
    State(schedule): State<SharedScheduleState>,
) -> Result<Json<RaceWeekendResponse>, AppError> {
    let s = schedule.read().await;
    let weekend = s
        .next_race
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Schedule not available yet".to_string()))?;
    Ok(Json(RaceWeekendResponse::from(weekend)))
}

/// Get a season's race calendar.
#[utoipa::path(
    get,
    path = "/api/v1/schedule",
    tag = "Races",
    params(SeasonQuery),
    responses(
        (status = 200, description = "Season calendar", body = Vec<RaceWeekendResponse>),
        (status = 400, description = "Invalid season", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_schedule(
    State(client): State<ErgastClient>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<Vec<RaceWeekendResponse>>, AppError> {
    let races = client.schedule(query.season()?).await?;
    let items = races
        .into_iter()
        .filter_map(|race| {
            let label = format!("{} round {}", race.season, race.round);
            match RaceWeekend::try_from(race) {
                Ok(w) => Some(RaceWeekendResponse::from(&w)),
                Err(e) => {
                    tracing::warn!("Skipping malformed calendar entry ({}): {}", label, e);
                    None
                }
            }
        })
        .collect();
    Ok(Json(items))
}
