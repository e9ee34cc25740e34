//! Season analysis endpoints.
//!
//! - GET /api/v1/analysis/drivers/:driver_id?season=
//! - GET /api/v1/analysis/constructors/:constructor_id?season=
//! - GET /api/v1/analysis/head-to-head?season=&top=
//! - GET /api/v1/analysis/points-progression/drivers?season=&top=
//! - GET /api/v1/analysis/points-progression/constructors?season=&top=

use std::future::Future;

use axum::extract::{Path, Query, State};
use axum::Json;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{parse_number, validate_feed_id, validate_season};
use crate::routes::races::SeasonQuery;
use crate::services::ergast::{ConstructorStanding, DriverStanding, ErgastClient, StandingsSnapshot};
use crate::services::results::{
    constructor_race_summaries, dnf_reasons, driver_outcomes, finish_buckets, head_to_head,
    points_distribution, points_progression, position_counts, reliability,
    ConstructorRaceSummary, DriverRaceOutcome, FinishBuckets, HeadToHeadRow, PointsBucket,
    PointsProgression, PositionCount, ReasonCount, Reliability, StandingPoints,
};

/// Drivers compared when `top` is omitted.
const DEFAULT_TOP_DRIVERS: usize = 5;
const MAX_TOP: usize = 30;
/// Standings requests in flight at once while building a progression.
const PROGRESSION_CONCURRENCY: usize = 4;

#[derive(Debug, Deserialize, IntoParams)]
pub struct RankingQuery {
    /// "current" (default) or a four-digit year
    pub season: Option<String>,
    /// How many championship leaders to include
    pub top: Option<usize>,
}

impl RankingQuery {
    pub fn season(&self) -> Result<&str, AppError> {
        validate_season(self.season.as_deref().unwrap_or("current"))
    }

    pub fn top(&self) -> Result<Option<usize>, AppError> {
        match self.top {
            Some(n) if n == 0 || n > MAX_TOP => Err(AppError::BadRequest(format!(
                "top must be between 1 and {}, got {}",
                MAX_TOP, n
            ))),
            top => Ok(top),
        }
    }
}

/// One driver's season, race by race and summarised.
#[derive(Debug, Serialize, ToSchema)]
pub struct DriverAnalysisResponse {
    pub season: String,
    pub driver_id: String,
    pub driver_name: String,
    pub total_points: f64,
    /// Per race: grid, finish, points, places gained and fastest lap
    pub races: Vec<DriverRaceOutcome>,
    pub position_counts: Vec<PositionCount>,
    pub finish_buckets: FinishBuckets,
    pub dnf_reasons: Vec<ReasonCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConstructorAnalysisResponse {
    pub season: String,
    pub constructor_id: String,
    pub constructor_name: String,
    pub total_points: f64,
    pub races: Vec<ConstructorRaceSummary>,
    /// Over every car entry, not every race
    pub reliability: Reliability,
    pub dnf_reasons: Vec<ReasonCount>,
    /// Team points per race, grouped by haul
    pub points_distribution: Vec<PointsBucket>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComparedDriver {
    pub driver_id: String,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HeadToHeadResponse {
    pub season: String,
    /// Championship order; row positions follow this order
    pub drivers: Vec<ComparedDriver>,
    pub races: Vec<HeadToHeadRow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressionResponse {
    pub season: String,
    pub progression: PointsProgression,
}

/// Analyse one driver's season.
#[utoipa::path(
    get,
    path = "/api/v1/analysis/drivers/{driver_id}",
    tag = "Analysis",
    params(
        ("driver_id" = String, Path, description = "Feed driver id, e.g. \"max_verstappen\""),
        SeasonQuery,
    ),
    responses(
        (status = 200, description = "Driver season analysis", body = DriverAnalysisResponse),
        (status = 400, description = "Invalid season or driver id", body = ErrorResponse),
        (status = 404, description = "No results for this driver and season", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_driver_analysis(
    State(client): State<ErgastClient>,
    Path(driver_id): Path<String>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<DriverAnalysisResponse>, AppError> {
    let season = query.season()?;
    let driver_id = validate_feed_id(&driver_id)?;
    let races = client.driver_season_results(season, driver_id).await?;

    let driver_name = races
        .iter()
        .flat_map(|race| race.results.iter())
        .find(|r| r.driver.driver_id == driver_id)
        .map(|r| format!("{} {}", r.driver.given_name, r.driver.family_name))
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No results for driver {} in season {}",
                driver_id, season
            ))
        })?;

    let outcomes = driver_outcomes(&races, driver_id);
    Ok(Json(DriverAnalysisResponse {
        season: season.to_string(),
        driver_id: driver_id.to_string(),
        driver_name,
        total_points: outcomes.iter().map(|o| o.points).sum(),
        position_counts: position_counts(&outcomes),
        finish_buckets: finish_buckets(&outcomes),
        dnf_reasons: dnf_reasons(outcomes.iter().map(|o| o.status.as_str())),
        races: outcomes,
    }))
}

/// Analyse one constructor's season across all of its cars.
#[utoipa::path(
    get,
    path = "/api/v1/analysis/constructors/{constructor_id}",
    tag = "Analysis",
    params(
        ("constructor_id" = String, Path, description = "Feed constructor id, e.g. \"red_bull\""),
        SeasonQuery,
    ),
    responses(
        (status = 200, description = "Constructor season analysis", body = ConstructorAnalysisResponse),
        (status = 400, description = "Invalid season or constructor id", body = ErrorResponse),
        (status = 404, description = "No results for this constructor and season", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_constructor_analysis(
    State(client): State<ErgastClient>,
    Path(constructor_id): Path<String>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<ConstructorAnalysisResponse>, AppError> {
    let season = query.season()?;
    let constructor_id = validate_feed_id(&constructor_id)?;
    let races = client
        .constructor_season_results(season, constructor_id)
        .await?;

    let constructor_name = races
        .iter()
        .flat_map(|race| race.results.iter())
        .map(|r| r.constructor.name.clone())
        .next()
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No results for constructor {} in season {}",
                constructor_id, season
            ))
        })?;

    let statuses = || {
        races
            .iter()
            .flat_map(|race| race.results.iter().map(|r| r.status.as_str()))
    };
    let summaries = constructor_race_summaries(&races);
    Ok(Json(ConstructorAnalysisResponse {
        season: season.to_string(),
        constructor_id: constructor_id.to_string(),
        constructor_name,
        total_points: summaries.iter().map(|s| s.points).sum(),
        reliability: reliability(statuses()),
        dnf_reasons: dnf_reasons(statuses()),
        points_distribution: points_distribution(summaries.iter().map(|s| s.points)),
        races: summaries,
    }))
}

/// Compare the finishing positions of the championship leaders race by race.
#[utoipa::path(
    get,
    path = "/api/v1/analysis/head-to-head",
    tag = "Analysis",
    params(RankingQuery),
    responses(
        (status = 200, description = "Positions of the top drivers per race", body = HeadToHeadResponse),
        (status = 400, description = "Invalid season or top", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_head_to_head(
    State(client): State<ErgastClient>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<HeadToHeadResponse>, AppError> {
    let season = query.season()?;
    let top = query.top()?.unwrap_or(DEFAULT_TOP_DRIVERS);
    let mut leaders = client.driver_standings(season).await?;
    leaders.truncate(top);

    let seasons = futures::future::try_join_all(
        leaders
            .iter()
            .map(|s| client.driver_season_results(season, &s.driver.driver_id)),
    )
    .await?;
    let per_driver: Vec<(String, _)> = leaders
        .iter()
        .map(|s| s.driver.driver_id.clone())
        .zip(seasons)
        .collect();

    Ok(Json(HeadToHeadResponse {
        season: season.to_string(),
        races: head_to_head(&per_driver),
        drivers: leaders
            .into_iter()
            .map(|s| ComparedDriver {
                name: format!("{} {}", s.driver.given_name, s.driver.family_name),
                driver_id: s.driver.driver_id,
            })
            .collect(),
    }))
}

/// Cumulative points of the leading drivers after each round.
#[utoipa::path(
    get,
    path = "/api/v1/analysis/points-progression/drivers",
    tag = "Analysis",
    params(RankingQuery),
    responses(
        (status = 200, description = "Driver points per round", body = ProgressionResponse),
        (status = 400, description = "Invalid season or top", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_driver_points_progression(
    State(client): State<ErgastClient>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<ProgressionResponse>, AppError> {
    let season = query.season()?;
    let top = query.top()?.unwrap_or(DEFAULT_TOP_DRIVERS);
    let latest = client.driver_standings_after(season, None).await?;
    let per_round = standings_by_round(latest, |round| {
        client.driver_standings_after(season, Some(round))
    })
    .await?;

    Ok(Json(progression_response(season, top, per_round, driver_points)))
}

/// Cumulative points of the constructors after each round; all teams unless `top` is given.
#[utoipa::path(
    get,
    path = "/api/v1/analysis/points-progression/constructors",
    tag = "Analysis",
    params(RankingQuery),
    responses(
        (status = 200, description = "Constructor points per round", body = ProgressionResponse),
        (status = 400, description = "Invalid season or top", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_constructor_points_progression(
    State(client): State<ErgastClient>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<ProgressionResponse>, AppError> {
    let season = query.season()?;
    let top = query.top()?.unwrap_or(usize::MAX);
    let latest = client.constructor_standings_after(season, None).await?;
    let per_round = standings_by_round(latest, |round| {
        client.constructor_standings_after(season, Some(round))
    })
    .await?;

    Ok(Json(progression_response(
        season,
        top,
        per_round,
        constructor_points,
    )))
}

/// Standings after every round up to `latest`, oldest first.
///
/// Earlier rounds are fetched with `fetch`; the latest table is reused.
async fn standings_by_round<T, F, Fut>(
    latest: StandingsSnapshot<T>,
    fetch: F,
) -> Result<Vec<(u32, Vec<T>)>, AppError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<StandingsSnapshot<T>, AppError>>,
{
    let Some(last) = latest.round else {
        return Ok(Vec::new());
    };
    tracing::debug!("Fetching standings for rounds 1 to {}", last);

    let mut tables: Vec<(u32, Vec<T>)> = stream::iter(1..last)
        .map(|round| {
            let snapshot = fetch(round);
            async move { snapshot.await.map(|s| (round, s.entries)) }
        })
        .buffered(PROGRESSION_CONCURRENCY)
        .try_collect()
        .await?;
    tables.push((last, latest.entries));
    Ok(tables)
}

fn progression_response<T>(
    season: &str,
    top: usize,
    per_round: Vec<(u32, Vec<T>)>,
    points: fn(&T) -> StandingPoints,
) -> ProgressionResponse {
    let per_round: Vec<(u32, Vec<StandingPoints>)> = per_round
        .into_iter()
        .map(|(round, table)| (round, table.iter().map(points).collect()))
        .collect();
    let tracked: Vec<StandingPoints> = per_round
        .last()
        .map(|(_, table)| table.iter().take(top).cloned().collect())
        .unwrap_or_default();

    ProgressionResponse {
        season: season.to_string(),
        progression: points_progression(&tracked, &per_round),
    }
}

fn driver_points(s: &DriverStanding) -> StandingPoints {
    StandingPoints {
        id: s.driver.driver_id.clone(),
        name: format!("{} {}", s.driver.given_name, s.driver.family_name),
        points: parse_number(&s.points),
    }
}

fn constructor_points(s: &ConstructorStanding) -> StandingPoints {
    StandingPoints {
        id: s.constructor.constructor_id.clone(),
        name: s.constructor.name.clone(),
        points: parse_number(&s.points),
    }
}
