//! Championship standings endpoints.
//!
//! - GET /api/v1/standings?season=: drivers and constructors together
//! - GET /api/v1/standings/drivers?season=
//! - GET /api/v1/standings/constructors?season=

use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{parse_number, parse_position};
use crate::routes::races::SeasonQuery;
use crate::services::assets::{constructor_for, find_driver};
use crate::services::ergast::{ConstructorStanding, DriverStanding, ErgastClient};

#[derive(Debug, Serialize, ToSchema)]
pub struct DriverStandingResponse {
    /// Championship position; absent for excluded drivers
    pub position: Option<u32>,
    pub position_text: String,
    pub points: f64,
    pub wins: u32,
    pub driver_id: String,
    pub name: String,
    pub code: Option<String>,
    /// Car number
    pub permanent_number: Option<String>,
    pub nationality: Option<String>,
    /// Constructors driven for this season, in feed order
    pub constructors: Vec<String>,
    /// Portrait file name when the dashboard ships one
    pub image_file: Option<String>,
}

impl From<DriverStanding> for DriverStandingResponse {
    fn from(s: DriverStanding) -> Self {
        let image_file = find_driver(&s.driver.driver_id).map(|a| a.image_file.to_string());
        Self {
            position: s.position.as_deref().map(parse_position),
            position_text: s.position_text,
            points: parse_number(&s.points),
            wins: parse_position(&s.wins),
            name: format!("{} {}", s.driver.given_name, s.driver.family_name),
            driver_id: s.driver.driver_id,
            code: s.driver.code,
            permanent_number: s.driver.permanent_number,
            nationality: s.driver.nationality,
            constructors: s.constructors.into_iter().map(|c| c.name).collect(),
            image_file,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConstructorStandingResponse {
    pub position: Option<u32>,
    pub position_text: String,
    pub points: f64,
    pub wins: u32,
    pub constructor_id: String,
    pub name: String,
    pub nationality: Option<String>,
    pub logo_file: Option<String>,
    pub car_design_file: Option<String>,
}

impl From<ConstructorStanding> for ConstructorStandingResponse {
    fn from(s: ConstructorStanding) -> Self {
        let asset = constructor_for(&s.constructor.constructor_id, &s.constructor.name);
        Self {
            position: s.position.as_deref().map(parse_position),
            position_text: s.position_text,
            points: parse_number(&s.points),
            wins: parse_position(&s.wins),
            constructor_id: s.constructor.constructor_id,
            name: s.constructor.name,
            nationality: s.constructor.nationality,
            logo_file: asset.map(|a| a.logo_file.to_string()),
            car_design_file: asset.map(|a| a.car_design_file.to_string()),
        }
    }
}

/// Both championships for one season.
#[derive(Debug, Serialize, ToSchema)]
pub struct StandingsResponse {
    pub season: String,
    pub drivers: Vec<DriverStandingResponse>,
    pub constructors: Vec<ConstructorStandingResponse>,
}

/// Get driver and constructor standings in one call.
#[utoipa::path(
    get,
    path = "/api/v1/standings",
    tag = "Standings",
    params(SeasonQuery),
    responses(
        (status = 200, description = "Driver and constructor standings", body = StandingsResponse),
        (status = 400, description = "Invalid season", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_standings(
    State(client): State<ErgastClient>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<StandingsResponse>, AppError> {
    let season = query.season()?;
    let (drivers, constructors) = futures::future::try_join(
        client.driver_standings(season),
        client.constructor_standings(season),
    )
    .await?;

    Ok(Json(StandingsResponse {
        season: season.to_string(),
        drivers: drivers.into_iter().map(Into::into).collect(),
        constructors: constructors.into_iter().map(Into::into).collect(),
    }))
}

/// Get driver standings.
#[utoipa::path(
    get,
    path = "/api/v1/standings/drivers",
    tag = "Standings",
    params(SeasonQuery),
    responses(
        (status = 200, description = "Driver standings", body = Vec<DriverStandingResponse>),
        (status = 400, description = "Invalid season", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_driver_standings(
    State(client): State<ErgastClient>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<Vec<DriverStandingResponse>>, AppError> {
    let standings = client.driver_standings(query.season()?).await?;
    Ok(Json(standings.into_iter().map(Into::into).collect()))
}

/// Get constructor standings.
#[utoipa::path(
    get,
    path = "/api/v1/standings/constructors",
    tag = "Standings",
    params(SeasonQuery),
    responses(
        (status = 200, description = "Constructor standings", body = Vec<ConstructorStandingResponse>),
        (status = 400, description = "Invalid season", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_constructor_standings(
    State(client): State<ErgastClient>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<Vec<ConstructorStandingResponse>>, AppError> {
    let standings = client.constructor_standings(query.season()?).await?;
    Ok(Json(standings.into_iter().map(Into::into).collect()))
}
