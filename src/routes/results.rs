//! Race result endpoints.
//!
//! - GET /api/v1/results/last
//! - GET /api/v1/results/:season/:round
//! - GET /api/v1/results/:season/:round/laps/:lap

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{
    parse_number, parse_position, validate_lap, validate_round, validate_season,
};
use crate::services::assets::find_driver;
use crate::services::ergast::{ErgastClient, Lap, Race, RaceResult};
use crate::services::results::{position_changes, PositionChange};

/// One classified (or retired) driver.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResultEntry {
    pub position: u32,
    pub grid: u32,
    pub points: f64,
    pub status: String,
    pub laps: Option<u32>,
    pub driver_id: String,
    pub driver_name: String,
    pub constructor: String,
    /// Race time or gap, e.g. "1:40:52.571" or "+5.430"
    pub time: Option<String>,
    pub fastest_lap_rank: Option<u32>,
    /// Lap number the fastest lap was set on
    pub fastest_lap_number: Option<u32>,
    pub fastest_lap_time: Option<String>,
    /// Average speed on the fastest lap
    pub fastest_lap_speed: Option<f64>,
    /// Unit of `fastest_lap_speed`, normally "kph"
    pub fastest_lap_speed_units: Option<String>,
    pub image_file: Option<String>,
}

impl From<&RaceResult> for ResultEntry {
    fn from(r: &RaceResult) -> Self {
        let fastest = r.fastest_lap.as_ref();
        Self {
            position: parse_position(&r.position),
            grid: parse_position(&r.grid),
            points: parse_number(&r.points),
            status: r.status.clone(),
            laps: r.laps.as_deref().map(parse_position),
            driver_id: r.driver.driver_id.clone(),
            driver_name: format!("{} {}", r.driver.given_name, r.driver.family_name),
            constructor: r.constructor.name.clone(),
            time: r.time.as_ref().map(|t| t.time.clone()),
            fastest_lap_rank: fastest.and_then(|f| f.rank.as_deref()).map(parse_position),
            fastest_lap_number: fastest.and_then(|f| f.lap.as_deref()).map(parse_position),
            fastest_lap_time: fastest
                .and_then(|f| f.time.as_ref())
                .map(|t| t.time.clone()),
            fastest_lap_speed: fastest
                .and_then(|f| f.average_speed.as_ref())
                .map(|s| parse_number(&s.speed)),
            fastest_lap_speed_units: fastest
                .and_then(|f| f.average_speed.as_ref())
                .map(|s| s.units.clone()),
            image_file: find_driver(&r.driver.driver_id).map(|a| a.image_file.to_string()),
        }
    }
}

/// Results of one race plus grid-to-finish movement.
#[derive(Debug, Serialize, ToSchema)]
pub struct RaceResultsResponse {
    pub season: String,
    pub round: String,
    pub race_name: String,
    pub circuit_id: String,
    pub circuit_name: String,
    pub date: String,
    pub results: Vec<ResultEntry>,
    pub position_changes: Vec<PositionChange>,
}

impl From<Race> for RaceResultsResponse {
    fn from(race: Race) -> Self {
        Self {
            results: race.results.iter().map(ResultEntry::from).collect(),
            position_changes: position_changes(&race.results),
            season: race.season,
            round: race.round,
            race_name: race.race_name,
            circuit_id: race.circuit.circuit_id,
            circuit_name: race.circuit.circuit_name,
            date: race.date,
        }
    }
}

/// One driver's place and time on a lap.
#[derive(Debug, Serialize, ToSchema)]
pub struct LapTimingEntry {
    pub position: u32,
    pub driver_id: String,
    /// e.g. "1:36.236"
    pub time: String,
}

/// Running order at the end of one lap.
#[derive(Debug, Serialize, ToSchema)]
pub struct LapResponse {
    pub season: String,
    pub round: u32,
    pub lap: u32,
    /// Sorted by position
    pub timings: Vec<LapTimingEntry>,
}

impl LapResponse {
    fn new(season: &str, round: u32, lap: Lap) -> Self {
        let mut timings: Vec<LapTimingEntry> = lap
            .timings
            .into_iter()
            .map(|t| LapTimingEntry {
                position: parse_position(&t.position),
                driver_id: t.driver_id,
                time: t.time,
            })
            .collect();
        timings.sort_by_key(|t| t.position);
        Self {
            season: season.to_string(),
            round,
            lap: parse_position(&lap.number),
            timings,
        }
    }
}

/// Get the results of the most recent race.
#[utoipa::path(
    get,
    path = "/api/v1/results/last",
    tag = "Results",
    responses(
        (status = 200, description = "Last race results", body = RaceResultsResponse),
        (status = 404, description = "No race run yet this season", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_last_results(
    State(client): State<ErgastClient>,
) -> Result<Json<RaceResultsResponse>, AppError> {
    let race = client
        .last_race_results()
        .await?
        .ok_or_else(|| AppError::NotFound("No race results this season yet".to_string()))?;
    Ok(Json(race.into()))
}

/// Get the results of one round.
#[utoipa::path(
    get,
    path = "/api/v1/results/{season}/{round}",
    tag = "Results",
    params(
        ("season" = String, Path, description = "\"current\" or a four-digit year"),
        ("round" = String, Path, description = "Round number, starting at 1"),
    ),
    responses(
        (status = 200, description = "Race results", body = RaceResultsResponse),
        (status = 400, description = "Invalid season or round", body = ErrorResponse),
        (status = 404, description = "Round not found or not run yet", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_round_results(
    State(client): State<ErgastClient>,
    Path((season, round)): Path<(String, String)>,
) -> Result<Json<RaceResultsResponse>, AppError> {
    let season = validate_season(&season)?;
    let round = validate_round(&round)?;
    let race = client
        .race_results(season, round)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No results for season {} round {}", season, round))
        })?;
    Ok(Json(race.into()))
}

/// Get lap times and running order for one lap of a race.
#[utoipa::path(
    get,
    path = "/api/v1/results/{season}/{round}/laps/{lap}",
    tag = "Results",
    params(
        ("season" = String, Path, description = "\"current\" or a four-digit year"),
        ("round" = String, Path, description = "Round number, starting at 1"),
        ("lap" = String, Path, description = "Lap number, starting at 1"),
    ),
    responses(
        (status = 200, description = "Lap timings", body = LapResponse),
        (status = 400, description = "Invalid season, round or lap", body = ErrorResponse),
        (status = 404, description = "Lap not run or no lap data", body = ErrorResponse),
        (status = 502, description = "F1 API unavailable", body = ErrorResponse),
    )
)]
pub async fn get_lap_timings(
    State(client): State<ErgastClient>,
    Path((season, round, lap)): Path<(String, String, String)>,
) -> Result<Json<LapResponse>, AppError> {
    let season = validate_season(&season)?;
    let round = validate_round(&round)?;
    let lap_number = validate_lap(&lap)?;
    let lap = client
        .lap_timings(season, round, lap_number)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No lap {} timings for season {} round {}",
                lap_number, season, round
            ))
        })?;
    Ok(Json(LapResponse::new(season, round, lap)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ergast::{
        AverageSpeed, Circuit, Constructor, Driver, FastestLap, LapTiming, ResultTime,
    };
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn race_with_results() -> Race {
        let result = |driver_id: &str, position: &str, grid: &str| RaceResult {
            position: position.to_string(),
            grid: grid.to_string(),
            points: "25".to_string(),
            status: "Finished".to_string(),
            laps: Some("57".to_string()),
            driver: Driver {
                driver_id: driver_id.to_string(),
                given_name: "Max".to_string(),
                family_name: "Verstappen".to_string(),
                nationality: None,
                code: None,
                permanent_number: None,
            },
            constructor: Constructor {
                constructor_id: "red_bull".to_string(),
                name: "Red Bull".to_string(),
                nationality: None,
            },
            time: Some(ResultTime {
                time: "1:31:44.742".to_string(),
            }),
            fastest_lap: Some(FastestLap {
                rank: Some("1".to_string()),
                lap: Some("44".to_string()),
                time: Some(ResultTime {
                    time: "1:32.608".to_string(),
                }),
                average_speed: Some(AverageSpeed {
                    units: "kph".to_string(),
                    speed: "210.383".to_string(),
                }),
            }),
        };

        Race {
            season: "2026".to_string(),
            round: "1".to_string(),
            race_name: "Bahrain Grand Prix".to_string(),
            circuit: Circuit {
                circuit_id: "bahrain".to_string(),
                circuit_name: "Bahrain International Circuit".to_string(),
                location: None,
            },
            date: "2026-03-01".to_string(),
            time: Some("15:00:00Z".to_string()),
            first_practice: None,
            second_practice: None,
            third_practice: None,
            qualifying: None,
            sprint: None,
            results: vec![
                result("max_verstappen", "1", "4"),
                result("hamilton", "2", "1"),
            ],
        }
    }

    #[test]
    fn test_results_response() {
        let resp = RaceResultsResponse::from(race_with_results());
        assert_eq!(resp.race_name, "Bahrain Grand Prix");
        assert_eq!(resp.circuit_id, "bahrain");
        assert_eq!(resp.results.len(), 2);

        let winner = &resp.results[0];
        assert_eq!(winner.position, 1);
        assert_eq!(winner.grid, 4);
        assert_eq!(winner.points, 25.0);
        assert_eq!(winner.fastest_lap_rank, Some(1));
        assert_eq!(winner.fastest_lap_time.as_deref(), Some("1:32.608"));
        assert_eq!(winner.fastest_lap_number, Some(44));
        assert_eq!(winner.fastest_lap_speed, Some(210.383));
        assert_eq!(winner.fastest_lap_speed_units.as_deref(), Some("kph"));
        assert_eq!(winner.laps, Some(57));
        assert_eq!(winner.image_file.as_deref(), Some("verstappen.avif"));

        assert_eq!(resp.position_changes[0].change, 3);
        assert_eq!(resp.position_changes[1].change, -1);
    }

    #[test]
    fn test_lap_response_sorted_by_position() {
        let timing = |driver_id: &str, position: &str, time: &str| LapTiming {
            driver_id: driver_id.to_string(),
            position: position.to_string(),
            time: time.to_string(),
        };
        let resp = LapResponse::new(
            "2026",
            18,
            Lap {
                number: "12".to_string(),
                timings: vec![
                    timing("norris", "10", "1:36.900"),
                    timing("russell", "1", "1:35.512"),
                    timing("piastri", "2", "1:35.870"),
                ],
            },
        );
        assert_eq!(resp.lap, 12);
        let order: Vec<&str> = resp.timings.iter().map(|t| t.driver_id.as_str()).collect();
        assert_eq!(order, vec!["russell", "piastri", "norris"]);
        assert_eq!(resp.timings[0].time, "1:35.512");
    }

    #[tokio::test]
    async fn test_get_lap_timings_not_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2026/18/laps/80.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MRData": { "RaceTable": { "Races": [] } }
            })))
            .mount(&server)
            .await;

        let client = ErgastClient::new(&server.uri(), "test-agent");
        let err = assert_err!(
            get_lap_timings(
                State(client),
                Path(("2026".to_string(), "18".to_string(), "80".to_string())),
            )
            .await
        );
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_lap_timings_rejects_lap_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ErgastClient::new(&server.uri(), "test-agent");
        let err = assert_err!(
            get_lap_timings(
                State(client),
                Path(("2026".to_string(), "18".to_string(), "0".to_string())),
            )
            .await
        );
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_get_lap_timings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/current/3/laps/1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "MRData": { "RaceTable": { "Races": [{
                    "Laps": [{
                        "number": "1",
                        "Timings": [
                            { "driverId": "norris", "position": "2", "time": "1:40.100" },
                            { "driverId": "piastri", "position": "1", "time": "1:39.800" }
                        ]
                    }]
                }] } }
            })))
            .mount(&server)
            .await;

        let client = ErgastClient::new(&server.uri(), "test-agent");
        let Json(resp) = assert_ok!(
            get_lap_timings(
                State(client),
                Path(("current".to_string(), "3".to_string(), "1".to_string())),
            )
            .await
        );
        assert_eq!(resp.season, "current");
        assert_eq!(resp.round, 3);
        assert_eq!(resp.timings[0].driver_id, "piastri");
    }
}
