//! Jolpica/Ergast F1 API client.
//!
//! Fetches race calendars, standings and results. Every response is wrapped
//! in an `MRData` envelope and every number is a JSON string.
//! See: https://github.com/jolpica/jolpica-f1/blob/main/docs/README.md

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::AppError;
use crate::helpers::{parse_position, validate_feed_id, validate_season};

/// Ergast pages at 30 rows by default; a season never exceeds this.
const PAGE_LIMIT: u32 = 100;
/// Per-request timeout for upstream calls.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client for the Jolpica/Ergast F1 API.
#[derive(Debug, Clone)]
pub struct ErgastClient {
    client: reqwest::Client,
    base_url: String,
}

// --- Ergast JSON response types ---

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MRData")]
    mr_data: T,
}

#[derive(Debug, Deserialize)]
struct RaceTableData {
    #[serde(rename = "RaceTable")]
    race_table: RaceTable,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<Race>,
}

#[derive(Debug, Deserialize)]
struct StandingsData {
    #[serde(rename = "StandingsTable")]
    standings_table: StandingsTable,
}

#[derive(Debug, Deserialize)]
struct StandingsTable {
    #[serde(rename = "StandingsLists", default)]
    standings_lists: Vec<StandingsList>,
}

#[derive(Debug, Deserialize)]
struct StandingsList {
    #[serde(default)]
    round: Option<String>,
    #[serde(rename = "DriverStandings", default)]
    driver_standings: Vec<DriverStanding>,
    #[serde(rename = "ConstructorStandings", default)]
    constructor_standings: Vec<ConstructorStanding>,
}

#[derive(Debug, Deserialize)]
struct LapTableData {
    #[serde(rename = "RaceTable")]
    race_table: LapRaceTable,
}

#[derive(Debug, Deserialize)]
struct LapRaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<LapRace>,
}

#[derive(Debug, Deserialize)]
struct LapRace {
    #[serde(rename = "Laps", default)]
    laps: Vec<Lap>,
}

/// Standings as they stood after one round.
#[derive(Debug, Clone)]
pub struct StandingsSnapshot<T> {
    /// Round the table was computed after; `None` when the feed omits it.
    pub round: Option<u32>,
    pub entries: Vec<T>,
}

impl<T> StandingsSnapshot<T> {
    fn from_list(list: Option<StandingsList>, pick: fn(StandingsList) -> Vec<T>) -> Self {
        match list {
            Some(list) => Self {
                round: list.round.as_deref().map(parse_position).filter(|r| *r > 0),
                entries: pick(list),
            },
            None => Self {
                round: None,
                entries: Vec::new(),
            },
        }
    }
}

/// A race weekend as published by the feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub season: String,
    pub round: String,
    pub race_name: String,
    #[serde(rename = "Circuit")]
    pub circuit: Circuit,
    pub date: String,
    pub time: Option<String>,
    #[serde(rename = "FirstPractice")]
    pub first_practice: Option<FeedSlot>,
    #[serde(rename = "SecondPractice")]
    pub second_practice: Option<FeedSlot>,
    #[serde(rename = "ThirdPractice")]
    pub third_practice: Option<FeedSlot>,
    #[serde(rename = "Qualifying")]
    pub qualifying: Option<FeedSlot>,
    #[serde(rename = "Sprint")]
    pub sprint: Option<FeedSlot>,
    /// Only present on results endpoints.
    #[serde(rename = "Results", default)]
    pub results: Vec<RaceResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub circuit_id: String,
    pub circuit_name: String,
    #[serde(rename = "Location")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub locality: String,
    pub country: String,
}

/// Date plus optional clock time of one session, both as published.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSlot {
    pub date: String,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub driver_id: String,
    pub given_name: String,
    pub family_name: String,
    pub nationality: Option<String>,
    pub code: Option<String>,
    pub permanent_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constructor {
    pub constructor_id: String,
    pub name: String,
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStanding {
    /// Absent for drivers excluded from the classification.
    pub position: Option<String>,
    pub position_text: String,
    pub points: String,
    pub wins: String,
    #[serde(rename = "Driver")]
    pub driver: Driver,
    #[serde(rename = "Constructors", default)]
    pub constructors: Vec<Constructor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorStanding {
    pub position: Option<String>,
    pub position_text: String,
    pub points: String,
    pub wins: String,
    #[serde(rename = "Constructor")]
    pub constructor: Constructor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub position: String,
    pub grid: String,
    pub points: String,
    pub status: String,
    pub laps: Option<String>,
    #[serde(rename = "Driver")]
    pub driver: Driver,
    #[serde(rename = "Constructor")]
    pub constructor: Constructor,
    #[serde(rename = "Time")]
    pub time: Option<ResultTime>,
    #[serde(rename = "FastestLap")]
    pub fastest_lap: Option<FastestLap>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultTime {
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FastestLap {
    pub rank: Option<String>,
    pub lap: Option<String>,
    #[serde(rename = "Time")]
    pub time: Option<ResultTime>,
    #[serde(rename = "AverageSpeed")]
    pub average_speed: Option<AverageSpeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AverageSpeed {
    pub units: String,
    pub speed: String,
}

/// Running order at the end of one lap.
#[derive(Debug, Clone, Deserialize)]
pub struct Lap {
    pub number: String,
    #[serde(rename = "Timings", default)]
    pub timings: Vec<LapTiming>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapTiming {
    pub driver_id: String,
    pub position: String,
    /// Lap time, e.g. "1:36.236"
    pub time: String,
}

impl ErgastClient {
    pub fn new(base_url: &str, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The upcoming race weekend, or `None` once the season is over.
    pub async fn next_race(&self) -> Result<Option<Race>, AppError> {
        let data: Envelope<RaceTableData> = self.get_json("current/next.json").await?;
        Ok(data.mr_data.race_table.races.into_iter().next())
    }

    /// The full calendar of a season.
    pub async fn schedule(&self, season: &str) -> Result<Vec<Race>, AppError> {
        let season = validate_season(season)?;
        let path = format!("{}.json?limit={}", season, PAGE_LIMIT);
        let data: Envelope<RaceTableData> = self.get_json(&path).await?;
        Ok(data.mr_data.race_table.races)
    }

    /// Driver standings after the latest round of a season.
    pub async fn driver_standings(&self, season: &str) -> Result<Vec<DriverStanding>, AppError> {
        Ok(self.driver_standings_after(season, None).await?.entries)
    }

    /// Constructor standings after the latest round of a season.
    pub async fn constructor_standings(
        &self,
        season: &str,
    ) -> Result<Vec<ConstructorStanding>, AppError> {
        Ok(self.constructor_standings_after(season, None).await?.entries)
    }

    /// Driver standings after `round`, or after the latest round when `None`.
    pub async fn driver_standings_after(
        &self,
        season: &str,
        round: Option<u32>,
    ) -> Result<StandingsSnapshot<DriverStanding>, AppError> {
        let list = self.standings_list(season, round, "driverStandings").await?;
        Ok(StandingsSnapshot::from_list(list, |l| l.driver_standings))
    }

    /// Constructor standings after `round`, or after the latest round when `None`.
    pub async fn constructor_standings_after(
        &self,
        season: &str,
        round: Option<u32>,
    ) -> Result<StandingsSnapshot<ConstructorStanding>, AppError> {
        let list = self
            .standings_list(season, round, "constructorStandings")
            .await?;
        Ok(StandingsSnapshot::from_list(list, |l| l.constructor_standings))
    }

    async fn standings_list(
        &self,
        season: &str,
        round: Option<u32>,
        table: &str,
    ) -> Result<Option<StandingsList>, AppError> {
        let season = validate_season(season)?;
        let path = match round {
            Some(round) => format!("{}/{}/{}.json?limit={}", season, round, table, PAGE_LIMIT),
            None => format!("{}/{}.json?limit={}", season, table, PAGE_LIMIT),
        };
        let data: Envelope<StandingsData> = self.get_json(&path).await?;
        Ok(data.mr_data.standings_table.standings_lists.into_iter().next())
    }

    /// Every race of a season one driver took part in, each with that driver's result.
    pub async fn driver_season_results(
        &self,
        season: &str,
        driver_id: &str,
    ) -> Result<Vec<Race>, AppError> {
        let season = validate_season(season)?;
        let driver_id = validate_feed_id(driver_id)?;
        let path = format!(
            "{}/drivers/{}/results.json?limit={}",
            season, driver_id, PAGE_LIMIT
        );
        let data: Envelope<RaceTableData> = self.get_json(&path).await?;
        Ok(data.mr_data.race_table.races)
    }

    /// Every race of a season with the results of one constructor's cars.
    pub async fn constructor_season_results(
        &self,
        season: &str,
        constructor_id: &str,
    ) -> Result<Vec<Race>, AppError> {
        let season = validate_season(season)?;
        let constructor_id = validate_feed_id(constructor_id)?;
        let path = format!(
            "{}/constructors/{}/results.json?limit={}",
            season, constructor_id, PAGE_LIMIT
        );
        let data: Envelope<RaceTableData> = self.get_json(&path).await?;
        Ok(data.mr_data.race_table.races)
    }

    /// Running order and lap times of one lap, or `None` when the lap was not run.
    pub async fn lap_timings(
        &self,
        season: &str,
        round: u32,
        lap: u32,
    ) -> Result<Option<Lap>, AppError> {
        let season = validate_season(season)?;
        let path = format!("{}/{}/laps/{}.json?limit={}", season, round, lap, PAGE_LIMIT);
        let data: Envelope<LapTableData> = self.get_json(&path).await?;
        Ok(data
            .mr_data
            .race_table
            .races
            .into_iter()
            .next()
            .and_then(|race| race.laps.into_iter().next()))
    }

    /// The most recent race of the current season, with results.
    pub async fn last_race_results(&self) -> Result<Option<Race>, AppError> {
        let path = format!("current/last/results.json?limit={}", PAGE_LIMIT);
        let data: Envelope<RaceTableData> = self.get_json(&path).await?;
        Ok(data.mr_data.race_table.races.into_iter().next())
    }

    /// Results of a single round.
    pub async fn race_results(&self, season: &str, round: u32) -> Result<Option<Race>, AppError> {
        let season = validate_season(season)?;
        let path = format!("{}/{}/results.json?limit={}", season, round, PAGE_LIMIT);
        let data: Envelope<RaceTableData> = self.get_json(&path).await?;
        Ok(data.mr_data.race_table.races.into_iter().next())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!("Ergast GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("F1 API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "F1 API returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("F1 API JSON parse error: {}", e)))
    }
}
