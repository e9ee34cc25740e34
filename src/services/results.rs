//! Race-result analysis.
//!
//! Pure aggregations over feed results: places gained from the grid,
//! finishing-position spreads, retirement reasons, constructor reliability,
//! points distribution, head-to-head tables and championship progression.
//! Nothing here performs I/O; routes fetch the races and hand them in.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::{parse_number, parse_position};
use crate::services::ergast::{Race, RaceResult};

/// Grid-to-finish movement of one driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PositionChange {
    pub driver_id: String,
    pub start_position: u32,
    pub end_position: u32,
    /// Positive when places were gained.
    pub change: i64,
}

/// Places gained per driver, in finishing order.
///
/// A grid slot of 0 means a pit-lane start and counts as starting last.
pub fn position_changes(results: &[RaceResult]) -> Vec<PositionChange> {
    let field_size = results.len() as u32;
    results
        .iter()
        .map(|r| {
            let grid = parse_position(&r.grid);
            let start_position = if grid == 0 { field_size } else { grid };
            let end_position = parse_position(&r.position);
            PositionChange {
                driver_id: r.driver.driver_id.clone(),
                start_position,
                end_position,
                change: i64::from(start_position) - i64::from(end_position),
            }
        })
        .collect()
}

/// Whether a result status counts as reaching the flag.
///
/// Lapped cars ("Lapped", "+1 Lap", "+2 Laps") were still running at the end.
pub fn is_finished(status: &str) -> bool {
    status == "Finished" || status == "Lapped" || status.starts_with('+')
}

/// One driver's race within a season.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DriverRaceOutcome {
    pub round: u32,
    pub race_name: String,
    /// Starting slot; 0 for a pit-lane start
    pub grid: u32,
    pub position: u32,
    pub points: f64,
    pub status: String,
    pub finished: bool,
    /// Grid minus finish; absent for pit-lane starts
    pub positions_gained: Option<i64>,
    /// Race time or gap to the winner
    pub race_time: Option<String>,
    pub fastest_lap_rank: Option<u32>,
    pub fastest_lap_time: Option<String>,
    /// Average speed on the fastest lap, in kph
    pub fastest_lap_speed: Option<f64>,
}

/// The given driver's result in each race, ordered by round.
///
/// Races without a result for the driver are skipped.
pub fn driver_outcomes(races: &[Race], driver_id: &str) -> Vec<DriverRaceOutcome> {
    let mut outcomes: Vec<DriverRaceOutcome> = races
        .iter()
        .filter_map(|race| {
            let result = race.results.iter().find(|r| r.driver.driver_id == driver_id)?;
            let grid = parse_position(&result.grid);
            let position = parse_position(&result.position);
            let fastest = result.fastest_lap.as_ref();
            Some(DriverRaceOutcome {
                round: parse_position(&race.round),
                race_name: race.race_name.clone(),
                grid,
                position,
                points: parse_number(&result.points),
                status: result.status.clone(),
                finished: is_finished(&result.status),
                positions_gained: (grid > 0 && position > 0)
                    .then(|| i64::from(grid) - i64::from(position)),
                race_time: result.time.as_ref().map(|t| t.time.clone()),
                fastest_lap_rank: fastest.and_then(|f| f.rank.as_deref()).map(parse_position),
                fastest_lap_time: fastest
                    .and_then(|f| f.time.as_ref())
                    .map(|t| t.time.clone()),
                fastest_lap_speed: fastest
                    .and_then(|f| f.average_speed.as_ref())
                    .map(|s| parse_number(&s.speed)),
            })
        })
        .collect();
    outcomes.sort_by_key(|o| o.round);
    outcomes
}

/// How often a finishing position was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PositionCount {
    /// e.g. "P3"
    pub position: String,
    pub count: u32,
}

/// Count of each finishing position, best position first.
pub fn position_counts(outcomes: &[DriverRaceOutcome]) -> Vec<PositionCount> {
    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
    for outcome in outcomes.iter().filter(|o| o.position > 0) {
        *counts.entry(outcome.position).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(position, count)| PositionCount {
            position: format!("P{}", position),
            count,
        })
        .collect()
}

/// Finishing positions grouped into bands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct FinishBuckets {
    /// P1 to P3
    pub podiums: u32,
    /// P4 and P5
    pub top5: u32,
    /// P6 to P10
    pub top10: u32,
    pub outside_top10: u32,
}

pub fn finish_buckets(outcomes: &[DriverRaceOutcome]) -> FinishBuckets {
    let mut buckets = FinishBuckets::default();
    for outcome in outcomes {
        match outcome.position {
            1..=3 => buckets.podiums += 1,
            4..=5 => buckets.top5 += 1,
            6..=10 => buckets.top10 += 1,
            _ => buckets.outside_top10 += 1,
        }
    }
    buckets
}

/// How often a non-finishing status occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReasonCount {
    pub reason: String,
    pub count: u32,
}

/// Retirement reasons, most frequent first.
pub fn dnf_reasons<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Vec<ReasonCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for status in statuses.into_iter().filter(|s| !is_finished(s)) {
        let reason = if status.is_empty() { "Unknown" } else { status };
        *counts.entry(reason).or_default() += 1;
    }
    let mut reasons: Vec<ReasonCount> = counts
        .into_iter()
        .map(|(reason, count)| ReasonCount {
            reason: reason.to_string(),
            count,
        })
        .collect();
    reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    reasons
}

/// Finished versus retired car entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct Reliability {
    pub finished: u32,
    pub dnf: u32,
    pub total: u32,
}

pub fn reliability<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Reliability {
    let mut summary = Reliability::default();
    for status in statuses {
        if is_finished(status) {
            summary.finished += 1;
        } else {
            summary.dnf += 1;
        }
        summary.total += 1;
    }
    summary
}

/// A constructor's race: best car and combined points.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ConstructorRaceSummary {
    pub round: u32,
    pub race_name: String,
    /// Best classified position of the team's cars; absent without a result
    pub best_position: Option<u32>,
    pub points: f64,
}

/// Per-race summaries of a constructor's results, ordered by round.
pub fn constructor_race_summaries(races: &[Race]) -> Vec<ConstructorRaceSummary> {
    let mut summaries: Vec<ConstructorRaceSummary> = races
        .iter()
        .map(|race| ConstructorRaceSummary {
            round: parse_position(&race.round),
            race_name: race.race_name.clone(),
            best_position: race
                .results
                .iter()
                .map(|r| parse_position(&r.position))
                .filter(|p| *p > 0)
                .min(),
            points: race.results.iter().map(|r| parse_number(&r.points)).sum(),
        })
        .collect();
    summaries.sort_by_key(|s| s.round);
    summaries
}

/// How many races ended with a given points haul.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PointsBucket {
    /// e.g. "18", "7.5" or "No Points"
    pub points: String,
    pub count: u32,
}

/// Points hauls grouped by value, lowest first.
pub fn points_distribution(hauls: impl IntoIterator<Item = f64>) -> Vec<PointsBucket> {
    // Keyed in tenths so half points group exactly.
    let mut counts: BTreeMap<i64, u32> = BTreeMap::new();
    for points in hauls {
        *counts.entry((points * 10.0).round() as i64).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(tenths, count)| PointsBucket {
            points: points_label(tenths),
            count,
        })
        .collect()
}

fn points_label(tenths: i64) -> String {
    match tenths {
        0 => "No Points".to_string(),
        t if t % 10 == 0 => (t / 10).to_string(),
        t => format!("{}", t as f64 / 10.0),
    }
}

/// One driver's finishing position in a head-to-head row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DriverPosition {
    pub driver_id: String,
    /// Absent when the driver did not take part
    pub position: Option<u32>,
}

/// Finishing positions of several drivers in one race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HeadToHeadRow {
    pub round: u32,
    pub race_name: String,
    /// One entry per compared driver, in the order given
    pub positions: Vec<DriverPosition>,
}

/// Pivot each driver's season results into one row per round.
///
/// `drivers` pairs a driver id with the races fetched for that driver.
pub fn head_to_head(drivers: &[(String, Vec<Race>)]) -> Vec<HeadToHeadRow> {
    let mut rounds: BTreeMap<u32, String> = BTreeMap::new();
    let mut finishes: HashMap<(&str, u32), u32> = HashMap::new();

    for (driver_id, races) in drivers {
        for race in races {
            let round = parse_position(&race.round);
            rounds
                .entry(round)
                .or_insert_with(|| race.race_name.clone());
            if let Some(result) = race.results.iter().find(|r| &r.driver.driver_id == driver_id) {
                let position = parse_position(&result.position);
                if position > 0 {
                    finishes.insert((driver_id.as_str(), round), position);
                }
            }
        }
    }

    rounds
        .into_iter()
        .map(|(round, race_name)| HeadToHeadRow {
            round,
            race_name,
            positions: drivers
                .iter()
                .map(|(driver_id, _)| DriverPosition {
                    driver_id: driver_id.clone(),
                    position: finishes.get(&(driver_id.as_str(), round)).copied(),
                })
                .collect(),
        })
        .collect()
}

/// A championship entry (driver or constructor) with its points total.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingPoints {
    pub id: String,
    pub name: String,
    pub points: f64,
}

/// Cumulative points of one competitor, one value per round.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProgressionSeries {
    pub id: String,
    pub name: String,
    pub points: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PointsProgression {
    /// Rounds covered, ascending; `series[i].points[j]` is the total after `rounds[j]`
    pub rounds: Vec<u32>,
    pub series: Vec<ProgressionSeries>,
}

/// Line up the points of `tracked` competitors across per-round standings.
///
/// A competitor missing from a round's table keeps their previous total,
/// which is 0 before they first appear.
pub fn points_progression(
    tracked: &[StandingPoints],
    per_round: &[(u32, Vec<StandingPoints>)],
) -> PointsProgression {
    let mut ordered: Vec<&(u32, Vec<StandingPoints>)> = per_round.iter().collect();
    ordered.sort_by_key(|(round, _)| *round);

    let series = tracked
        .iter()
        .map(|competitor| {
            let mut total = 0.0;
            let points = ordered
                .iter()
                .map(|(_, table)| {
                    if let Some(entry) = table.iter().find(|e| e.id == competitor.id) {
                        total = entry.points;
                    }
                    total
                })
                .collect();
            ProgressionSeries {
                id: competitor.id.clone(),
                name: competitor.name.clone(),
                points,
            }
        })
        .collect();

    PointsProgression {
        rounds: ordered.iter().map(|(round, _)| *round).collect(),
        series,
    }
}
