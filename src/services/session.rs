//! Race-weekend model and next-session resolution.
//!
//! A `RaceWeekend` is the validated form of the feed's `Race` record. The
//! resolver walks its sessions in weekend order and picks the first one that
//! has not started yet, falling back to the last listed session once the
//! whole weekend is in the past.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::ergast::{FeedSlot, Race};

/// Clock time assumed for the race when the feed omits it.
const DEFAULT_RACE_TIME: NaiveTime = match NaiveTime::from_hms_opt(14, 0, 0) {
    Some(t) => t,
    None => panic!("default race time is not a valid clock time"),
};

/// Sessions the resolver considers, in weekend order.
///
/// Sprint sessions are carried on `RaceWeekend` but never resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum SessionKind {
    #[serde(rename = "FP1")]
    Fp1,
    #[serde(rename = "FP2")]
    Fp2,
    #[serde(rename = "FP3")]
    Fp3,
    Qualifying,
    Race,
}

impl SessionKind {
    /// Short code used by the feed and dashboards ("FP1", "Qualifying", ...).
    pub fn code(self) -> &'static str {
        match self {
            SessionKind::Fp1 => "FP1",
            SessionKind::Fp2 => "FP2",
            SessionKind::Fp3 => "FP3",
            SessionKind::Qualifying => "Qualifying",
            SessionKind::Race => "Race",
        }
    }

    pub fn display_name(self) -> String {
        session_display_name(self.code())
    }
}

/// Human-readable name for a session code. Unknown codes pass through.
pub fn session_display_name(code: &str) -> String {
    match code {
        "FP1" => "Free Practice 1".to_string(),
        "FP2" => "Free Practice 2".to_string(),
        "FP3" => "Free Practice 3".to_string(),
        "Q1" => "Qualifying 1".to_string(),
        "Q2" => "Qualifying 2".to_string(),
        "Q3" => "Qualifying 3".to_string(),
        "Qualifying" => "Qualifying".to_string(),
        "Race" => "Race".to_string(),
        other => other.to_string(),
    }
}

/// A session placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledSession {
    pub kind: SessionKind,
    pub start: DateTime<Utc>,
}

/// Calendar date plus optional clock time, both UTC-anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSlot {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl SessionSlot {
    /// Start instant, or `None` when the clock time is unknown.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.time.map(|t| self.date.and_time(t).and_utc())
    }

    /// Start instant, filling a missing clock time with `default`.
    pub fn start_or(&self, default: NaiveTime) -> DateTime<Utc> {
        self.date.and_time(self.time.unwrap_or(default)).and_utc()
    }
}

/// Validated race weekend. The race slot always exists.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceWeekend {
    pub season: String,
    pub round: String,
    pub race_name: String,
    pub circuit_name: String,
    pub locality: Option<String>,
    pub country: Option<String>,
    pub first_practice: Option<SessionSlot>,
    pub second_practice: Option<SessionSlot>,
    pub third_practice: Option<SessionSlot>,
    pub qualifying: Option<SessionSlot>,
    pub sprint: Option<SessionSlot>,
    pub race: SessionSlot,
}

impl RaceWeekend {
    /// Race start, defaulting the clock time to 14:00 when absent.
    pub fn race_start(&self) -> DateTime<Utc> {
        self.race.start_or(DEFAULT_RACE_TIME)
    }
}

impl TryFrom<Race> for RaceWeekend {
    type Error = AppError;

    fn try_from(race: Race) -> Result<Self, Self::Error> {
        let race_slot = SessionSlot {
            date: parse_feed_date(&race.date)?,
            time: race.time.as_deref().map(parse_feed_time).transpose()?,
        };
        let (locality, country) = match race.circuit.location {
            Some(loc) => (Some(loc.locality), Some(loc.country)),
            None => (None, None),
        };

        Ok(Self {
            first_practice: optional_slot(race.first_practice.as_ref(), "FirstPractice"),
            second_practice: optional_slot(race.second_practice.as_ref(), "SecondPractice"),
            third_practice: optional_slot(race.third_practice.as_ref(), "ThirdPractice"),
            qualifying: optional_slot(race.qualifying.as_ref(), "Qualifying"),
            sprint: optional_slot(race.sprint.as_ref(), "Sprint"),
            season: race.season,
            round: race.round,
            race_name: race.race_name,
            circuit_name: race.circuit.circuit_name,
            locality,
            country,
            race: race_slot,
        })
    }
}

/// Convert an optional feed slot, dropping (with a warning) one that doesn't parse.
fn optional_slot(slot: Option<&FeedSlot>, label: &str) -> Option<SessionSlot> {
    let slot = slot?;
    let parsed = parse_feed_date(&slot.date).and_then(|date| {
        let time = slot.time.as_deref().map(parse_feed_time).transpose()?;
        Ok(SessionSlot { date, time })
    });
    match parsed {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!("Ignoring malformed {} slot: {}", label, e);
            None
        }
    }
}

fn parse_feed_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| AppError::ExternalServiceError(format!("Invalid date '{}': {}", s, e)))
}

/// Parse feed clock times: `13:30:00Z`, `13:30:00+00:00`, `13:30:00`, `13:30`.
fn parse_feed_time(s: &str) -> Result<NaiveTime, AppError> {
    let trimmed = s.trim();
    let bare = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix("+00:00"))
        .unwrap_or(trimmed);
    NaiveTime::parse_from_str(bare, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(bare, "%H:%M"))
        .map_err(|e| AppError::ExternalServiceError(format!("Invalid time '{}': {}", s, e)))
}

/// Timeline candidates in weekend order: FP1, FP2, FP3, Qualifying, Race.
///
/// Absent sessions are skipped, as are non-race sessions without a clock
/// time. The race is always the last element.
pub fn candidate_sessions(weekend: &RaceWeekend) -> Vec<ScheduledSession> {
    let optional = [
        (SessionKind::Fp1, weekend.first_practice),
        (SessionKind::Fp2, weekend.second_practice),
        (SessionKind::Fp3, weekend.third_practice),
        (SessionKind::Qualifying, weekend.qualifying),
    ];

    let mut sessions: Vec<ScheduledSession> = optional
        .into_iter()
        .filter_map(|(kind, slot)| {
            slot.and_then(|s| s.start())
                .map(|start| ScheduledSession { kind, start })
        })
        .collect();

    sessions.push(ScheduledSession {
        kind: SessionKind::Race,
        start: weekend.race_start(),
    });
    sessions
}

/// The first session starting strictly after `now`, else the last session.
pub fn resolve_next_session(weekend: &RaceWeekend, now: DateTime<Utc>) -> ScheduledSession {
    let sessions = candidate_sessions(weekend);
    let fallback = sessions[sessions.len() - 1];
    sessions
        .into_iter()
        .find(|s| s.start > now)
        .unwrap_or(fallback)
}
