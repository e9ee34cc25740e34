//! Shared helpers for the string-encoded values of the Ergast feed.
//!
//! The feed encodes every number as a JSON string (`"position": "3"`,
//! `"points": "18.5"`) and identifies seasons/rounds by path segments. These
//! helpers parse the former leniently and validate the latter strictly, since
//! the latter end up in upstream URLs.

use crate::errors::AppError;

/// Parse a string-encoded number, defaulting to 0 for malformed input.
pub(crate) fn parse_number(s: &str) -> f64 {
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            tracing::warn!("Unparseable numeric field '{}', defaulting to 0", s);
            0.0
        }
    }
}

/// Parse a string-encoded position/grid slot, defaulting to 0.
pub(crate) fn parse_position(s: &str) -> u32 {
    s.trim().parse::<u32>().unwrap_or_else(|_| {
        tracing::warn!("Unparseable position '{}', defaulting to 0", s);
        0
    })
}

/// Validate a season path segment: `current` or a four-digit year.
pub(crate) fn validate_season(season: &str) -> Result<&str, AppError> {
    if season == "current" || (season.len() == 4 && season.bytes().all(|b| b.is_ascii_digit())) {
        Ok(season)
    } else {
        Err(AppError::BadRequest(format!(
            "season must be 'current' or a four-digit year, got '{}'",
            season
        )))
    }
}

/// Validate a round path segment: a positive integer.
pub(crate) fn validate_round(round: &str) -> Result<u32, AppError> {
    positive_integer(round, "round")
}

/// Validate a lap path segment: a positive integer.
pub(crate) fn validate_lap(lap: &str) -> Result<u32, AppError> {
    positive_integer(lap, "lap")
}

/// Validate a feed driver/constructor id such as `max_verstappen` or `red_bull`.
pub(crate) fn validate_feed_id(id: &str) -> Result<&str, AppError> {
    let valid = !id.is_empty()
        && id.len() <= 64
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(id)
    } else {
        Err(AppError::BadRequest(format!(
            "id must be letters, digits or underscores, got '{}'",
            id
        )))
    }
}

fn positive_integer(value: &str, what: &str) -> Result<u32, AppError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 && value.bytes().all(|b| b.is_ascii_digit()) => Ok(n),
        _ => Err(AppError::BadRequest(format!(
            "{} must be a positive integer, got '{}'",
            what, value
        ))),
    }
}
