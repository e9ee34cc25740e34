//! Local-time projection of a session start.
//!
//! Everything here is a pure function of (session start, viewer zone, now):
//! the countdown digits, the start rendered on the viewer's 12-hour clock,
//! and a friendly label for the viewer's zone.
//!
//! Zone labels are derived in two steps:
//! 1. the zone's long name at `now` ("Eastern Daylight Time"), from the tzdb
//!    abbreviation in effect (`EDT`) disambiguated by UTC offset, or for
//!    zones whose tzdb abbreviation is numeric (`-03`) from their region;
//!    anything else falls back to "GMT±HH:MM";
//! 2. the long name mapped through `FRIENDLY_ZONE_LABELS` ("US Eastern Time"),
//!    identity on a miss.

use chrono::{DateTime, Offset, Utc};
use chrono_tz::{OffsetName, Tz};
use serde::Serialize;
use utoipa::ToSchema;

const SECS_PER_DAY: i64 = 86_400;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_MINUTE: i64 = 60;

const H: i32 = 3_600;
const M: i32 = 60;

/// (tzdb abbreviation, UTC offset in seconds) → long name.
///
/// The offset separates abbreviations shared by unrelated zones: `CST` is
/// both US Central (-6h) and China (+8h), `IST` is Ireland, India and Israel.
const ABBREVIATION_LONG_NAMES: &[(&str, i32, &str)] = &[
    ("UTC", 0, "Coordinated Universal Time"),
    ("GMT", 0, "Greenwich Mean Time"),
    ("BST", H, "British Summer Time"),
    ("IST", H, "Irish Standard Time"),
    ("WET", 0, "Western European Standard Time"),
    ("WEST", H, "Western European Summer Time"),
    ("CET", H, "Central European Standard Time"),
    ("CEST", 2 * H, "Central European Summer Time"),
    ("EET", 2 * H, "Eastern European Standard Time"),
    ("EEST", 3 * H, "Eastern European Summer Time"),
    ("MSK", 3 * H, "Moscow Standard Time"),
    ("IST", 2 * H, "Israel Standard Time"),
    ("IDT", 3 * H, "Israel Daylight Time"),
    ("WAT", H, "West Africa Standard Time"),
    ("CAT", 2 * H, "Central Africa Time"),
    ("SAST", 2 * H, "South Africa Standard Time"),
    ("EAT", 3 * H, "East Africa Time"),
    ("PKT", 5 * H, "Pakistan Standard Time"),
    ("IST", 5 * H + 30 * M, "India Standard Time"),
    ("WIB", 7 * H, "Western Indonesia Time"),
    ("CST", 8 * H, "China Standard Time"),
    ("HKT", 8 * H, "Hong Kong Standard Time"),
    ("PHT", 8 * H, "Philippine Standard Time"),
    ("AWST", 8 * H, "Australian Western Standard Time"),
    ("JST", 9 * H, "Japan Standard Time"),
    ("KST", 9 * H, "Korean Standard Time"),
    ("ACST", 9 * H + 30 * M, "Australian Central Standard Time"),
    ("ACDT", 10 * H + 30 * M, "Australian Central Daylight Time"),
    ("AEST", 10 * H, "Australian Eastern Standard Time"),
    ("AEDT", 11 * H, "Australian Eastern Daylight Time"),
    ("NZST", 12 * H, "New Zealand Standard Time"),
    ("NZDT", 13 * H, "New Zealand Daylight Time"),
    ("NST", -(3 * H + 30 * M), "Newfoundland Standard Time"),
    ("NDT", -(2 * H + 30 * M), "Newfoundland Daylight Time"),
    ("AST", -4 * H, "Atlantic Standard Time"),
    ("ADT", -3 * H, "Atlantic Daylight Time"),
    ("EST", -5 * H, "Eastern Standard Time"),
    ("EDT", -4 * H, "Eastern Daylight Time"),
    ("CST", -6 * H, "Central Standard Time"),
    ("CDT", -5 * H, "Central Daylight Time"),
    ("MST", -7 * H, "Mountain Standard Time"),
    ("MDT", -6 * H, "Mountain Daylight Time"),
    ("PST", -8 * H, "Pacific Standard Time"),
    ("PDT", -7 * H, "Pacific Daylight Time"),
    ("AKST", -9 * H, "Alaska Standard Time"),
    ("AKDT", -8 * H, "Alaska Daylight Time"),
    ("HST", -10 * H, "Hawaii-Aleutian Standard Time"),
];

/// Zone id prefix → long name, for zones the tzdb abbreviates numerically.
const NUMERIC_ZONE_LONG_NAMES: &[(&str, &str)] = &[
    ("America/Sao_Paulo", "Brasilia Standard Time"),
    ("America/Fortaleza", "Brasilia Standard Time"),
    ("America/Recife", "Brasilia Standard Time"),
    ("America/Bahia", "Brasilia Standard Time"),
    ("America/Belem", "Brasilia Standard Time"),
    ("America/Maceio", "Brasilia Standard Time"),
    ("America/Araguaina", "Brasilia Standard Time"),
    ("America/Santarem", "Brasilia Standard Time"),
    ("America/Argentina/", "Argentina Standard Time"),
    ("America/Buenos_Aires", "Argentina Standard Time"),
    ("America/Montevideo", "Uruguay Standard Time"),
    ("America/Santiago", "Chile Time"),
    ("America/Bogota", "Colombia Standard Time"),
    ("America/Lima", "Peru Standard Time"),
    ("Asia/Dubai", "Gulf Standard Time"),
    ("Asia/Muscat", "Gulf Standard Time"),
    ("Asia/Qatar", "Arabian Standard Time"),
    ("Asia/Bahrain", "Arabian Standard Time"),
    ("Asia/Riyadh", "Arabian Standard Time"),
    ("Asia/Baku", "Azerbaijan Standard Time"),
    ("Asia/Singapore", "Singapore Standard Time"),
    ("Asia/Kuala_Lumpur", "Malaysia Time"),
    ("Asia/Kathmandu", "Nepal Time"),
    ("Europe/Istanbul", "Turkey Time"),
];

/// Long zone name → label shown to viewers.
const FRIENDLY_ZONE_LABELS: &[(&str, &str)] = &[
    ("India Standard Time", "Indian Time"),
    ("British Summer Time", "UK Time"),
    ("Greenwich Mean Time", "UK Time"),
    ("Eastern Daylight Time", "US Eastern Time"),
    ("Eastern Standard Time", "US Eastern Time"),
    ("Central Daylight Time", "US Central Time"),
    ("Central Standard Time", "US Central Time"),
    ("Pacific Daylight Time", "US Pacific Time"),
    ("Pacific Standard Time", "US Pacific Time"),
    ("Australian Eastern Standard Time", "Australian Eastern Time"),
    ("Australian Eastern Daylight Time", "Australian Eastern Time"),
    ("Japan Standard Time", "Japan Time"),
    ("Central European Time", "Central European Time"),
    ("Central European Standard Time", "Central European Time"),
    ("Central European Summer Time", "Central European Time"),
    ("Brasilia Standard Time", "Brazil Time"),
];

/// Time remaining until a session, never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// Decompose whole seconds; negative input clamps to zero.
    pub fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        Self {
            days: total / SECS_PER_DAY,
            hours: (total % SECS_PER_DAY) / SECS_PER_HOUR,
            minutes: (total % SECS_PER_HOUR) / SECS_PER_MINUTE,
            seconds: total % SECS_PER_MINUTE,
        }
    }

    /// Whole seconds from `now` until `start`, floored and clamped at zero.
    pub fn until(start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::from_seconds((start - now).num_seconds())
    }

    pub fn total_seconds(&self) -> i64 {
        self.days * SECS_PER_DAY
            + self.hours * SECS_PER_HOUR
            + self.minutes * SECS_PER_MINUTE
            + self.seconds
    }

    pub fn is_zero(&self) -> bool {
        self.total_seconds() == 0
    }

    /// Two-digit `DD:HH:MM:SS` (days widen past 99).
    pub fn display(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Countdown plus the viewer-facing clock text.
///
/// `local_time_text` and `time_zone_label` are empty when the viewer's zone
/// is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ResolvedCountdown {
    pub countdown: Countdown,
    /// Session start on the viewer's 12-hour clock, e.g. "2:30 PM"
    pub local_time_text: String,
    /// Friendly zone label, e.g. "US Eastern Time"
    pub time_zone_label: String,
}

/// Project a session start into the viewer's zone.
pub fn project(
    session_start: DateTime<Utc>,
    viewer_zone: Option<Tz>,
    now: DateTime<Utc>,
) -> ResolvedCountdown {
    let countdown = Countdown::until(session_start, now);
    match viewer_zone {
        Some(tz) => ResolvedCountdown {
            countdown,
            local_time_text: local_time_text(session_start, tz),
            time_zone_label: friendly_zone_label(&long_zone_name(tz, now)),
        },
        None => ResolvedCountdown {
            countdown,
            local_time_text: String::new(),
            time_zone_label: String::new(),
        },
    }
}

/// `instant` on the 12-hour clock of `tz`, e.g. "9:05 AM".
pub fn local_time_text(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%-I:%M %p").to_string()
}

/// Long name of `tz` as observed at `at`.
pub fn long_zone_name(tz: Tz, at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&tz);
    let offset = local.offset();
    let offset_secs = offset.fix().local_minus_utc();

    if let Some(abbreviation) = offset.abbreviation() {
        if let Some((_, _, name)) = ABBREVIATION_LONG_NAMES
            .iter()
            .find(|(abbr, secs, _)| *abbr == abbreviation && *secs == offset_secs)
        {
            return name.to_string();
        }
    }

    let id = tz.name();
    NUMERIC_ZONE_LONG_NAMES
        .iter()
        .find(|(prefix, _)| id == *prefix || (prefix.ends_with('/') && id.starts_with(prefix)))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| gmt_offset_name(offset_secs))
}

/// "GMT" for a zero offset, otherwise "GMT+05:45" style.
fn gmt_offset_name(offset_secs: i32) -> String {
    if offset_secs == 0 {
        return "GMT".to_string();
    }
    let sign = if offset_secs > 0 { '+' } else { '-' };
    let abs = offset_secs.unsigned_abs();
    format!("GMT{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

/// Map a long zone name to its friendly label; unknown names pass through.
pub fn friendly_zone_label(long_name: &str) -> String {
    FRIENDLY_ZONE_LABELS
        .iter()
        .find(|(name, _)| *name == long_name)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| long_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse::<DateTime<Utc>>().unwrap()
    }

    fn tz(name: &str) -> Tz {
        name.parse::<Tz>().unwrap()
    }

    #[test]
    fn test_countdown_90061_seconds() {
        let now = utc("2026-03-01T00:00:00Z");
        let c = Countdown::until(now + Duration::seconds(90_061), now);
        assert_eq!(
            c,
            Countdown {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            }
        );
        assert_eq!(c.display(), "01:01:01:01");
    }

    #[test]
    fn test_countdown_recomposes_to_floor_of_delta() {
        let now = utc("2026-03-01T00:00:00Z");
        let mut delta_ms: i64 = 1;
        while delta_ms < 40 * SECS_PER_DAY * 1000 {
            let start = now + Duration::milliseconds(delta_ms);
            let c = Countdown::until(start, now);
            assert_eq!(c.total_seconds(), delta_ms / 1000, "delta {}ms", delta_ms);
            assert!(c.days >= 0 && c.hours >= 0 && c.minutes >= 0 && c.seconds >= 0);
            assert!(c.hours < 24 && c.minutes < 60 && c.seconds < 60);
            delta_ms = delta_ms * 3 + 7;
        }
    }

    #[test]
    fn test_countdown_zero_at_and_after_start() {
        let start = utc("2026-03-08T14:00:00Z");
        for offset in [0, 1, 59, 3_600, 10 * SECS_PER_DAY] {
            let c = Countdown::until(start, start + Duration::seconds(offset));
            assert!(c.is_zero(), "offset {}", offset);
            assert_eq!(c.display(), "00:00:00:00");
        }
    }

    #[test]
    fn test_countdown_sub_second_remaining_is_zero() {
        let now = utc("2026-03-08T13:59:59.500Z");
        let c = Countdown::until(utc("2026-03-08T14:00:00Z"), now);
        assert!(c.is_zero());
    }

    #[test]
    fn test_countdown_display_wide_days() {
        let c = Countdown::from_seconds(123 * SECS_PER_DAY + 5);
        assert_eq!(c.display(), "123:00:00:05");
    }

    #[test]
    fn test_local_time_text_uses_zone_rules() {
        // New York switches to EDT on 2026-03-08 at 07:00 UTC.
        let before = utc("2026-03-08T06:30:00Z");
        let after = utc("2026-03-08T18:30:00Z");
        assert_eq!(local_time_text(before, tz("America/New_York")), "1:30 AM");
        assert_eq!(local_time_text(after, tz("America/New_York")), "2:30 PM");
    }

    #[test]
    fn test_local_time_text_half_hour_zone() {
        let start = utc("2026-03-08T04:00:00Z");
        assert_eq!(local_time_text(start, tz("Asia/Kolkata")), "9:30 AM");
    }

    #[test]
    fn test_local_time_text_midnight_and_noon() {
        assert_eq!(
            local_time_text(utc("2026-06-01T00:05:00Z"), tz("UTC")),
            "12:05 AM"
        );
        assert_eq!(
            local_time_text(utc("2026-06-01T12:00:00Z"), tz("UTC")),
            "12:00 PM"
        );
    }

    #[test]
    fn test_long_zone_name_standard_and_daylight() {
        let winter = utc("2026-01-15T12:00:00Z");
        let summer = utc("2026-07-15T12:00:00Z");
        assert_eq!(
            long_zone_name(tz("America/New_York"), winter),
            "Eastern Standard Time"
        );
        assert_eq!(
            long_zone_name(tz("America/New_York"), summer),
            "Eastern Daylight Time"
        );
        assert_eq!(
            long_zone_name(tz("Europe/London"), winter),
            "Greenwich Mean Time"
        );
        assert_eq!(
            long_zone_name(tz("Europe/London"), summer),
            "British Summer Time"
        );
        // Southern hemisphere: DST in January.
        assert_eq!(
            long_zone_name(tz("Australia/Sydney"), winter),
            "Australian Eastern Daylight Time"
        );
    }

    #[test]
    fn test_long_zone_name_covers_whole_regions() {
        let winter = utc("2026-01-15T12:00:00Z");
        let summer = utc("2026-07-15T12:00:00Z");
        assert_eq!(
            long_zone_name(tz("Europe/Copenhagen"), winter),
            "Central European Standard Time"
        );
        assert_eq!(
            long_zone_name(tz("Europe/Oslo"), summer),
            "Central European Summer Time"
        );
        assert_eq!(
            long_zone_name(tz("America/Indiana/Indianapolis"), winter),
            "Eastern Standard Time"
        );
        assert_eq!(
            long_zone_name(tz("Australia/Hobart"), winter),
            "Australian Eastern Daylight Time"
        );
        assert_eq!(
            long_zone_name(tz("America/Fortaleza"), winter),
            "Brasilia Standard Time"
        );
        assert_eq!(
            long_zone_name(tz("America/Argentina/Cordoba"), winter),
            "Argentina Standard Time"
        );
    }

    #[test]
    fn test_long_zone_name_shared_abbreviations_split_by_offset() {
        let winter = utc("2026-01-15T12:00:00Z");
        assert_eq!(
            long_zone_name(tz("America/Chicago"), winter),
            "Central Standard Time"
        );
        assert_eq!(
            long_zone_name(tz("Asia/Shanghai"), winter),
            "China Standard Time"
        );
        assert_eq!(
            long_zone_name(tz("Asia/Kolkata"), winter),
            "India Standard Time"
        );
        assert_eq!(
            long_zone_name(tz("Europe/Dublin"), utc("2026-07-15T12:00:00Z")),
            "Irish Standard Time"
        );
    }

    #[test]
    fn test_long_zone_name_unnamed_zone_uses_offset() {
        let at = utc("2026-01-15T12:00:00Z");
        assert_eq!(long_zone_name(tz("Asia/Tashkent"), at), "GMT+05:00");
        assert_eq!(long_zone_name(tz("Etc/GMT+3"), at), "GMT-03:00");
        assert_eq!(long_zone_name(tz("Africa/Abidjan"), at), "Greenwich Mean Time");
    }

    #[test]
    fn test_project_regional_labels() {
        let winter = utc("2026-01-15T12:00:00Z");
        let label = |id: &str| project(winter, Some(tz(id)), winter).time_zone_label;
        assert_eq!(label("Europe/Copenhagen"), "Central European Time");
        assert_eq!(label("Europe/Oslo"), "Central European Time");
        assert_eq!(label("America/Indiana/Indianapolis"), "US Eastern Time");
        assert_eq!(label("America/Fortaleza"), "Brazil Time");
        assert_eq!(label("Australia/Hobart"), "Australian Eastern Time");
        assert_eq!(label("Europe/Dublin"), "UK Time");
    }

    #[test]
    fn test_friendly_label_variants_share_label() {
        assert_eq!(friendly_zone_label("Eastern Standard Time"), "US Eastern Time");
        assert_eq!(friendly_zone_label("Eastern Daylight Time"), "US Eastern Time");
        assert_eq!(friendly_zone_label("British Summer Time"), "UK Time");
        assert_eq!(friendly_zone_label("Greenwich Mean Time"), "UK Time");
        assert_eq!(
            friendly_zone_label("Central European Summer Time"),
            "Central European Time"
        );
        assert_eq!(friendly_zone_label("Brasilia Standard Time"), "Brazil Time");
    }

    #[test]
    fn test_friendly_label_miss_is_identity_and_idempotent() {
        for name in ["Gulf Standard Time", "GMT+05:45", "", "Coordinated Universal Time"] {
            assert_eq!(friendly_zone_label(name), name);
        }
        for (long, _) in FRIENDLY_ZONE_LABELS {
            let once = friendly_zone_label(long);
            assert_eq!(friendly_zone_label(&once), once);
        }
    }

    #[test]
    fn test_every_numeric_zone_entry_parses() {
        for (id, _) in NUMERIC_ZONE_LONG_NAMES {
            if !id.ends_with('/') {
                assert!(id.parse::<Tz>().is_ok(), "unknown zone id {}", id);
            }
        }
    }

    #[test]
    fn test_project_with_zone() {
        let now = utc("2026-01-15T12:00:00Z");
        let start = utc("2026-01-16T13:01:01Z");
        let resolved = project(start, Some(tz("Asia/Tokyo")), now);
        assert_eq!(resolved.countdown.display(), "01:01:01:01");
        assert_eq!(resolved.local_time_text, "10:01 PM");
        assert_eq!(resolved.time_zone_label, "Japan Time");
    }

    #[test]
    fn test_project_label_follows_now_not_session() {
        // Viewer is on EST today; the session falls after the DST switch.
        let now = utc("2026-03-01T12:00:00Z");
        let start = utc("2026-03-15T18:00:00Z");
        let resolved = project(start, Some(tz("America/Chicago")), now);
        assert_eq!(resolved.local_time_text, "1:00 PM");
        assert_eq!(resolved.time_zone_label, "US Central Time");
        assert_eq!(
            long_zone_name(tz("America/Chicago"), now),
            "Central Standard Time"
        );
    }

    #[test]
    fn test_project_without_zone_keeps_countdown() {
        let now = utc("2026-01-15T12:00:00Z");
        let resolved = project(now + Duration::seconds(61), None, now);
        assert_eq!(resolved.countdown.minutes, 1);
        assert_eq!(resolved.countdown.seconds, 1);
        assert!(resolved.local_time_text.is_empty());
        assert!(resolved.time_zone_label.is_empty());
    }

    #[test]
    fn test_project_is_idempotent() {
        let now = utc("2026-01-15T12:00:00Z");
        let start = utc("2026-02-01T08:00:00Z");
        let zone = Some(tz("Europe/Paris"));
        assert_eq!(project(start, zone, now), project(start, zone, now));
    }
}
