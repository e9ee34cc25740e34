//! Next-session countdown endpoints.
//!
//! - GET /api/v1/countdown?tz=IANA: one projection of the next session
//! - GET /api/v1/countdown/stream?tz=IANA: SSE, one projection per second
//!
//! Without `tz`, the viewer's zone comes from IP geolocation (memoized per
//! address). If that fails, the countdown is still served with blank local
//! time and label; the stream keeps retrying and fills them in once resolved.

use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::services::countdown::{project, Countdown};
use crate::services::geo::ZoneCache;
use crate::services::poller::SharedScheduleState;
use crate::services::session::{resolve_next_session, RaceWeekend, SessionKind};

/// Cadence of the SSE countdown stream.
const STREAM_TICK: Duration = Duration::from_secs(1);

/// Stream ticks between geolocation retries while the viewer zone is unknown.
const ZONE_RETRY_TICKS: usize = 15;

/// Shared state for countdown endpoints.
#[derive(Clone)]
pub struct CountdownState {
    pub schedule: SharedScheduleState,
    pub zones: ZoneCache,
    pub shutdown: CancellationToken,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CountdownQuery {
    /// IANA time zone (e.g. "Europe/London"); geolocated from the caller's IP when omitted
    pub tz: Option<String>,
}

/// The session being counted down to.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfo {
    pub kind: SessionKind,
    /// Human-readable name, e.g. "Free Practice 1"
    pub name: String,
    /// Session start in RFC 3339 (UTC)
    pub start_time: String,
}

/// Countdown to the next session of the upcoming race weekend.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountdownResponse {
    pub season: String,
    pub round: String,
    pub race_name: String,
    pub circuit_name: String,
    pub session: SessionInfo,
    pub countdown: Countdown,
    /// Same duration as `countdown`, in whole seconds
    pub total_seconds: i64,
    /// True once the session start has passed
    pub started: bool,
    /// Zero-padded "DD:HH:MM:SS"
    pub display: String,
    /// Session start on the viewer's 12-hour clock; empty when the zone is unknown
    pub local_time: String,
    /// IANA zone the local time was computed in
    pub time_zone: Option<String>,
    /// Friendly zone label, e.g. "UK Time"; empty when the zone is unknown
    pub time_zone_label: String,
    /// When this projection was computed (RFC 3339)
    pub generated_at: String,
}

/// Resolve and project the next session of `weekend`.
pub(crate) fn build_countdown(
    weekend: &RaceWeekend,
    zone: Option<Tz>,
    now: DateTime<Utc>,
) -> CountdownResponse {
    let session = resolve_next_session(weekend, now);
    let resolved = project(session.start, zone, now);
    CountdownResponse {
        season: weekend.season.clone(),
        round: weekend.round.clone(),
        race_name: weekend.race_name.clone(),
        circuit_name: weekend.circuit_name.clone(),
        session: SessionInfo {
            kind: session.kind,
            name: session.kind.display_name(),
            start_time: session.start.to_rfc3339(),
        },
        total_seconds: resolved.countdown.total_seconds(),
        started: resolved.countdown.is_zero(),
        display: resolved.countdown.display(),
        countdown: resolved.countdown,
        local_time: resolved.local_time_text,
        time_zone: zone.map(|tz| tz.name().to_string()),
        time_zone_label: resolved.time_zone_label,
        generated_at: now.to_rfc3339(),
    }
}

/// Caller address, preferring the first `X-Forwarded-For` hop.
fn viewer_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .unwrap_or_else(|| peer.ip())
}

/// Parse an explicit `tz` parameter. Blank counts as absent.
fn parse_tz_param(tz: Option<&str>) -> Result<Option<Tz>, AppError> {
    match tz.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name
            .parse::<Tz>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Unknown IANA time zone '{}'", name))),
        None => Ok(None),
    }
}

/// Where a request's viewer zone comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewerZone {
    /// Explicit `tz` parameter
    Explicit(Tz),
    /// Geolocated from the caller's address
    Geolocated(IpAddr),
}

impl ViewerZone {
    fn from_request(
        query: &CountdownQuery,
        headers: &HeaderMap,
        peer: SocketAddr,
    ) -> Result<Self, AppError> {
        Ok(match parse_tz_param(query.tz.as_deref())? {
            Some(tz) => ViewerZone::Explicit(tz),
            None => ViewerZone::Geolocated(viewer_ip(headers, peer)),
        })
    }

    async fn resolve(self, zones: &ZoneCache) -> Option<Tz> {
        match self {
            ViewerZone::Explicit(tz) => Some(tz),
            ViewerZone::Geolocated(ip) => zones.resolve(ip).await.map(|l| l.time_zone),
        }
    }

    /// Zone for the `tick`-th stream event. Unknown zones are looked up again
    /// every `ZONE_RETRY_TICKS` ticks, starting with the first.
    async fn for_tick(self, zones: &ZoneCache, tick: usize) -> Option<Tz> {
        match self {
            ViewerZone::Explicit(tz) => Some(tz),
            ViewerZone::Geolocated(ip) => match zones.cached(ip).await {
                Some(tz) => Some(tz),
                None if tick % ZONE_RETRY_TICKS == 0 => self.resolve(zones).await,
                None => None,
            },
        }
    }
}

/// Get the countdown to the next session.
#[utoipa::path(
    get,
    path = "/api/v1/countdown",
    tag = "Countdown",
    params(CountdownQuery),
    responses(
        (status = 200, description = "Countdown to the next session", body = CountdownResponse),
        (status = 400, description = "Unknown time zone", body = ErrorResponse),
        (status = 503, description = "Schedule not loaded yet", body = ErrorResponse),
    )
)]
pub async fn get_countdown(
    State(state): State<CountdownState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<CountdownQuery>,
) -> Result<Json<CountdownResponse>, AppError> {
    let viewer = ViewerZone::from_request(&query, &headers, peer)?;
    let weekend = state
        .schedule
        .read()
        .await
        .next_race
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("Schedule not available yet".to_string()))?;

    let zone = viewer.resolve(&state.zones).await;
    Ok(Json(build_countdown(&weekend, zone, Utc::now())))
}

/// Stream the countdown as server-sent events, one per second.
///
/// Emits `countdown` events while a schedule snapshot exists and `pending`
/// events while it doesn't. Local time and label stay blank until the
/// viewer's zone resolves. The stream ends when the client disconnects or
/// the server shuts down.
#[utoipa::path(
    get,
    path = "/api/v1/countdown/stream",
    tag = "Countdown",
    params(CountdownQuery),
    responses(
        (status = 200, description = "text/event-stream of CountdownResponse events"),
        (status = 400, description = "Unknown time zone", body = ErrorResponse),
    )
)]
pub async fn stream_countdown(
    State(state): State<CountdownState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<CountdownQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let viewer = ViewerZone::from_request(&query, &headers, peer)?;
    let schedule = state.schedule.clone();
    let zones = state.zones.clone();

    let stream = IntervalStream::new(tokio::time::interval(STREAM_TICK))
        .enumerate()
        .then(move |(tick, _)| {
            let schedule = schedule.clone();
            let zones = zones.clone();
            async move {
                let zone = viewer.for_tick(&zones, tick).await;
                let snapshot = schedule.read().await.next_race.clone();
                Ok::<_, Infallible>(tick_event(snapshot.as_ref(), zone, Utc::now()))
            }
        })
        .take_until(state.shutdown.clone().cancelled_owned());

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn tick_event(weekend: Option<&RaceWeekend>, zone: Option<Tz>, now: DateTime<Utc>) -> Event {
    match weekend {
        Some(w) => Event::default()
            .event("countdown")
            .json_data(build_countdown(w, zone, now))
            .unwrap_or_else(|e| {
                tracing::error!("Failed to serialize countdown event: {}", e);
                Event::default().event("error").data("serialization failed")
            }),
        None => Event::default()
            .event("pending")
            .data("Schedule not available yet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geo::GeoClient;
    use crate::services::poller::ScheduleState;
    use crate::services::session::tests::three_day_weekend;
    use axum::http::HeaderValue;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse::<DateTime<Utc>>().unwrap()
    }

    fn peer() -> SocketAddr {
        "10.0.0.5:51234".parse().unwrap()
    }

    #[test]
    fn test_build_countdown_next_qualifying() {
        let now = utc("2026-03-06T10:00:00Z");
        let resp = build_countdown(&three_day_weekend(), Some(chrono_tz::Europe::London), now);

        assert_eq!(resp.session.kind, SessionKind::Qualifying);
        assert_eq!(resp.session.name, "Qualifying");
        assert_eq!(resp.session.start_time, "2026-03-07T13:00:00+00:00");
        // 27 hours to go.
        assert_eq!(resp.display, "01:03:00:00");
        assert_eq!(resp.total_seconds, 27 * 3600);
        assert!(!resp.started);
        assert_eq!(resp.local_time, "1:00 PM");
        assert_eq!(resp.time_zone.as_deref(), Some("Europe/London"));
        assert_eq!(resp.time_zone_label, "UK Time");
    }

    #[test]
    fn test_build_countdown_after_weekend() {
        let now = utc("2026-03-09T00:00:00Z");
        let resp = build_countdown(&three_day_weekend(), None, now);
        assert_eq!(resp.session.kind, SessionKind::Race);
        assert_eq!(resp.display, "00:00:00:00");
        assert!(resp.started);
        assert!(resp.local_time.is_empty());
        assert!(resp.time_zone.is_none());
    }

    #[test]
    fn test_viewer_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("81.2.69.160, 10.0.0.1"),
        );
        assert_eq!(
            viewer_ip(&headers, peer()),
            "81.2.69.160".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_viewer_ip_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        assert_eq!(viewer_ip(&headers, peer()), peer().ip());
        assert_eq!(viewer_ip(&HeaderMap::new(), peer()), peer().ip());
    }

    #[test]
    fn test_parse_tz_param() {
        assert_eq!(
            parse_tz_param(Some("Asia/Tokyo")).unwrap(),
            Some(chrono_tz::Asia::Tokyo)
        );
        assert_eq!(parse_tz_param(Some("  ")).unwrap(), None);
        assert_eq!(parse_tz_param(None).unwrap(), None);
        assert!(matches!(
            parse_tz_param(Some("Eastern Standard Time")),
            Err(AppError::BadRequest(_))
        ));
    }

    fn countdown_state(geo_base: &str, next_race: Option<RaceWeekend>) -> CountdownState {
        let mut schedule = ScheduleState::new(Duration::from_secs(30));
        schedule.next_race = next_race;
        CountdownState {
            schedule: Arc::new(RwLock::new(schedule)),
            zones: ZoneCache::new(GeoClient::new(geo_base, "test-agent")),
            shutdown: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_get_countdown_without_snapshot_skips_geolocation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "timezone": "Europe/London"
            })))
            .expect(0)
            .mount(&server)
            .await;

        let result = get_countdown(
            State(countdown_state(&server.uri(), None)),
            ConnectInfo(peer()),
            HeaderMap::new(),
            Query(CountdownQuery { tz: None }),
        )
        .await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_get_countdown_with_explicit_zone() {
        let server = MockServer::start().await;
        let result = get_countdown(
            State(countdown_state(&server.uri(), Some(three_day_weekend()))),
            ConnectInfo(peer()),
            HeaderMap::new(),
            Query(CountdownQuery {
                tz: Some("Asia/Tokyo".to_string()),
            }),
        )
        .await;
        let Json(resp) = result.unwrap();
        assert_eq!(resp.time_zone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(resp.time_zone_label, "Japan Time");
    }

    #[tokio::test]
    async fn test_get_countdown_rejects_bad_zone_before_snapshot_check() {
        let server = MockServer::start().await;
        let result = get_countdown(
            State(countdown_state(&server.uri(), None)),
            ConnectInfo(peer()),
            HeaderMap::new(),
            Query(CountdownQuery {
                tz: Some("Not/AZone".to_string()),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_tick_event_pending_without_snapshot() {
        let event = format!("{:?}", tick_event(None, None, utc("2026-03-06T10:00:00Z")));
        assert!(event.contains("event: pending"), "{}", event);
        assert!(event.contains("Schedule not available yet"), "{}", event);
    }

    #[test]
    fn test_tick_event_countdown_with_snapshot() {
        let weekend = three_day_weekend();
        let event = format!(
            "{:?}",
            tick_event(
                Some(&weekend),
                Some(chrono_tz::Europe::London),
                utc("2026-03-06T10:00:00Z")
            )
        );
        assert!(event.contains("event: countdown"), "{}", event);
        assert!(event.contains("01:03:00:00"), "{}", event);
        assert!(event.contains("UK Time"), "{}", event);
    }

    #[tokio::test]
    async fn test_stream_zone_retries_after_failed_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/81.2.69.160/json/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/81.2.69.160/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "timezone": "Europe/London"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let zones = ZoneCache::new(GeoClient::new(&server.uri(), "test-agent"));
        let viewer = ViewerZone::Geolocated("81.2.69.160".parse().unwrap());

        // First tick looks up and fails; ticks before the next retry stay blank
        // without querying upstream.
        assert_eq!(viewer.for_tick(&zones, 0).await, None);
        assert_eq!(viewer.for_tick(&zones, 1).await, None);
        assert_eq!(viewer.for_tick(&zones, ZONE_RETRY_TICKS - 1).await, None);

        // The retry succeeds, and later ticks are served from the cache.
        assert_eq!(
            viewer.for_tick(&zones, ZONE_RETRY_TICKS).await,
            Some(chrono_tz::Europe::London)
        );
        assert_eq!(
            viewer.for_tick(&zones, ZONE_RETRY_TICKS + 1).await,
            Some(chrono_tz::Europe::London)
        );
    }

    #[tokio::test]
    async fn test_explicit_zone_never_geolocates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(0)
            .mount(&server)
            .await;

        let zones = ZoneCache::new(GeoClient::new(&server.uri(), "test-agent"));
        let viewer = ViewerZone::Explicit(chrono_tz::Asia::Tokyo);
        assert_eq!(viewer.for_tick(&zones, 0).await, Some(chrono_tz::Asia::Tokyo));
        assert_eq!(viewer.resolve(&zones).await, Some(chrono_tz::Asia::Tokyo));
    }
}
