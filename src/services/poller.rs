//! Background refresh of the upcoming race weekend.
//!
//! Pulls `current/next.json` on a fixed period and publishes the validated
//! weekend into shared state, which the countdown routes read.
//!
//! - The first refresh runs immediately at startup
//! - A failed refresh keeps the previous snapshot; the next tick retries
//! - An empty `Races` list (season over) clears the snapshot
//! - The loop exits when the shutdown token is cancelled, including mid-request

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::services::ergast::ErgastClient;
use crate::services::session::RaceWeekend;

// ---------------------------------------------------------------------------
// Poller state (in-memory, shared via Arc<RwLock<>>)
// ---------------------------------------------------------------------------

/// Poller health, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PollerStatus {
    pub active: bool,
    pub refresh_interval_secs: u64,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub next_refresh_at: Option<DateTime<Utc>>,
    /// "pending", "updated", "season_over", or "error: ..."
    pub last_result: String,
    pub total_refreshes: u64,
    pub total_failures: u64,
}

/// Latest schedule snapshot plus poller status.
#[derive(Debug, Clone)]
pub struct ScheduleState {
    pub next_race: Option<RaceWeekend>,
    pub status: PollerStatus,
}

impl ScheduleState {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            next_race: None,
            status: PollerStatus {
                active: true,
                refresh_interval_secs: refresh_interval.as_secs(),
                last_refresh_at: None,
                last_success_at: None,
                next_refresh_at: None,
                last_result: "pending".to_string(),
                total_refreshes: 0,
                total_failures: 0,
            },
        }
    }
}

/// Shared schedule state handle.
pub type SharedScheduleState = Arc<RwLock<ScheduleState>>;

enum RefreshOutcome {
    Updated(RaceWeekend),
    SeasonOver,
    Failed(String),
}

// ---------------------------------------------------------------------------
// Main poller loop
// ---------------------------------------------------------------------------

/// Run the schedule poller until `cancel` fires.
///
/// Should be spawned via `tokio::spawn(run_schedule_poller(...))`.
pub async fn run_schedule_poller(
    client: ErgastClient,
    state: SharedScheduleState,
    period: Duration,
    cancel: CancellationToken,
) {
    tracing::info!("Schedule poller started (every {}s)", period.as_secs());

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = fetch_next_weekend(&client) => outcome,
        };

        let mut s = state.write().await;
        apply_refresh(&mut s, outcome, Utc::now(), period);
    }

    state.write().await.status.active = false;
    tracing::info!("Schedule poller stopped");
}

async fn fetch_next_weekend(client: &ErgastClient) -> RefreshOutcome {
    match client.next_race().await {
        Ok(Some(race)) => match RaceWeekend::try_from(race) {
            Ok(weekend) => RefreshOutcome::Updated(weekend),
            Err(e) => RefreshOutcome::Failed(e.to_string()),
        },
        Ok(None) => RefreshOutcome::SeasonOver,
        Err(e) => RefreshOutcome::Failed(e.to_string()),
    }
}

/// Fold one refresh outcome into the shared state.
fn apply_refresh(
    state: &mut ScheduleState,
    outcome: RefreshOutcome,
    now: DateTime<Utc>,
    period: Duration,
) {
    let status = &mut state.status;
    status.total_refreshes += 1;
    status.last_refresh_at = Some(now);
    status.next_refresh_at = chrono::Duration::from_std(period)
        .ok()
        .map(|p| now + p);

    match outcome {
        RefreshOutcome::Updated(weekend) => {
            if state.next_race.as_ref() != Some(&weekend) {
                tracing::info!(
                    "Schedule poller: next race is {} (round {}, {})",
                    weekend.race_name,
                    weekend.round,
                    weekend.season
                );
            }
            state.next_race = Some(weekend);
            status.last_success_at = Some(now);
            status.last_result = "updated".to_string();
        }
        RefreshOutcome::SeasonOver => {
            if state.next_race.is_some() {
                tracing::info!("Schedule poller: no upcoming race, season is over");
            }
            state.next_race = None;
            status.last_success_at = Some(now);
            status.last_result = "season_over".to_string();
        }
        RefreshOutcome::Failed(msg) => {
            tracing::warn!("Schedule poller: refresh failed, keeping last snapshot: {}", msg);
            status.total_failures += 1;
            status.last_result = format!("error: {}", msg);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ergast::tests::next_race_json;
    use crate::services::session::tests::three_day_weekend;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap()
    }

    #[test]
    fn test_new_state_is_pending() {
        let s = ScheduleState::new(Duration::from_secs(30));
        assert!(s.next_race.is_none());
        assert!(s.status.active);
        assert_eq!(s.status.last_result, "pending");
        assert_eq!(s.status.refresh_interval_secs, 30);
    }

    #[test]
    fn test_apply_updated() {
        let mut s = ScheduleState::new(Duration::from_secs(30));
        apply_refresh(
            &mut s,
            RefreshOutcome::Updated(three_day_weekend()),
            now(),
            Duration::from_secs(30),
        );
        assert_eq!(s.next_race, Some(three_day_weekend()));
        assert_eq!(s.status.last_result, "updated");
        assert_eq!(s.status.last_success_at, Some(now()));
        assert_eq!(
            s.status.next_refresh_at,
            Some(now() + chrono::Duration::seconds(30))
        );
        assert_eq!(s.status.total_refreshes, 1);
    }

    #[test]
    fn test_apply_failure_keeps_snapshot() {
        let mut s = ScheduleState::new(Duration::from_secs(30));
        apply_refresh(
            &mut s,
            RefreshOutcome::Updated(three_day_weekend()),
            now(),
            Duration::from_secs(30),
        );
        apply_refresh(
            &mut s,
            RefreshOutcome::Failed("F1 API returned HTTP 502".to_string()),
            now() + chrono::Duration::seconds(30),
            Duration::from_secs(30),
        );
        assert_eq!(s.next_race, Some(three_day_weekend()));
        assert_eq!(s.status.last_result, "error: F1 API returned HTTP 502");
        assert_eq!(s.status.last_success_at, Some(now()));
        assert_eq!(s.status.total_refreshes, 2);
        assert_eq!(s.status.total_failures, 1);
    }

    #[test]
    fn test_apply_season_over_clears_snapshot() {
        let mut s = ScheduleState::new(Duration::from_secs(30));
        apply_refresh(
            &mut s,
            RefreshOutcome::Updated(three_day_weekend()),
            now(),
            Duration::from_secs(30),
        );
        apply_refresh(&mut s, RefreshOutcome::SeasonOver, now(), Duration::from_secs(30));
        assert!(s.next_race.is_none());
        assert_eq!(s.status.last_result, "season_over");
    }

    #[tokio::test]
    async fn test_poller_publishes_and_stops_on_cancel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/current/next.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(next_race_json()))
            .mount(&server)
            .await;

        let period = Duration::from_secs(3600);
        let state: SharedScheduleState = Arc::new(RwLock::new(ScheduleState::new(period)));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_schedule_poller(
            ErgastClient::new(&server.uri(), "test-agent"),
            state.clone(),
            period,
            cancel.clone(),
        ));

        let published = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if state.read().await.next_race.is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(published.is_ok(), "poller never published a snapshot");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poller did not stop after cancel")
            .expect("poller task panicked");

        let s = state.read().await;
        assert!(!s.status.active);
        assert_eq!(
            s.next_race.as_ref().map(|w| w.race_name.as_str()),
            Some("United States Grand Prix")
        );
    }
}
