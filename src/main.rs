// Paddock API v0.1
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use routes::countdown::CountdownState;
use services::ergast::ErgastClient;
use services::geo::{GeoClient, ZoneCache};
use services::poller::{ScheduleState, SharedScheduleState};

/// Paddock API OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Paddock API",
        version = "0.1.0",
        description = "Formula 1 dashboard API. Resolves the next session of the upcoming \
            race weekend, projects its countdown into the viewer's local time zone, and \
            serves season calendars, championship standings and race results from the \
            Jolpica/Ergast feed.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Countdown", description = "Next-session countdown in the viewer's time zone"),
        (name = "Races", description = "Upcoming weekend and season calendar"),
        (name = "Standings", description = "Driver and constructor championships"),
        (name = "Results", description = "Race results, position changes and lap times"),
        (name = "Analysis", description = "Season analysis of drivers and constructors"),
        (name = "Assets", description = "Driver and constructor image lookups"),
        (name = "Poller", description = "Background schedule poller status"),
    ),
    paths(
        routes::health::health_check,
        routes::countdown::get_countdown,
        routes::countdown::stream_countdown,
        routes::races::get_next_race,
        routes::races::get_schedule,
        routes::standings::get_standings,
        routes::standings::get_driver_standings,
        routes::standings::get_constructor_standings,
        routes::results::get_last_results,
        routes::results::get_round_results,
        routes::results::get_lap_timings,
        routes::analysis::get_driver_analysis,
        routes::analysis::get_constructor_analysis,
        routes::analysis::get_head_to_head,
        routes::analysis::get_driver_points_progression,
        routes::analysis::get_constructor_points_progression,
        routes::assets::get_driver_asset,
        routes::assets::get_constructor_asset,
        routes::poller::get_poller_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::countdown::SessionInfo,
            routes::countdown::CountdownResponse,
            services::countdown::Countdown,
            services::session::SessionKind,
            routes::races::SessionEntry,
            routes::races::RaceWeekendResponse,
            routes::standings::DriverStandingResponse,
            routes::standings::ConstructorStandingResponse,
            routes::standings::StandingsResponse,
            routes::results::ResultEntry,
            routes::results::RaceResultsResponse,
            services::results::PositionChange,
            routes::results::LapTimingEntry,
            routes::results::LapResponse,
            routes::analysis::DriverAnalysisResponse,
            routes::analysis::ConstructorAnalysisResponse,
            routes::analysis::ComparedDriver,
            routes::analysis::HeadToHeadResponse,
            routes::analysis::ProgressionResponse,
            services::results::DriverRaceOutcome,
            services::results::PositionCount,
            services::results::FinishBuckets,
            services::results::ReasonCount,
            services::results::Reliability,
            services::results::ConstructorRaceSummary,
            services::results::PointsBucket,
            services::results::DriverPosition,
            services::results::HeadToHeadRow,
            services::results::ProgressionSeries,
            services::results::PointsProgression,
            routes::assets::DriverAssetResponse,
            routes::assets::ConstructorAssetResponse,
            services::poller::PollerStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paddock_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Upstream clients
    let ergast = ErgastClient::new(&config.f1_api_base_url, &config.user_agent);
    let zones = ZoneCache::new(GeoClient::new(&config.geo_api_base_url, &config.user_agent));

    // Shared schedule snapshot and background poller
    let refresh = Duration::from_secs(config.schedule_refresh_secs);
    let schedule: SharedScheduleState = Arc::new(RwLock::new(ScheduleState::new(refresh)));
    let shutdown = CancellationToken::new();
    let poller = tokio::spawn(services::poller::run_schedule_poller(
        ergast.clone(),
        schedule.clone(),
        refresh,
        shutdown.clone(),
    ));

    // CORS: read-only API, restrict methods to GET
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    // Countdown routes read the snapshot and geolocate viewers.
    let countdown_routes = Router::new()
        .route("/api/v1/countdown", get(routes::countdown::get_countdown))
        .route(
            "/api/v1/countdown/stream",
            get(routes::countdown::stream_countdown),
        )
        .with_state(CountdownState {
            schedule: schedule.clone(),
            zones,
            shutdown: shutdown.clone(),
        });

    // Feed-backed routes call the F1 API on demand.
    let feed_routes = Router::new()
        .route("/api/v1/schedule", get(routes::races::get_schedule))
        .route("/api/v1/standings", get(routes::standings::get_standings))
        .route(
            "/api/v1/standings/drivers",
            get(routes::standings::get_driver_standings),
        )
        .route(
            "/api/v1/standings/constructors",
            get(routes::standings::get_constructor_standings),
        )
        .route("/api/v1/results/last", get(routes::results::get_last_results))
        .route(
            "/api/v1/results/:season/:round",
            get(routes::results::get_round_results),
        )
        .route(
            "/api/v1/results/:season/:round/laps/:lap",
            get(routes::results::get_lap_timings),
        )
        .route(
            "/api/v1/analysis/drivers/:driver_id",
            get(routes::analysis::get_driver_analysis),
        )
        .route(
            "/api/v1/analysis/constructors/:constructor_id",
            get(routes::analysis::get_constructor_analysis),
        )
        .route(
            "/api/v1/analysis/head-to-head",
            get(routes::analysis::get_head_to_head),
        )
        .route(
            "/api/v1/analysis/points-progression/drivers",
            get(routes::analysis::get_driver_points_progression),
        )
        .route(
            "/api/v1/analysis/points-progression/constructors",
            get(routes::analysis::get_constructor_points_progression),
        )
        .with_state(ergast);

    // Snapshot routes only read the poller state.
    let snapshot_routes = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/races/next", get(routes::races::get_next_race))
        .route(
            "/api/v1/poller/status",
            get(routes::poller::get_poller_status),
        )
        .with_state(schedule);

    let asset_routes = Router::new()
        .route(
            "/api/v1/assets/drivers/:driver_id",
            get(routes::assets::get_driver_asset),
        )
        .route(
            "/api/v1/assets/constructors/:constructor_id",
            get(routes::assets::get_constructor_asset),
        );

    let app = Router::new()
        .merge(snapshot_routes)
        .merge(countdown_routes)
        .merge(feed_routes)
        .merge(asset_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown))
    .await
    .expect("Server terminated unexpectedly");

    if let Err(e) = poller.await {
        tracing::error!("Schedule poller task failed: {}", e);
    }
    tracing::info!("Shutdown complete");
}

/// Resolve on Ctrl+C or SIGTERM, cancelling background work.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
