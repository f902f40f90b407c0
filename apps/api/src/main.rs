//! Auditra API composition root.

#![forbid(unsafe_code)]

mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auditra_application::{
    AuditTrailService, AuthorizationService, RetentionService, StatisticsService, ThrottleRule,
    ThrottleService,
};
use auditra_core::AppError;
use auditra_infrastructure::{
    InMemoryThrottleRepository, PostgresAuthorizationRepository, PostgresEventStore,
};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let event_store = Arc::new(PostgresEventStore::new(pool.clone()));
    let authorization_repository = Arc::new(PostgresAuthorizationRepository::new(pool.clone()));
    let authorization_service = AuthorizationService::new(authorization_repository);
    let throttle_service = ThrottleService::new(Arc::new(InMemoryThrottleRepository::new()));

    let app_state = AppState {
        audit_trail_service: AuditTrailService::new(
            event_store.clone(),
            authorization_service.clone(),
        ),
        retention_service: RetentionService::new(
            event_store.clone(),
            authorization_service.clone(),
        ),
        statistics_service: StatisticsService::new(event_store, authorization_service),
        throttle_service,
    };

    // Hourly prune of idle throttle windows.
    let throttle_pruner = app_state.throttle_service.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60 * 60)).await;
            if let Err(error) = throttle_pruner.cleanup().await {
                warn!(error = %error, "throttle state cleanup failed");
            }
        }
    });

    // Manual cleanup: 5 runs per actor per hour.
    let cleanup_throttle_rule = ThrottleRule::new("retention_cleanup", 5, 60 * 60);

    let cleanup_routes = Router::new()
        .route(
            "/api/retention/cleanup",
            post(handlers::retention::run_manual_cleanup_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::throttle))
        .layer(axum::Extension(cleanup_throttle_rule));

    let protected_routes = Router::new()
        .route(
            "/api/audit/events",
            post(handlers::audit::record_audit_event_handler),
        )
        .route(
            "/api/audit/analytics",
            get(handlers::statistics::audit_analytics_handler),
        )
        .route(
            "/api/retention/stats",
            get(handlers::statistics::retention_stats_handler),
        )
        .merge(cleanup_routes)
        .route_layer(from_fn(middleware::require_identity));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "auditra-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
