//! Auditra retention worker runtime.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use auditra_application::{AuthorizationService, RetentionService};
use auditra_core::{AppError, AppResult};
use auditra_infrastructure::{PostgresAuthorizationRepository, PostgresEventStore};

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    cleanup_interval_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let retention_service = build_retention_service(pool);

    info!(
        cleanup_interval_seconds = config.cleanup_interval_seconds,
        "auditra-worker started"
    );

    loop {
        match retention_service.run_scheduled_cleanup().await {
            Ok(report) => {
                info!(
                    scanned = report.scanned,
                    compressed = report.compressed,
                    deleted = report.deleted,
                    batches = report.batches,
                    duration_ms = report.duration_ms(),
                    "retention cleanup completed"
                );
            }
            Err(error) => {
                warn!(error = %error, "retention cleanup failed");
            }
        }

        tokio::time::sleep(Duration::from_secs(config.cleanup_interval_seconds)).await;
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_retention_service(pool: PgPool) -> RetentionService {
    let event_store = Arc::new(PostgresEventStore::new(pool.clone()));
    let authorization_repository = Arc::new(PostgresAuthorizationRepository::new(pool));
    let authorization_service = AuthorizationService::new(authorization_repository);

    RetentionService::new(event_store, authorization_service)
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        // Weekly by default, matching the scheduled retention cadence.
        let cleanup_interval_seconds =
            parse_env_u64("CLEANUP_INTERVAL_SECONDS", 7 * 24 * 60 * 60)?;

        if cleanup_interval_seconds == 0 {
            return Err(AppError::Validation(
                "CLEANUP_INTERVAL_SECONDS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            cleanup_interval_seconds,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
