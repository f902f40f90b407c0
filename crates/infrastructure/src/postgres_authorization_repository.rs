use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;

use auditra_application::AuthorizationRepository;
use auditra_core::{AppError, AppResult};
use auditra_domain::Permission;

/// PostgreSQL-backed permission lookup over the `subject_permissions` table.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_permissions_for_subject(&self, subject: &str) -> AppResult<Vec<Permission>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT permission FROM subject_permissions WHERE subject = $1")
                .bind(subject)
                .fetch_all(&self.pool)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to load subject permissions: {error}"))
                })?;

        rows.iter()
            .map(|permission| {
                Permission::from_str(permission).map_err(|error| {
                    AppError::Internal(format!(
                        "subject '{subject}' carries an unknown permission: {error}"
                    ))
                })
            })
            .collect()
    }
}
