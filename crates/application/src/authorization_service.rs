use std::sync::Arc;

use async_trait::async_trait;

use auditra_core::{AppError, AppResult};
use auditra_domain::Permission;

/// Repository port for permission lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Lists effective permissions for a subject.
    async fn list_permissions_for_subject(&self, subject: &str) -> AppResult<Vec<Permission>>;
}

/// Application service for authorization checks.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self { repository }
    }

    /// Ensures a subject holds the required permission.
    pub async fn require_permission(&self, subject: &str, permission: Permission) -> AppResult<()> {
        if self.has_permission(subject, permission).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "subject '{subject}' is missing permission '{}'",
            permission.as_str()
        )))
    }

    /// Returns whether the subject currently holds the permission.
    pub async fn has_permission(
        &self,
        subject: &str,
        permission: Permission,
    ) -> AppResult<bool> {
        let granted = self
            .repository
            .list_permissions_for_subject(subject)
            .await?;

        Ok(granted.contains(&permission))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;

    use auditra_core::{AppError, AppResult};
    use auditra_domain::Permission;

    use super::{AuthorizationRepository, AuthorizationService};

    struct FakeAuthorizationRepository {
        grants: HashMap<String, Vec<Permission>>,
    }

    #[async_trait]
    impl AuthorizationRepository for FakeAuthorizationRepository {
        async fn list_permissions_for_subject(
            &self,
            subject: &str,
        ) -> AppResult<Vec<Permission>> {
            Ok(self.grants.get(subject).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn missing_permission_is_forbidden() {
        let service = AuthorizationService::new(Arc::new(FakeAuthorizationRepository {
            grants: HashMap::new(),
        }));

        let result = service
            .require_permission("alice", Permission::SecurityRetentionRun)
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn granted_permission_passes() {
        let service = AuthorizationService::new(Arc::new(FakeAuthorizationRepository {
            grants: HashMap::from([(
                "alice".to_owned(),
                vec![Permission::SecurityAuditRead],
            )]),
        }));

        let result = service
            .require_permission("alice", Permission::SecurityAuditRead)
            .await;

        assert!(result.is_ok());
    }
}
