use std::str::FromStr;

use auditra_core::AppError;
use serde::{Deserialize, Serialize};

/// Permissions enforced by application policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows reading audit statistics and retention reports.
    SecurityAuditRead,
    /// Allows triggering a manual retention cleanup run.
    SecurityRetentionRun,
    /// Allows recording audit events on behalf of application workflows.
    AuditEventRecord,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityAuditRead => "security.audit.read",
            Self::SecurityRetentionRun => "security.retention.run",
            Self::AuditEventRecord => "audit.event.record",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::SecurityAuditRead,
            Permission::SecurityRetentionRun,
            Permission::AuditEventRecord,
        ];

        ALL
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "security.audit.read" => Ok(Self::SecurityAuditRead),
            "security.retention.run" => Ok(Self::SecurityRetentionRun),
            "audit.event.record" => Ok(Self::AuditEventRecord),
            _ => Err(AppError::Validation(format!(
                "unknown permission value '{value}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::Permission;

    #[test]
    fn permission_roundtrip_storage_value() {
        for permission in Permission::all() {
            let restored = Permission::from_str(permission.as_str());
            assert_eq!(
                restored.unwrap_or(Permission::SecurityAuditRead),
                *permission
            );
        }
    }

    #[test]
    fn unknown_permission_is_rejected() {
        let parsed = Permission::from_str("security.audit.unknown");
        assert!(parsed.is_err());
    }
}
