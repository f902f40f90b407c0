use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use auditra_core::AppError;

/// Number of days every event keeps its full detail payload before the
/// compression scan considers it, regardless of tier.
pub const FULL_DETAIL_RETENTION_DAYS: i64 = 90;

/// Tiers whose events are rewritten to the compressed projection once they
/// age past the full-detail window. Compliance keeps full detail by policy;
/// operational events expire before compression would pay off.
pub const COMPRESSIBLE_TIERS: [RetentionTier; 2] =
    [RetentionTier::Standard, RetentionTier::Security];

/// Actions that always land in the compliance tier, regardless of wording.
const COMPLIANCE_ACTIONS: &[&str] = &[
    "user_deleted",
    "user_role_changed",
    "permission_granted",
    "permission_revoked",
    "data_exported",
    "bulk_operation_executed",
    "system_settings_changed",
];

/// Substrings that route an action into the security tier.
const SECURITY_MARKERS: &[&str] = &["security", "unauthorized", "failed"];

/// Automated system actions kept only for short-term operational review.
const SYSTEM_ACTIONS: &[&str] = &[
    "retention_cleanup",
    "health_check",
    "backup_created",
    "function_executed",
];

/// Retention bucket assigned to every audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionTier {
    /// Severe security and identity events, retained seven years, never deleted.
    Compliance,
    /// Security-relevant events, retained two years.
    Security,
    /// Default tier for ordinary user activity, retained one year.
    Standard,
    /// Automated system events, retained three months.
    Operational,
    /// Pseudo-tier for records already reduced to the compressed projection.
    Compressed,
}

impl RetentionTier {
    /// Returns a stable storage value for this tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliance => "compliance",
            Self::Security => "security",
            Self::Standard => "standard",
            Self::Operational => "operational",
            Self::Compressed => "compressed",
        }
    }

    /// Returns the retention policy for this tier.
    ///
    /// The `compressed` pseudo-tier carries no policy of its own; a compressed
    /// record ages out under its originating tier's policy.
    #[must_use]
    pub fn policy(&self) -> Option<&'static RetentionPolicy> {
        RETENTION_POLICIES
            .iter()
            .find(|policy| policy.tier == *self)
    }

    /// Returns all tiers holding full-detail records.
    #[must_use]
    pub fn active_tiers() -> &'static [Self] {
        const ACTIVE: &[RetentionTier] = &[
            RetentionTier::Compliance,
            RetentionTier::Security,
            RetentionTier::Standard,
            RetentionTier::Operational,
        ];

        ACTIVE
    }

    /// Returns every tier value, including the compressed pseudo-tier.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[RetentionTier] = &[
            RetentionTier::Compliance,
            RetentionTier::Security,
            RetentionTier::Standard,
            RetentionTier::Operational,
            RetentionTier::Compressed,
        ];

        ALL
    }
}

impl FromStr for RetentionTier {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "compliance" => Ok(Self::Compliance),
            "security" => Ok(Self::Security),
            "standard" => Ok(Self::Standard),
            "operational" => Ok(Self::Operational),
            "compressed" => Ok(Self::Compressed),
            _ => Err(AppError::Validation(format!(
                "unknown retention tier value '{value}'"
            ))),
        }
    }
}

/// Static retention policy attached to a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Tier this policy governs.
    pub tier: RetentionTier,
    /// Days before an event becomes eligible for deletion.
    pub retention_days: i64,
    /// Days before an event becomes eligible for compression.
    pub compression_days: i64,
    /// Processing priority, lower runs first.
    pub priority: u8,
    /// Whether the deletion stage may ever remove events in this tier.
    pub auto_delete: bool,
}

/// Policy table for the four active tiers, ordered by priority.
pub const RETENTION_POLICIES: [RetentionPolicy; 4] = [
    RetentionPolicy {
        tier: RetentionTier::Compliance,
        retention_days: 2555,
        compression_days: 365,
        priority: 1,
        auto_delete: false,
    },
    RetentionPolicy {
        tier: RetentionTier::Security,
        retention_days: 730,
        compression_days: 180,
        priority: 2,
        auto_delete: true,
    },
    RetentionPolicy {
        tier: RetentionTier::Standard,
        retention_days: 365,
        compression_days: 90,
        priority: 3,
        auto_delete: true,
    },
    RetentionPolicy {
        tier: RetentionTier::Operational,
        retention_days: 90,
        compression_days: 30,
        priority: 4,
        auto_delete: true,
    },
];

/// Tier and lifecycle deadlines assigned to an event at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierAssignment {
    /// Assigned retention tier.
    pub tier: RetentionTier,
    /// Absolute timestamp after which the event may be compressed.
    pub compress_after: DateTime<Utc>,
    /// Absolute timestamp after which the event may be deleted.
    pub delete_after: DateTime<Utc>,
}

/// Maps an action name to its retention tier and lifecycle deadlines.
///
/// Rules apply in order, first match wins: the compliance action list, then
/// security markers anywhere in the action name, then the system action list,
/// then the standard tier. Deadlines are fixed here and never recalculated.
#[must_use]
pub fn classify(action: &str, now: DateTime<Utc>) -> TierAssignment {
    let tier = tier_for_action(action);
    let policy = match tier.policy() {
        Some(policy) => policy,
        // Unreachable: tier_for_action never yields the compressed pseudo-tier.
        None => &RETENTION_POLICIES[2],
    };

    TierAssignment {
        tier,
        compress_after: now + Duration::days(policy.compression_days),
        delete_after: now + Duration::days(policy.retention_days),
    }
}

fn tier_for_action(action: &str) -> RetentionTier {
    if COMPLIANCE_ACTIONS.contains(&action) {
        return RetentionTier::Compliance;
    }

    if SECURITY_MARKERS
        .iter()
        .any(|marker| action.contains(marker))
    {
        return RetentionTier::Security;
    }

    if SYSTEM_ACTIONS.contains(&action) {
        return RetentionTier::Operational;
    }

    RetentionTier::Standard
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use proptest::prelude::*;

    use super::{COMPLIANCE_ACTIONS, RETENTION_POLICIES, RetentionTier, classify};

    #[test]
    fn compliance_actions_always_classify_as_compliance() {
        let now = Utc::now();
        for action in COMPLIANCE_ACTIONS {
            assert_eq!(classify(action, now).tier, RetentionTier::Compliance);
        }
    }

    #[test]
    fn security_markers_classify_as_security() {
        let now = Utc::now();
        assert_eq!(
            classify("security_alert", now).tier,
            RetentionTier::Security
        );
        assert_eq!(
            classify("unauthorized_access", now).tier,
            RetentionTier::Security
        );
        assert_eq!(classify("login_failed", now).tier, RetentionTier::Security);
    }

    #[test]
    fn system_actions_classify_as_operational() {
        let now = Utc::now();
        assert_eq!(
            classify("retention_cleanup", now).tier,
            RetentionTier::Operational
        );
        assert_eq!(
            classify("health_check", now).tier,
            RetentionTier::Operational
        );
    }

    #[test]
    fn cleanup_failure_marker_outranks_system_list() {
        // Ordered rules: the "failed" marker is checked before the system
        // action list, so a failed cleanup summary lands in the security tier.
        let now = Utc::now();
        assert_eq!(
            classify("retention_cleanup_failed", now).tier,
            RetentionTier::Security
        );
    }

    #[test]
    fn unknown_actions_default_to_standard() {
        let now = Utc::now();
        assert_eq!(classify("user_login", now).tier, RetentionTier::Standard);
        assert_eq!(
            classify("project_created", now).tier,
            RetentionTier::Standard
        );
    }

    #[test]
    fn every_policy_compresses_before_it_deletes() {
        for policy in &RETENTION_POLICIES {
            assert!(policy.compression_days <= policy.retention_days);
        }
    }

    #[test]
    fn compliance_policy_never_auto_deletes() {
        let policy = RetentionTier::Compliance.policy();
        assert!(matches!(policy, Some(policy) if !policy.auto_delete));
    }

    #[test]
    fn compressed_pseudo_tier_has_no_policy() {
        assert!(RetentionTier::Compressed.policy().is_none());
    }

    #[test]
    fn tier_roundtrip_storage_value() {
        for tier in RetentionTier::all() {
            let restored = RetentionTier::from_str(tier.as_str());
            assert_eq!(restored.unwrap_or(RetentionTier::Compressed), *tier);
        }
    }

    proptest! {
        #[test]
        fn classification_is_deterministic(action in "[a-z_]{1,40}") {
            let now = Utc::now();
            let first = classify(action.as_str(), now);
            let second = classify(action.as_str(), now);
            prop_assert_eq!(first.tier, second.tier);
            prop_assert_eq!(first.compress_after, second.compress_after);
            prop_assert_eq!(first.delete_after, second.delete_after);
        }

        #[test]
        fn compress_deadline_never_exceeds_delete_deadline(action in "\\PC{0,60}") {
            let now = Utc::now();
            let assignment = classify(action.as_str(), now);
            prop_assert!(assignment.compress_after <= assignment.delete_after);
            prop_assert!(assignment.tier != super::RetentionTier::Compressed);
        }
    }
}
