//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod event;
mod retention;
mod security;

pub use event::{AuditEvent, CompressionInfo, EventDetails, NewAuditEventInput};
pub use retention::{
    COMPRESSIBLE_TIERS, FULL_DETAIL_RETENTION_DAYS, RETENTION_POLICIES, RetentionPolicy,
    RetentionTier, TierAssignment, classify,
};
pub use security::Permission;
