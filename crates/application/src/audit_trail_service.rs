use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use auditra_core::{AppResult, NonEmptyString, UserIdentity};
use auditra_domain::{AuditEvent, EventDetails, NewAuditEventInput, Permission};

use crate::authorization_service::AuthorizationService;
use crate::event_store::AuditEventStore;

/// Input payload for recording one audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEventRequest {
    /// Action identifier from the known vocabulary.
    pub action: NonEmptyString,
    /// Entity acted upon, if any.
    pub target_id: Option<String>,
    /// Structured detail payload; null values are stripped.
    pub details: EventDetails,
}

/// Application service for the write-time audit trail.
///
/// Every recorded event passes through the tier classifier here, so the
/// retention and statistics services can rely on `retention_tier` and the
/// lifecycle deadlines being present on every record.
#[derive(Clone)]
pub struct AuditTrailService {
    store: Arc<dyn AuditEventStore>,
    authorization_service: AuthorizationService,
}

impl AuditTrailService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(store: Arc<dyn AuditEventStore>, authorization_service: AuthorizationService) -> Self {
        Self {
            store,
            authorization_service,
        }
    }

    /// Classifies and appends an event on behalf of an authenticated actor.
    pub async fn record_event(
        &self,
        actor: &UserIdentity,
        request: RecordEventRequest,
    ) -> AppResult<Uuid> {
        self.authorization_service
            .require_permission(actor.subject(), Permission::AuditEventRecord)
            .await?;

        self.record_at(
            NewAuditEventInput {
                action: request.action.into(),
                actor_id: actor.subject().to_owned(),
                actor_email: actor.email().map(str::to_owned),
                target_id: request.target_id,
                details: request.details,
            },
            Utc::now(),
        )
        .await
    }

    pub(crate) async fn record_at(
        &self,
        input: NewAuditEventInput,
        now: DateTime<Utc>,
    ) -> AppResult<Uuid> {
        self.store.append(AuditEvent::record(input, now)).await
    }
}
