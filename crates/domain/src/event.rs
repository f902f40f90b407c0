use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::retention::{RetentionTier, TierAssignment, classify};

/// Arbitrary structured payload attached to an audit event.
///
/// Null values are stripped at construction so the stored payload never
/// carries `null` entries, matching the document-store write contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventDetails(Map<String, Value>);

impl EventDetails {
    /// Creates a detail payload, dropping entries whose value is null.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self(
            values
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect(),
        )
    }

    /// Creates an empty detail payload.
    #[must_use]
    pub fn empty() -> Self {
        Self(Map::new())
    }

    /// Returns whether the payload carries no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for EventDetails {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

/// Metadata recorded when an event is rewritten to its compressed projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionInfo {
    /// When the compression stage rewrote the record.
    pub compressed_at: DateTime<Utc>,
    /// Serialized byte length of the record before compression.
    pub original_size: u64,
    /// Tier the record belonged to before compression.
    pub compressed_from: RetentionTier,
}

/// Input for recording a new audit event, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEventInput {
    /// Action identifier from the known vocabulary.
    pub action: String,
    /// Subject who performed the action, or `"system"`.
    pub actor_id: String,
    /// Email of the actor, if known.
    pub actor_email: Option<String>,
    /// Entity acted upon, if any.
    pub target_id: Option<String>,
    /// Structured detail payload.
    pub details: EventDetails,
}

/// One audit event record.
///
/// Append-only: after the initial write the only permitted mutations are the
/// transition to the compressed projection and permanent removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Action identifier.
    pub action: String,
    /// Subject who performed the action, or `"system"`.
    pub actor_id: String,
    /// Email of the actor, if known. Dropped by compression.
    pub actor_email: Option<String>,
    /// Entity acted upon, if any.
    pub target_id: Option<String>,
    /// Structured detail payload. Dropped by compression.
    pub details: EventDetails,
    /// Write timestamp, set once and never mutated.
    pub recorded_at: DateTime<Utc>,
    /// Current retention tier. Transitions only to `compressed`.
    pub retention_tier: RetentionTier,
    /// Compression deadline fixed at write time.
    pub compress_after: DateTime<Utc>,
    /// Deletion deadline fixed at write time.
    pub delete_after: DateTime<Utc>,
    /// Present once the record has been compressed.
    pub compression: Option<CompressionInfo>,
}

impl AuditEvent {
    /// Builds a classified event from recording input at the given write time.
    #[must_use]
    pub fn record(input: NewAuditEventInput, now: DateTime<Utc>) -> Self {
        let TierAssignment {
            tier,
            compress_after,
            delete_after,
        } = classify(input.action.as_str(), now);

        Self {
            action: input.action,
            actor_id: input.actor_id,
            actor_email: input.actor_email,
            target_id: input.target_id,
            details: input.details,
            recorded_at: now,
            retention_tier: tier,
            compress_after,
            delete_after,
            compression: None,
        }
    }

    /// Returns the serialized byte length of this record.
    #[must_use]
    pub fn serialized_size(&self) -> u64 {
        serde_json::to_vec(self)
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(0)
    }

    /// Rewrites this event to its compressed projection.
    ///
    /// Keeps action, actor, target and timestamp; drops the email and detail
    /// payload; records the originating tier and pre-compression size. The
    /// write-time deadlines are left as written, the deletion stage derives
    /// its cutoff from the originating tier's policy instead.
    #[must_use]
    pub fn into_compressed(self, now: DateTime<Utc>) -> Self {
        let original_size = self.serialized_size();
        let compressed_from = self.retention_tier;

        Self {
            actor_email: None,
            details: EventDetails::empty(),
            retention_tier: RetentionTier::Compressed,
            compression: Some(CompressionInfo {
                compressed_at: now,
                original_size,
                compressed_from,
            }),
            ..self
        }
    }

    /// Returns whether this record has been compressed.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.retention_tier == RetentionTier::Compressed
    }
}
