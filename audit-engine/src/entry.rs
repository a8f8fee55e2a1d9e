// Audit entry types and structures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of entity an audit entry refers to. Entries reference entities by
/// id only and outlive them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    PeiVersion,
    Student,
    FamilyToken,
    Principal,
    Tenant,
    AuditLog,
}

/// Kind of operation that triggered the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreatePeiVersion,
    SubmitPeiDraft,
    RestorePeiVersion,
    ReadActivePei,
    ListPeiVersions,
    ComparePeiVersions,
    IssueFamilyToken,
    RevokeFamilyToken,
    ValidateFamilyToken,
    QueryAuditLog,
    CreateTenant,
    RegisterPrincipal,
    ApprovePrincipal,
    SuspendPrincipal,
    CreateStudent,
    EnrollStudent,
    AssignStaff,
    LinkGuardian,
}

/// Whether the triggering operation was performed or refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Denied,
}

/// One immutable ledger entry.
///
/// The timestamp is fixed when the entry is constructed, i.e. at the moment
/// of the triggering event, not when the write lands in the store. The
/// changed-fields summary carries field names only, never full diffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: ActionKind,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub changed_fields: Vec<String>,
    pub outcome: AuditOutcome,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn success(
        actor_id: Uuid,
        action: ActionKind,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Self {
        Self::new(actor_id, action, entity_type, entity_id, AuditOutcome::Success)
    }

    pub fn denied(
        actor_id: Uuid,
        action: ActionKind,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Self {
        Self::new(actor_id, action, entity_type, entity_id, AuditOutcome::Denied)
    }

    fn new(
        actor_id: Uuid,
        action: ActionKind,
        entity_type: EntityType,
        entity_id: Uuid,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action,
            entity_type,
            entity_id,
            changed_fields: Vec::new(),
            outcome,
            timestamp: Utc::now(),
        }
    }

    /// Attach the changed-fields summary.
    pub fn with_changed_fields(mut self, fields: Vec<String>) -> Self {
        self.changed_fields = fields;
        self
    }

    /// Override the event timestamp (tests and replayed events).
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
