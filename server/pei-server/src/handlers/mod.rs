pub mod audit;
pub mod directory;
pub mod family_tokens;
pub mod health;
pub mod pei_versions;

use crate::{error::ApiError, server::PeiCollabServer};
use access_engine::{Actor, Decision};
use audit_engine::{ActionKind, AuditEntry, EntityType};
use uuid::Uuid;

/// Apply an authorization decision: a denial is recorded in the audit
/// trail (timestamped at this moment, the event time) and surfaced as 403.
/// The access engine itself never logs, so every call site funnels
/// through here to keep denial logging uniform.
pub(crate) async fn enforce(
    server: &PeiCollabServer,
    actor: &Actor,
    decision: Decision,
    action: ActionKind,
    entity_type: EntityType,
    entity_id: Uuid,
) -> Result<(), ApiError> {
    if let Some(reason) = decision.deny_reason() {
        server
            .audit
            .record(AuditEntry::denied(
                actor.audit_id(),
                action,
                entity_type,
                entity_id,
            ))
            .await;
        return Err(reason.into());
    }
    Ok(())
}
