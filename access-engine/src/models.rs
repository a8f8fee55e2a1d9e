use serde::{Deserialize, Serialize};
use tenant_directory::Principal;
use uuid::Uuid;

/// Who is asking. Either an authenticated principal, or the scope carried
/// by a validated family access token (no full account behind it).
#[derive(Debug, Clone)]
pub enum Actor {
    Principal(Principal),
    FamilyToken { token_id: Uuid, student_id: Uuid },
}

impl Actor {
    /// Identifier used for audit attribution: the principal id, or the
    /// token id for tokenized family reads.
    pub fn audit_id(&self) -> Uuid {
        match self {
            Actor::Principal(p) => p.id,
            Actor::FamilyToken { token_id, .. } => *token_id,
        }
    }
}

/// Operation kinds the engine rules dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ReadPei,
    WritePei,
    ManageFamilyAccess,
    ReadAudit,
    ManageDirectory,
}

impl Action {
    pub fn is_write(&self) -> bool {
        !matches!(self, Action::ReadPei | Action::ReadAudit)
    }
}

/// Why a request was denied. A closed set so call sites can log and map
/// denials uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    #[error("principal is not active")]
    PrincipalNotActive,
    #[error("resource is outside the principal's tenant scope")]
    OutsideTenantScope,
    #[error("principal is not assigned to this student")]
    NotAssignedToStudent,
    #[error("principal is not a guardian of this student")]
    NotGuardian,
    #[error("role does not permit this action")]
    RoleForbidden,
    #[error("token is not scoped to this student")]
    TokenScopeMismatch,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// The denial reason, if any.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }
}
