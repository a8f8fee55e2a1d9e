use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role held by a principal. Closed set; authorization rules dispatch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    EducationSecretary,
    Coordinator,
    Teacher,
    Therapist,
    Family,
}

impl Role {
    /// Roles that can be assigned to a student as PEI authors.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Coordinator | Role::Teacher | Role::Therapist)
    }

    /// Roles with tenant-scoped administrative reach.
    pub fn is_admin_tier(&self) -> bool {
        matches!(self, Role::Admin | Role::EducationSecretary)
    }
}

/// Lifecycle status of a principal. Registration starts at `Pending`;
/// approval moves to `Active`; suspension soft-disables. No deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalStatus {
    Pending,
    Active,
    Suspended,
}

/// A user of the system, bound to one tenant node and one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub status: PrincipalStatus,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(tenant_id: Uuid, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            role,
            status: PrincipalStatus::Pending,
            display_name: display_name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PrincipalStatus::Active
    }
}

/// Level of a tenant node in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantKind {
    Network,
    School,
    Class,
}

impl TenantKind {
    /// The kind a parent node must have; `None` means the node is a root.
    pub fn required_parent(&self) -> Option<TenantKind> {
        match self {
            TenantKind::Network => None,
            TenantKind::School => Some(TenantKind::Network),
            TenantKind::Class => Some(TenantKind::School),
        }
    }
}

/// A node in the tenant hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub kind: TenantKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    pub fn new(parent_id: Option<Uuid>, kind: TenantKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id,
            kind,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// One interval of a student's enrollment history. Open interval while
/// `ended_at` is `None`; intervals for a student never overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub tenant_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// A student. Belongs to exactly one tenant leaf at any time; the full
/// enrollment history is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub tenant_id: Uuid,
    pub enrollments: Vec<Enrollment>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn new(name: impl Into<String>, tenant_id: Uuid, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tenant_id,
            enrollments: vec![Enrollment {
                tenant_id,
                started_at: enrolled_at,
                ended_at: None,
            }],
            created_at: Utc::now(),
        }
    }

    /// The enrollment interval currently open, if any.
    pub fn current_enrollment(&self) -> Option<&Enrollment> {
        self.enrollments.iter().find(|e| e.ended_at.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles() {
        assert!(Role::Teacher.is_staff());
        assert!(Role::Therapist.is_staff());
        assert!(Role::Coordinator.is_staff());
        assert!(!Role::Family.is_staff());
        assert!(!Role::Admin.is_staff());
    }

    #[test]
    fn tenant_kind_parents() {
        assert_eq!(TenantKind::Network.required_parent(), None);
        assert_eq!(TenantKind::School.required_parent(), Some(TenantKind::Network));
        assert_eq!(TenantKind::Class.required_parent(), Some(TenantKind::School));
    }

    #[test]
    fn new_principal_starts_pending() {
        let p = Principal::new(Uuid::new_v4(), Role::Teacher, "Ana");
        assert_eq!(p.status, PrincipalStatus::Pending);
        assert!(!p.is_active());
    }
}
