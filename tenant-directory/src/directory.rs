use crate::{
    error::{DirectoryError, Result},
    hierarchy::TenantTree,
    models::{Principal, PrincipalStatus, Role, Student, Tenant, TenantKind},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// The directory: tenants, principals, students, and the per-student
/// staff-assignment and guardianship sets.
///
/// All collections are concurrent maps; reads are lock-free and safe from
/// any number of tasks. The directory only answers membership questions —
/// authorization decisions live in `access-engine`.
pub struct DirectoryService {
    tenants: TenantTree,
    principals: DashMap<Uuid, Principal>,
    students: DashMap<Uuid, Student>,
    /// student id -> principal ids assigned as PEI staff
    staff_assignments: DashMap<Uuid, HashSet<Uuid>>,
    /// student id -> family principal ids
    guardians: DashMap<Uuid, HashSet<Uuid>>,
}

impl DirectoryService {
    pub fn new() -> Self {
        Self {
            tenants: TenantTree::new(),
            principals: DashMap::new(),
            students: DashMap::new(),
            staff_assignments: DashMap::new(),
            guardians: DashMap::new(),
        }
    }

    // =========================================================================
    // Tenants
    // =========================================================================

    pub fn create_tenant(
        &self,
        parent_id: Option<Uuid>,
        kind: TenantKind,
        name: impl Into<String>,
    ) -> Result<Tenant> {
        self.tenants.insert(Tenant::new(parent_id, kind, name))
    }

    pub fn tenant(&self, id: Uuid) -> Result<Tenant> {
        self.tenants
            .get(id)
            .ok_or(DirectoryError::not_found("tenant", id))
    }

    pub fn tenants(&self) -> &TenantTree {
        &self.tenants
    }

    // =========================================================================
    // Principals
    // =========================================================================

    /// Register a principal bound to a tenant node. Starts `Pending` until
    /// approved.
    pub fn register_principal(
        &self,
        tenant_id: Uuid,
        role: Role,
        display_name: impl Into<String>,
    ) -> Result<Principal> {
        if !self.tenants.contains(tenant_id) {
            return Err(DirectoryError::not_found("tenant", tenant_id));
        }
        let principal = Principal::new(tenant_id, role, display_name);
        info!(principal_id = %principal.id, role = ?role, tenant_id = %tenant_id, "principal registered");
        self.principals.insert(principal.id, principal.clone());
        Ok(principal)
    }

    /// Approval workflow: `Pending` -> `Active`.
    pub fn approve_principal(&self, id: Uuid) -> Result<Principal> {
        let mut entry = self
            .principals
            .get_mut(&id)
            .ok_or(DirectoryError::not_found("principal", id))?;
        match entry.status {
            PrincipalStatus::Pending => {
                entry.status = PrincipalStatus::Active;
                info!(principal_id = %id, "principal approved");
                Ok(entry.clone())
            }
            PrincipalStatus::Active => Ok(entry.clone()),
            PrincipalStatus::Suspended => Err(DirectoryError::conflict(format!(
                "principal {id} is suspended and cannot be approved"
            ))),
        }
    }

    /// Soft-disable. The principal record is retained.
    pub fn suspend_principal(&self, id: Uuid) -> Result<Principal> {
        let mut entry = self
            .principals
            .get_mut(&id)
            .ok_or(DirectoryError::not_found("principal", id))?;
        entry.status = PrincipalStatus::Suspended;
        info!(principal_id = %id, "principal suspended");
        Ok(entry.clone())
    }

    pub fn principal(&self, id: Uuid) -> Result<Principal> {
        self.principals
            .get(&id)
            .map(|p| p.clone())
            .ok_or(DirectoryError::not_found("principal", id))
    }

    /// Whether any principal exists yet. Used once at startup to decide
    /// whether to seed the bootstrap superadmin.
    pub fn has_principals(&self) -> bool {
        !self.principals.is_empty()
    }

    // =========================================================================
    // Students and enrollment
    // =========================================================================

    /// Create a student enrolled at `tenant_id` (school or class) from
    /// `enrolled_at` onwards.
    pub fn create_student(
        &self,
        name: impl Into<String>,
        tenant_id: Uuid,
        enrolled_at: DateTime<Utc>,
    ) -> Result<Student> {
        if !self.tenants.contains(tenant_id) {
            return Err(DirectoryError::not_found("tenant", tenant_id));
        }
        if !self.tenants.is_enrollable(tenant_id) {
            return Err(DirectoryError::validation(
                "students can only be enrolled at a school or class",
            ));
        }
        let student = Student::new(name, tenant_id, enrolled_at);
        info!(student_id = %student.id, tenant_id = %tenant_id, "student created");
        self.students.insert(student.id, student.clone());
        Ok(student)
    }

    /// Move a student to another tenant leaf at `at`, closing the open
    /// enrollment at the same instant. Intervals never overlap: the new
    /// enrollment must not start before the open one did.
    pub fn enroll_student(&self, student_id: Uuid, tenant_id: Uuid, at: DateTime<Utc>) -> Result<Student> {
        if !self.tenants.contains(tenant_id) {
            return Err(DirectoryError::not_found("tenant", tenant_id));
        }
        if !self.tenants.is_enrollable(tenant_id) {
            return Err(DirectoryError::validation(
                "students can only be enrolled at a school or class",
            ));
        }
        let mut entry = self
            .students
            .get_mut(&student_id)
            .ok_or(DirectoryError::not_found("student", student_id))?;

        if let Some(open) = entry.enrollments.iter_mut().find(|e| e.ended_at.is_none()) {
            if at < open.started_at {
                return Err(DirectoryError::validation(
                    "enrollment would overlap the current interval",
                ));
            }
            open.ended_at = Some(at);
        }
        entry.enrollments.push(crate::models::Enrollment {
            tenant_id,
            started_at: at,
            ended_at: None,
        });
        entry.tenant_id = tenant_id;
        debug!(student_id = %student_id, tenant_id = %tenant_id, "student re-enrolled");
        Ok(entry.clone())
    }

    pub fn student(&self, id: Uuid) -> Result<Student> {
        self.students
            .get(&id)
            .map(|s| s.clone())
            .ok_or(DirectoryError::not_found("student", id))
    }

    // =========================================================================
    // Staff assignment and guardianship
    // =========================================================================

    /// Assign a staff principal (coordinator, teacher or therapist) to a
    /// student's PEI team.
    pub fn assign_staff(&self, student_id: Uuid, principal_id: Uuid) -> Result<()> {
        let principal = self.principal(principal_id)?;
        if !principal.role.is_staff() {
            return Err(DirectoryError::validation(format!(
                "{:?} principals cannot be assigned as PEI staff",
                principal.role
            )));
        }
        if !self.students.contains_key(&student_id) {
            return Err(DirectoryError::not_found("student", student_id));
        }
        self.staff_assignments
            .entry(student_id)
            .or_default()
            .insert(principal_id);
        debug!(student_id = %student_id, principal_id = %principal_id, "staff assigned");
        Ok(())
    }

    pub fn unassign_staff(&self, student_id: Uuid, principal_id: Uuid) -> Result<()> {
        if let Some(mut set) = self.staff_assignments.get_mut(&student_id) {
            set.remove(&principal_id);
        }
        Ok(())
    }

    pub fn is_assigned(&self, student_id: Uuid, principal_id: Uuid) -> bool {
        self.staff_assignments
            .get(&student_id)
            .map(|set| set.contains(&principal_id))
            .unwrap_or(false)
    }

    /// Link a family principal as guardian of a student.
    pub fn link_guardian(&self, student_id: Uuid, principal_id: Uuid) -> Result<()> {
        let principal = self.principal(principal_id)?;
        if principal.role != Role::Family {
            return Err(DirectoryError::validation(
                "only family principals can be linked as guardians",
            ));
        }
        if !self.students.contains_key(&student_id) {
            return Err(DirectoryError::not_found("student", student_id));
        }
        self.guardians
            .entry(student_id)
            .or_default()
            .insert(principal_id);
        debug!(student_id = %student_id, principal_id = %principal_id, "guardian linked");
        Ok(())
    }

    pub fn is_guardian(&self, student_id: Uuid, principal_id: Uuid) -> bool {
        self.guardians
            .get(&student_id)
            .map(|set| set.contains(&principal_id))
            .unwrap_or(false)
    }
}

impl Default for DirectoryService {
    fn default() -> Self {
        Self::new()
    }
}
