use crate::models::{Action, Actor, Decision, DenyReason};
use std::sync::Arc;
use tenant_directory::{DirectoryService, Principal, Role, Student};
use tracing::debug;
use uuid::Uuid;

/// The access control engine.
///
/// Holds a handle to the directory for hierarchy-membership, assignment and
/// guardianship lookups; evaluation is read-only and callable from any
/// number of concurrent tasks.
pub struct AccessEngine {
    directory: Arc<DirectoryService>,
}

impl AccessEngine {
    pub fn new(directory: Arc<DirectoryService>) -> Self {
        Self { directory }
    }

    /// Authorize a student-scoped operation (PEI reads/writes, family
    /// access management). The resource tenant is the student's current
    /// enrollment node.
    pub fn authorize(&self, actor: &Actor, action: Action, student: &Student) -> Decision {
        let decision = match actor {
            Actor::FamilyToken { student_id, .. } => {
                Self::evaluate_token(*student_id, action, student)
            }
            Actor::Principal(principal) => self.evaluate_principal(principal, action, student),
        };
        debug!(
            actor = %actor.audit_id(),
            action = ?action,
            student_id = %student.id,
            decision = ?decision,
            "authorization evaluated"
        );
        decision
    }

    /// Authorize a tenant-scoped operation (directory management, audit
    /// queries) against an explicit resource tenant node.
    pub fn authorize_tenant(&self, actor: &Actor, action: Action, resource_tenant: Uuid) -> Decision {
        let decision = match actor {
            Actor::FamilyToken { .. } => Decision::Deny(DenyReason::RoleForbidden),
            Actor::Principal(principal) => {
                if !principal.is_active() {
                    Decision::Deny(DenyReason::PrincipalNotActive)
                } else {
                    match principal.role {
                        Role::SuperAdmin => Decision::Allow,
                        Role::Admin | Role::EducationSecretary => {
                            self.scoped(principal, resource_tenant)
                        }
                        _ => Decision::Deny(DenyReason::RoleForbidden),
                    }
                }
            }
        };
        debug!(
            actor = %actor.audit_id(),
            action = ?action,
            resource_tenant = %resource_tenant,
            decision = ?decision,
            "authorization evaluated"
        );
        decision
    }

    /// Authorize a system-wide operation with no resource tenant, e.g.
    /// creating a root network. SuperAdmin only.
    pub fn authorize_system(&self, actor: &Actor, action: Action) -> Decision {
        let decision = match actor {
            Actor::Principal(principal) if !principal.is_active() => {
                Decision::Deny(DenyReason::PrincipalNotActive)
            }
            Actor::Principal(principal) if principal.role == Role::SuperAdmin => Decision::Allow,
            _ => Decision::Deny(DenyReason::RoleForbidden),
        };
        debug!(actor = %actor.audit_id(), action = ?action, decision = ?decision, "authorization evaluated");
        decision
    }

    /// Token-gated access: read-only, and only for the student the token
    /// was issued for.
    fn evaluate_token(scope_student: Uuid, action: Action, student: &Student) -> Decision {
        if action != Action::ReadPei {
            return Decision::Deny(DenyReason::RoleForbidden);
        }
        if scope_student != student.id {
            return Decision::Deny(DenyReason::TokenScopeMismatch);
        }
        Decision::Allow
    }

    /// The role rule list. First match wins, top to bottom.
    fn evaluate_principal(&self, principal: &Principal, action: Action, student: &Student) -> Decision {
        if !principal.is_active() {
            return Decision::Deny(DenyReason::PrincipalNotActive);
        }
        match principal.role {
            // Rule 1: SuperAdmin, everything, everywhere.
            Role::SuperAdmin => Decision::Allow,

            // Rule 2: administrative tier, anything at or below the bound node.
            Role::Admin | Role::EducationSecretary => self.scoped(principal, student.tenant_id),

            // Rule 3: assigned staff, PEI content within their subtree.
            // Coordinators may additionally manage family access.
            Role::Coordinator | Role::Teacher | Role::Therapist => {
                let action_permitted = matches!(action, Action::ReadPei | Action::WritePei)
                    || (action == Action::ManageFamilyAccess && principal.role == Role::Coordinator);
                if !action_permitted {
                    return Decision::Deny(DenyReason::RoleForbidden);
                }
                if !self
                    .directory
                    .tenants()
                    .is_at_or_below(student.tenant_id, principal.tenant_id)
                {
                    return Decision::Deny(DenyReason::OutsideTenantScope);
                }
                if !self.directory.is_assigned(student.id, principal.id) {
                    return Decision::Deny(DenyReason::NotAssignedToStudent);
                }
                Decision::Allow
            }

            // Rule 4: family, read-only of their own child.
            Role::Family => {
                if action != Action::ReadPei {
                    return Decision::Deny(DenyReason::RoleForbidden);
                }
                if !self.directory.is_guardian(student.id, principal.id) {
                    return Decision::Deny(DenyReason::NotGuardian);
                }
                Decision::Allow
            }
        }
    }

    fn scoped(&self, principal: &Principal, resource_tenant: Uuid) -> Decision {
        if self
            .directory
            .tenants()
            .is_at_or_below(resource_tenant, principal.tenant_id)
        {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::OutsideTenantScope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tenant_directory::TenantKind;

    struct Fixture {
        directory: Arc<DirectoryService>,
        engine: AccessEngine,
        school: Uuid,
        class: Uuid,
        other_school: Uuid,
        student: Student,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(DirectoryService::new());
        let network = directory
            .create_tenant(None, TenantKind::Network, "Rede")
            .unwrap();
        let school = directory
            .create_tenant(Some(network.id), TenantKind::School, "Escola A")
            .unwrap();
        let class = directory
            .create_tenant(Some(school.id), TenantKind::Class, "2B")
            .unwrap();
        let other_school = directory
            .create_tenant(Some(network.id), TenantKind::School, "Escola B")
            .unwrap();
        let student = directory
            .create_student("Lia", class.id, Utc::now())
            .unwrap();
        let engine = AccessEngine::new(directory.clone());
        Fixture {
            directory,
            engine,
            school: school.id,
            class: class.id,
            other_school: other_school.id,
            student,
        }
    }

    fn active_principal(f: &Fixture, tenant: Uuid, role: Role) -> Principal {
        let p = f.directory.register_principal(tenant, role, "p").unwrap();
        f.directory.approve_principal(p.id).unwrap()
    }

    #[test]
    fn superadmin_is_allowed_everywhere() {
        let f = fixture();
        let admin = active_principal(&f, f.other_school, Role::SuperAdmin);
        let actor = Actor::Principal(admin);
        for action in [
            Action::ReadPei,
            Action::WritePei,
            Action::ManageFamilyAccess,
        ] {
            assert!(f.engine.authorize(&actor, action, &f.student).is_allowed());
        }
        assert!(f
            .engine
            .authorize_tenant(&actor, Action::ReadAudit, f.school)
            .is_allowed());
    }

    #[test]
    fn admin_tier_is_bounded_by_subtree() {
        let f = fixture();
        let in_scope = active_principal(&f, f.school, Role::EducationSecretary);
        let out_of_scope = active_principal(&f, f.other_school, Role::Admin);

        assert!(f
            .engine
            .authorize(&Actor::Principal(in_scope), Action::WritePei, &f.student)
            .is_allowed());
        assert_eq!(
            f.engine
                .authorize(&Actor::Principal(out_of_scope), Action::WritePei, &f.student)
                .deny_reason(),
            Some(DenyReason::OutsideTenantScope)
        );
    }

    #[test]
    fn assigned_teacher_may_write_unassigned_may_not() {
        let f = fixture();
        let assigned = active_principal(&f, f.class, Role::Teacher);
        let unassigned = active_principal(&f, f.class, Role::Teacher);
        f.directory.assign_staff(f.student.id, assigned.id).unwrap();

        assert!(f
            .engine
            .authorize(&Actor::Principal(assigned), Action::WritePei, &f.student)
            .is_allowed());
        assert_eq!(
            f.engine
                .authorize(&Actor::Principal(unassigned), Action::WritePei, &f.student)
                .deny_reason(),
            Some(DenyReason::NotAssignedToStudent)
        );
    }

    #[test]
    fn staff_from_another_subtree_is_out_of_scope() {
        let f = fixture();
        let elsewhere = active_principal(&f, f.other_school, Role::Therapist);
        // Even assigned, the tenant scope rule fires first.
        f.directory.assign_staff(f.student.id, elsewhere.id).unwrap();
        assert_eq!(
            f.engine
                .authorize(&Actor::Principal(elsewhere), Action::ReadPei, &f.student)
                .deny_reason(),
            Some(DenyReason::OutsideTenantScope)
        );
    }

    #[test]
    fn coordinator_manages_family_access_teacher_does_not() {
        let f = fixture();
        let coordinator = active_principal(&f, f.school, Role::Coordinator);
        let teacher = active_principal(&f, f.class, Role::Teacher);
        f.directory
            .assign_staff(f.student.id, coordinator.id)
            .unwrap();
        f.directory.assign_staff(f.student.id, teacher.id).unwrap();

        assert!(f
            .engine
            .authorize(
                &Actor::Principal(coordinator),
                Action::ManageFamilyAccess,
                &f.student
            )
            .is_allowed());
        assert_eq!(
            f.engine
                .authorize(
                    &Actor::Principal(teacher),
                    Action::ManageFamilyAccess,
                    &f.student
                )
                .deny_reason(),
            Some(DenyReason::RoleForbidden)
        );
    }

    #[test]
    fn family_reads_own_child_only_and_never_writes() {
        let f = fixture();
        let guardian = active_principal(&f, f.class, Role::Family);
        let stranger = active_principal(&f, f.class, Role::Family);
        f.directory.link_guardian(f.student.id, guardian.id).unwrap();

        assert!(f
            .engine
            .authorize(&Actor::Principal(guardian.clone()), Action::ReadPei, &f.student)
            .is_allowed());
        assert_eq!(
            f.engine
                .authorize(&Actor::Principal(stranger), Action::ReadPei, &f.student)
                .deny_reason(),
            Some(DenyReason::NotGuardian)
        );
        assert_eq!(
            f.engine
                .authorize(&Actor::Principal(guardian), Action::WritePei, &f.student)
                .deny_reason(),
            Some(DenyReason::RoleForbidden)
        );
    }

    #[test]
    fn pending_and_suspended_principals_are_denied() {
        let f = fixture();
        let pending = f
            .directory
            .register_principal(f.class, Role::Teacher, "pending")
            .unwrap();
        f.directory.assign_staff(f.student.id, pending.id).unwrap();
        assert_eq!(
            f.engine
                .authorize(&Actor::Principal(pending.clone()), Action::ReadPei, &f.student)
                .deny_reason(),
            Some(DenyReason::PrincipalNotActive)
        );

        f.directory.approve_principal(pending.id).unwrap();
        let suspended = f.directory.suspend_principal(pending.id).unwrap();
        assert_eq!(
            f.engine
                .authorize(&Actor::Principal(suspended), Action::ReadPei, &f.student)
                .deny_reason(),
            Some(DenyReason::PrincipalNotActive)
        );
    }

    #[test]
    fn token_actor_reads_its_student_only() {
        let f = fixture();
        let token = Actor::FamilyToken {
            token_id: Uuid::new_v4(),
            student_id: f.student.id,
        };
        assert!(f.engine.authorize(&token, Action::ReadPei, &f.student).is_allowed());
        assert_eq!(
            f.engine
                .authorize(&token, Action::WritePei, &f.student)
                .deny_reason(),
            Some(DenyReason::RoleForbidden)
        );

        let other_student = f
            .directory
            .create_student("Outro", f.class, Utc::now())
            .unwrap();
        assert_eq!(
            f.engine
                .authorize(&token, Action::ReadPei, &other_student)
                .deny_reason(),
            Some(DenyReason::TokenScopeMismatch)
        );
    }

    #[test]
    fn system_operations_are_superadmin_only() {
        let f = fixture();
        let root = active_principal(&f, f.school, Role::SuperAdmin);
        let admin = active_principal(&f, f.school, Role::Admin);

        assert!(f
            .engine
            .authorize_system(&Actor::Principal(root), Action::ManageDirectory)
            .is_allowed());
        assert_eq!(
            f.engine
                .authorize_system(&Actor::Principal(admin), Action::ManageDirectory)
                .deny_reason(),
            Some(DenyReason::RoleForbidden)
        );
    }

    #[test]
    fn audit_queries_are_admin_tier_only() {
        let f = fixture();
        let secretary = active_principal(&f, f.school, Role::EducationSecretary);
        let teacher = active_principal(&f, f.class, Role::Teacher);

        assert!(f
            .engine
            .authorize_tenant(&Actor::Principal(secretary), Action::ReadAudit, f.school)
            .is_allowed());
        assert_eq!(
            f.engine
                .authorize_tenant(&Actor::Principal(teacher), Action::ReadAudit, f.school)
                .deny_reason(),
            Some(DenyReason::RoleForbidden)
        );
    }
}
