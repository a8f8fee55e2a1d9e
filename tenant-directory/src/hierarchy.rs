use crate::{
    error::{DirectoryError, Result},
    models::{Tenant, TenantKind},
};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

/// A tenant node together with its materialized ancestor path
/// (root first, the node itself last). The path is computed once at insert
/// time so scope checks are a single vector scan, not a tree walk.
#[derive(Debug, Clone)]
struct TenantNode {
    tenant: Tenant,
    ancestor_path: Vec<Uuid>,
}

/// The tenant hierarchy: network -> school -> class.
///
/// Insertion validates the kind ordering; lookups are lock-free reads.
pub struct TenantTree {
    nodes: DashMap<Uuid, TenantNode>,
}

impl TenantTree {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }

    /// Insert a tenant, validating its place in the hierarchy.
    pub fn insert(&self, tenant: Tenant) -> Result<Tenant> {
        if self.nodes.contains_key(&tenant.id) {
            return Err(DirectoryError::conflict(format!(
                "tenant {} already exists",
                tenant.id
            )));
        }

        let ancestor_path = match (tenant.parent_id, tenant.kind.required_parent()) {
            (None, None) => vec![tenant.id],
            (None, Some(required)) => {
                return Err(DirectoryError::validation(format!(
                    "{:?} tenant requires a {:?} parent",
                    tenant.kind, required
                )));
            }
            (Some(_), None) => {
                return Err(DirectoryError::validation(
                    "network tenants cannot have a parent",
                ));
            }
            (Some(parent_id), Some(required)) => {
                let parent = self
                    .nodes
                    .get(&parent_id)
                    .ok_or(DirectoryError::not_found("tenant", parent_id))?;
                if parent.tenant.kind != required {
                    return Err(DirectoryError::validation(format!(
                        "{:?} tenant must be attached to a {:?}, got {:?}",
                        tenant.kind, required, parent.tenant.kind
                    )));
                }
                let mut path = parent.ancestor_path.clone();
                path.push(tenant.id);
                path
            }
        };

        debug!(tenant_id = %tenant.id, kind = ?tenant.kind, depth = ancestor_path.len(), "tenant registered");
        let stored = tenant.clone();
        self.nodes.insert(
            tenant.id,
            TenantNode {
                tenant,
                ancestor_path,
            },
        );
        Ok(stored)
    }

    pub fn get(&self, id: Uuid) -> Option<Tenant> {
        self.nodes.get(&id).map(|n| n.tenant.clone())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ancestor chain of a node, root first, the node itself last.
    pub fn ancestor_path(&self, id: Uuid) -> Option<Vec<Uuid>> {
        self.nodes.get(&id).map(|n| n.ancestor_path.clone())
    }

    /// Whether `node` sits at or below `ancestor` in the hierarchy.
    pub fn is_at_or_below(&self, node: Uuid, ancestor: Uuid) -> bool {
        self.nodes
            .get(&node)
            .map(|n| n.ancestor_path.contains(&ancestor))
            .unwrap_or(false)
    }

    /// Whether the node may hold student enrollments (school or class leaf).
    pub fn is_enrollable(&self, id: Uuid) -> bool {
        self.nodes
            .get(&id)
            .map(|n| matches!(n.tenant.kind, TenantKind::School | TenantKind::Class))
            .unwrap_or(false)
    }
}

impl Default for TenantTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chain(tree: &TenantTree) -> (Tenant, Tenant, Tenant) {
        let network = tree
            .insert(Tenant::new(None, TenantKind::Network, "Rede Municipal"))
            .unwrap();
        let school = tree
            .insert(Tenant::new(
                Some(network.id),
                TenantKind::School,
                "EM Paulo Freire",
            ))
            .unwrap();
        let class = tree
            .insert(Tenant::new(Some(school.id), TenantKind::Class, "3A"))
            .unwrap();
        (network, school, class)
    }

    #[test]
    fn ancestor_path_is_materialized_root_first() {
        let tree = TenantTree::new();
        let (network, school, class) = sample_chain(&tree);

        let path = tree.ancestor_path(class.id).unwrap();
        assert_eq!(path, vec![network.id, school.id, class.id]);
    }

    #[test]
    fn scope_checks_follow_the_path() {
        let tree = TenantTree::new();
        let (network, school, class) = sample_chain(&tree);

        assert!(tree.is_at_or_below(class.id, network.id));
        assert!(tree.is_at_or_below(class.id, school.id));
        assert!(tree.is_at_or_below(school.id, network.id));
        assert!(tree.is_at_or_below(network.id, network.id));
        // Not in the other direction.
        assert!(!tree.is_at_or_below(network.id, class.id));
        assert!(!tree.is_at_or_below(school.id, class.id));
    }

    #[test]
    fn siblings_are_not_in_scope() {
        let tree = TenantTree::new();
        let (_, school, class) = sample_chain(&tree);
        let sibling = tree
            .insert(Tenant::new(Some(school.id), TenantKind::Class, "3B"))
            .unwrap();

        assert!(!tree.is_at_or_below(class.id, sibling.id));
        assert!(!tree.is_at_or_below(sibling.id, class.id));
    }

    #[test]
    fn kind_ordering_is_enforced() {
        let tree = TenantTree::new();
        let (network, _, class) = sample_chain(&tree);

        // Class directly under a network is rejected.
        let err = tree
            .insert(Tenant::new(Some(network.id), TenantKind::Class, "stray"))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));

        // School under a class is rejected.
        let err = tree
            .insert(Tenant::new(Some(class.id), TenantKind::School, "stray"))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));

        // Root school is rejected.
        let err = tree
            .insert(Tenant::new(None, TenantKind::School, "orphan"))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::Validation(_)));
    }

    #[test]
    fn unknown_parent_is_not_found() {
        let tree = TenantTree::new();
        let err = tree
            .insert(Tenant::new(
                Some(Uuid::new_v4()),
                TenantKind::School,
                "ghost parent",
            ))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound { .. }));
    }
}
