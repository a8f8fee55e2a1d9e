use crate::config::EngineConfig;
use access_engine::AccessEngine;
use audit_engine::{AuditLog, InMemoryAuditStore, RetryPolicy};
use record_store::{InMemoryVersionRepository, PeiStore};
use std::sync::Arc;
use tenant_directory::{DirectoryService, Role, TenantKind};
use token_service::{SystemClock, TokenService};
use tracing::info;

/// Shared server state: one instance of every core component, wired
/// together the way the data flows - access engine over the directory,
/// record store and token service audited through the shared log.
#[derive(Clone)]
pub struct PeiCollabServer {
    pub config: EngineConfig,
    pub directory: Arc<DirectoryService>,
    pub access: Arc<AccessEngine>,
    pub records: Arc<PeiStore>,
    pub tokens: Arc<TokenService>,
    pub audit: AuditLog,
}

impl PeiCollabServer {
    /// Build the full component graph. Must run inside a tokio runtime:
    /// the audit log spawns its drain worker here.
    pub fn new(config: EngineConfig) -> Self {
        let directory = Arc::new(DirectoryService::new());
        let access = Arc::new(AccessEngine::new(directory.clone()));
        let records = Arc::new(PeiStore::new(
            Arc::new(InMemoryVersionRepository::new()),
            config.student_lock_timeout,
        ));
        let tokens = Arc::new(TokenService::new(
            Arc::new(SystemClock),
            chrono::Duration::seconds(config.max_token_ttl_secs),
        ));
        let audit = AuditLog::spawn(
            Arc::new(InMemoryAuditStore::new()),
            config.audit_queue_capacity,
            RetryPolicy {
                max_attempts: config.audit_retry_attempts,
                base_backoff: config.audit_retry_backoff,
            },
        );

        Self {
            config,
            directory,
            access,
            records,
            tokens,
            audit,
        }
    }

    /// Seed a root network and an approved superadmin when the directory
    /// is empty, so a fresh deployment is operable. No-op otherwise.
    pub fn seed_bootstrap(&self) -> Option<uuid::Uuid> {
        if self.directory.has_principals() {
            return None;
        }
        let network = self
            .directory
            .create_tenant(None, TenantKind::Network, "Bootstrap Network")
            .ok()?;
        let principal = self
            .directory
            .register_principal(network.id, Role::SuperAdmin, "Bootstrap Superadmin")
            .ok()?;
        let approved = self.directory.approve_principal(principal.id).ok()?;
        info!(principal_id = %approved.id, tenant_id = %network.id, "bootstrap superadmin seeded");
        Some(approved.id)
    }
}
