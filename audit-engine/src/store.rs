use crate::{
    entry::{AuditEntry, EntityType},
    error::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

/// Filter for audit queries. `None` fields act as wildcards. Results are
/// ordered by event timestamp ascending and are restartable via `offset`.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn for_entity(entity_type: EntityType, entity_id: Uuid) -> Self {
        Self {
            entity_type: Some(entity_type),
            entity_id: Some(entity_id),
            ..Self::default()
        }
    }

    pub fn for_actor(actor_id: Uuid) -> Self {
        Self {
            actor_id: Some(actor_id),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(entity_type) = self.entity_type {
            if entry.entity_type != entity_type {
                return false;
            }
        }
        if let Some(entity_id) = self.entity_id {
            if entry.entity_id != entity_id {
                return false;
            }
        }
        if let Some(actor_id) = self.actor_id {
            if entry.actor_id != actor_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.timestamp > to {
                return false;
            }
        }
        true
    }
}

/// Durable sink for audit entries.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one entry. The entry is immutable once this returns `Ok`.
    async fn append(&self, entry: AuditEntry) -> Result<()>;

    /// Entries matching the filter, ascending by event timestamp.
    async fn query(&self, filter: &AuditQuery) -> Result<Vec<AuditEntry>>;
}

/// In-memory audit store.
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<()> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn query(&self, filter: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read();
        let mut matched: Vec<AuditEntry> = entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        drop(entries);

        // Stable sort: same-instant entries keep arrival order.
        matched.sort_by_key(|e| e.timestamp);
        let page: Vec<AuditEntry> = match filter.limit {
            Some(limit) => matched.into_iter().skip(filter.offset).take(limit).collect(),
            None => matched.into_iter().skip(filter.offset).collect(),
        };
        Ok(page)
    }
}
