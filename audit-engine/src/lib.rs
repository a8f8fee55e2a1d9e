//! Audit trail engine for PEI Collab Engine
//!
//! An append-only ledger of mutating and access events, keyed to the acting
//! principal, the touched entity and the moment the triggering event
//! happened. Entries are immutable and are never reordered or rewritten.
//!
//! Recording is decoupled from the business operation: producers push onto
//! a bounded queue and a background worker persists entries with bounded
//! retry/backoff. A transient storage failure never fails the triggering
//! operation; a hard failure after retries is escalated as an operational
//! alert (`tracing::error!`) and does not roll anything back.

pub mod engine;
pub mod entry;
pub mod error;
pub mod store;

pub use engine::{AuditLog, RetryPolicy};
pub use entry::{ActionKind, AuditEntry, AuditOutcome, EntityType};
pub use error::{AuditError, Result};
pub use store::{AuditQuery, AuditStore, InMemoryAuditStore};
