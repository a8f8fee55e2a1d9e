//! Tenant/role directory for PEI Collab Engine
//!
//! Resolves a principal to a tenant and role, and answers the hierarchy and
//! membership questions every authorization decision is built on:
//!
//! - Hierarchical tenant tree (network -> school -> class) with a
//!   materialized ancestor path per node, so scope checks never walk the
//!   tree recursively
//! - Principal lifecycle (registration, approval, suspension); principals
//!   are soft-disabled, never deleted
//! - Student enrollment history with non-overlapping intervals
//! - Staff assignment and family guardianship links per student

pub mod directory;
pub mod error;
pub mod hierarchy;
pub mod models;

pub use directory::DirectoryService;
pub use error::{DirectoryError, Result};
pub use hierarchy::TenantTree;
pub use models::*;
