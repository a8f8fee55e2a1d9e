//! Versioned record store for PEI Collab Engine
//!
//! Owns the PEIVersion lifecycle: Draft -> Active -> Obsolete. For every
//! student at most one version is Active at any instant; activating a new
//! version retires the prior Active one in the same atomic commit, so no
//! zero- or two-Active window is ever observable. Versions are immutable
//! once created and are never physically deleted.
//!
//! Mutations on one student's version set are serialized behind a
//! per-student async lock with bounded acquisition; reads never take that
//! lock. Operations on different students proceed in parallel.

pub mod diff;
pub mod error;
pub mod models;
pub mod repository;
pub mod store;

pub use diff::{diff_payloads, FieldDiff, VersionDiff};
pub use error::{RecordStoreError, Result};
pub use models::{Approval, PeiPayload, PeiVersion, VersionStatus};
pub use repository::{InMemoryVersionRepository, VersionRepository};
pub use store::PeiStore;
