//! Access control engine for PEI Collab Engine
//!
//! Evaluates (actor, action, resource) requests against the role rules and
//! the tenant hierarchy, producing `Allow` or `Deny(reason)`. The engine is
//! deterministic and side-effect-free: it never mutates entities and never
//! writes audit records itself — callers record every decision, success or
//! failure, so denial logging stays uniform across call sites.
//!
//! The rule list is a first-match-wins dispatch over the actor's role,
//! expressed as plain match arms so the decision table stays auditable.

pub mod engine;
pub mod models;

pub use engine::AccessEngine;
pub use models::{Action, Actor, Decision, DenyReason};
