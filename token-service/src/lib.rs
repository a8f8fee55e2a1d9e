//! Temporary family access tokens for PEI Collab Engine
//!
//! Issues, validates and revokes scoped tokens that grant a family read
//! access to a single student's active PEI without a full account. A token
//! is usable iff it is not revoked and its absolute expiry has not passed;
//! expiry is passive (a comparison at validation time), never a sweep, and
//! never sliding. State machine: Issued -> Expired | Revoked, both
//! terminal.

pub mod clock;
pub mod error;
pub mod models;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use error::{Result, TokenError};
pub use models::AccessToken;
pub use service::TokenService;
