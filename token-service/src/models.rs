use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scoped, time-boxed credential granting read access to one student's
/// active PEI. The `secret` is the opaque value handed to the family; the
/// `id` is what staff reference when revoking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: Uuid,
    /// Opaque unguessable secret. Skipped on anything serialized outwards
    /// except the issue response itself.
    pub secret: String,
    pub student_id: Uuid,
    pub issued_by: Uuid,
    pub issued_at: DateTime<Utc>,
    /// Absolute expiry; never sliding.
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl AccessToken {
    /// Usable for reads iff not revoked and not past expiry.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}
