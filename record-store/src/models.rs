use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Lifecycle status of a PEI version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Active,
    Obsolete,
}

/// Approval stamp attached when a version is activated through review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub approved_by: Uuid,
    pub approved_at: DateTime<Utc>,
}

/// The content of a PEI: three JSON documents, one per plan section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeiPayload {
    pub diagnosis: Value,
    pub planning: Value,
    pub evaluation: Value,
}

impl PeiPayload {
    pub fn new(diagnosis: Value, planning: Value, evaluation: Value) -> Self {
        Self {
            diagnosis,
            planning,
            evaluation,
        }
    }

    /// The named sections in a fixed order, used by the diff.
    pub fn sections(&self) -> [(&'static str, &Value); 3] {
        [
            ("diagnosis", &self.diagnosis),
            ("planning", &self.planning),
            ("evaluation", &self.evaluation),
        ]
    }
}

impl Default for PeiPayload {
    fn default() -> Self {
        Self {
            diagnosis: json!({}),
            planning: json!({}),
            evaluation: json!({}),
        }
    }
}

/// One immutable version of a student's PEI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeiVersion {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Monotonic per student, starting at 1.
    pub version_number: u32,
    pub status: VersionStatus,
    pub payload: PeiPayload,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub approval: Option<Approval>,
}

impl PeiVersion {
    pub fn active(student_id: Uuid, version_number: u32, payload: PeiPayload, author_id: Uuid) -> Self {
        Self::new(student_id, version_number, VersionStatus::Active, payload, author_id)
    }

    pub fn draft(student_id: Uuid, version_number: u32, payload: PeiPayload, author_id: Uuid) -> Self {
        Self::new(student_id, version_number, VersionStatus::Draft, payload, author_id)
    }

    fn new(
        student_id: Uuid,
        version_number: u32,
        status: VersionStatus,
        payload: PeiPayload,
        author_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            version_number,
            status,
            payload,
            author_id,
            created_at: Utc::now(),
            approval: None,
        }
    }

    pub fn with_approval(mut self, approval: Approval) -> Self {
        self.approval = Some(approval);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == VersionStatus::Active
    }
}
