use crate::{
    error::{RecordStoreError, Result},
    models::{Approval, PeiVersion, VersionStatus},
};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

/// Storage seam for PEI versions.
///
/// `commit_active` and `promote_draft` are the transaction boundaries: a
/// repository must retire the prior Active version and activate the new
/// one as one atomic mutation, with no intermediate state observable by
/// readers.
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// All versions of a student, ascending by version number.
    async fn versions_of(&self, student_id: Uuid) -> Result<Vec<PeiVersion>>;

    async fn get(&self, student_id: Uuid, version_number: u32) -> Result<Option<PeiVersion>>;

    async fn active_of(&self, student_id: Uuid) -> Result<Option<PeiVersion>>;

    /// Insert a version without touching the Active chain (drafts).
    async fn insert(&self, version: PeiVersion) -> Result<()>;

    /// Atomically retire the current Active version (if any) and insert
    /// `version` as the new Active one.
    async fn commit_active(&self, version: PeiVersion) -> Result<PeiVersion>;

    /// Atomically flip an existing Draft to Active, retiring the prior
    /// Active version.
    async fn promote_draft(
        &self,
        student_id: Uuid,
        version_number: u32,
        approval: Option<Approval>,
    ) -> Result<PeiVersion>;
}

/// In-memory version repository.
///
/// Versions of one student live in a single map slot, so the retire+insert
/// swap happens under one shard guard and readers can never see a zero- or
/// two-Active state.
pub struct InMemoryVersionRepository {
    versions: DashMap<Uuid, Vec<PeiVersion>>,
}

impl InMemoryVersionRepository {
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
        }
    }
}

impl Default for InMemoryVersionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VersionRepository for InMemoryVersionRepository {
    async fn versions_of(&self, student_id: Uuid) -> Result<Vec<PeiVersion>> {
        let mut versions = self
            .versions
            .get(&student_id)
            .map(|v| v.clone())
            .unwrap_or_default();
        versions.sort_by_key(|v| v.version_number);
        Ok(versions)
    }

    async fn get(&self, student_id: Uuid, version_number: u32) -> Result<Option<PeiVersion>> {
        Ok(self.versions.get(&student_id).and_then(|v| {
            v.iter()
                .find(|ver| ver.version_number == version_number)
                .cloned()
        }))
    }

    async fn active_of(&self, student_id: Uuid) -> Result<Option<PeiVersion>> {
        Ok(self
            .versions
            .get(&student_id)
            .and_then(|v| v.iter().find(|ver| ver.is_active()).cloned()))
    }

    async fn insert(&self, version: PeiVersion) -> Result<()> {
        self.versions
            .entry(version.student_id)
            .or_default()
            .push(version);
        Ok(())
    }

    async fn commit_active(&self, version: PeiVersion) -> Result<PeiVersion> {
        let mut slot = self.versions.entry(version.student_id).or_default();
        for existing in slot.iter_mut() {
            if existing.is_active() {
                existing.status = VersionStatus::Obsolete;
            }
        }
        slot.push(version.clone());
        Ok(version)
    }

    async fn promote_draft(
        &self,
        student_id: Uuid,
        version_number: u32,
        approval: Option<Approval>,
    ) -> Result<PeiVersion> {
        let mut slot = self
            .versions
            .get_mut(&student_id)
            .ok_or(RecordStoreError::NoVersions(student_id))?;

        let draft_status = slot
            .iter()
            .find(|v| v.version_number == version_number)
            .map(|v| v.status)
            .ok_or(RecordStoreError::VersionNotFound {
                student_id,
                version: version_number,
            })?;
        if draft_status != VersionStatus::Draft {
            return Err(RecordStoreError::validation(format!(
                "version {version_number} is not a draft"
            )));
        }

        let mut promoted = None;
        for existing in slot.iter_mut() {
            if existing.is_active() {
                existing.status = VersionStatus::Obsolete;
            } else if existing.version_number == version_number {
                existing.status = VersionStatus::Active;
                existing.approval = approval.clone();
                promoted = Some(existing.clone());
            }
        }
        promoted.ok_or(RecordStoreError::VersionNotFound {
            student_id,
            version: version_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PeiPayload;

    #[tokio::test]
    async fn commit_active_retires_prior_active_in_one_step() {
        let repo = InMemoryVersionRepository::new();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();

        repo.commit_active(PeiVersion::active(student, 1, PeiPayload::default(), author))
            .await
            .unwrap();
        repo.commit_active(PeiVersion::active(student, 2, PeiPayload::default(), author))
            .await
            .unwrap();

        let versions = repo.versions_of(student).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].status, VersionStatus::Obsolete);
        assert_eq!(versions[1].status, VersionStatus::Active);
    }

    #[tokio::test]
    async fn promote_draft_rejects_non_drafts() {
        let repo = InMemoryVersionRepository::new();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();

        repo.commit_active(PeiVersion::active(student, 1, PeiPayload::default(), author))
            .await
            .unwrap();
        let err = repo.promote_draft(student, 1, None).await.unwrap_err();
        assert!(matches!(err, RecordStoreError::Validation(_)));

        let missing = repo.promote_draft(student, 9, None).await.unwrap_err();
        assert!(matches!(missing, RecordStoreError::VersionNotFound { .. }));
    }
}
