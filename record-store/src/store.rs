use crate::{
    diff::{diff_payloads, VersionDiff},
    error::{RecordStoreError, Result},
    models::{Approval, PeiPayload, PeiVersion},
    repository::VersionRepository,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The versioned record store.
///
/// Mutations on one student's version chain are serialized behind a
/// per-student async mutex; acquisition is bounded by `lock_timeout` and a
/// timeout surfaces as a retry-safe `Conflict`. Reads go straight to the
/// repository and are never blocked by a writer beyond the instant the
/// repository commits.
pub struct PeiStore {
    repository: Arc<dyn VersionRepository>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    lock_timeout: Duration,
    write_retries: u32,
}

impl PeiStore {
    pub fn new(repository: Arc<dyn VersionRepository>, lock_timeout: Duration) -> Self {
        Self {
            repository,
            locks: DashMap::new(),
            lock_timeout,
            write_retries: 2,
        }
    }

    /// Override the bounded retry count for transient repository failures.
    pub fn with_write_retries(mut self, retries: u32) -> Self {
        self.write_retries = retries;
        self
    }

    // =========================================================================
    // Writes (serialized per student)
    // =========================================================================

    /// Create the next Active version for a student, retiring the prior
    /// Active version in the same commit. An identical payload still
    /// creates a new version: every submit is a provenance event.
    pub async fn create_version(
        &self,
        student_id: Uuid,
        author_id: Uuid,
        payload: PeiPayload,
    ) -> Result<PeiVersion> {
        let _guard = self.acquire(student_id).await?;
        let next = self.next_version_number(student_id).await?;
        let version = PeiVersion::active(student_id, next, payload, author_id);
        let committed = self.commit_with_retry(version).await?;
        info!(student_id = %student_id, version = committed.version_number, "PEI version activated");
        Ok(committed)
    }

    /// Save a draft. Drafts take a version number immediately (the chain
    /// is monotonic over all versions) but do not touch the Active chain.
    pub async fn save_draft(
        &self,
        student_id: Uuid,
        author_id: Uuid,
        payload: PeiPayload,
    ) -> Result<PeiVersion> {
        let _guard = self.acquire(student_id).await?;
        let next = self.next_version_number(student_id).await?;
        let draft = PeiVersion::draft(student_id, next, payload, author_id);
        self.repository.insert(draft.clone()).await?;
        debug!(student_id = %student_id, version = next, "PEI draft saved");
        Ok(draft)
    }

    /// Submit a draft: Draft -> Active, retiring the prior Active version
    /// atomically. Optionally stamps approval metadata.
    pub async fn submit_draft(
        &self,
        student_id: Uuid,
        version_number: u32,
        approval: Option<Approval>,
    ) -> Result<PeiVersion> {
        let _guard = self.acquire(student_id).await?;
        let promoted = self
            .repository
            .promote_draft(student_id, version_number, approval)
            .await?;
        info!(student_id = %student_id, version = version_number, "PEI draft submitted");
        Ok(promoted)
    }

    /// Re-activate a historical payload as a brand new version. History is
    /// never rewritten: restore always appends.
    pub async fn restore_version(
        &self,
        student_id: Uuid,
        version_number: u32,
        author_id: Uuid,
    ) -> Result<PeiVersion> {
        let _guard = self.acquire(student_id).await?;
        let source = self
            .repository
            .get(student_id, version_number)
            .await?
            .ok_or(RecordStoreError::VersionNotFound {
                student_id,
                version: version_number,
            })?;
        let next = self.next_version_number(student_id).await?;
        let version = PeiVersion::active(student_id, next, source.payload, author_id);
        let committed = self.commit_with_retry(version).await?;
        info!(
            student_id = %student_id,
            restored_from = version_number,
            version = committed.version_number,
            "PEI version restored"
        );
        Ok(committed)
    }

    // =========================================================================
    // Reads (lock-free)
    // =========================================================================

    pub async fn get_active(&self, student_id: Uuid) -> Result<PeiVersion> {
        self.repository
            .active_of(student_id)
            .await?
            .ok_or(RecordStoreError::NoVersions(student_id))
    }

    pub async fn get_version(&self, student_id: Uuid, version_number: u32) -> Result<PeiVersion> {
        self.repository
            .get(student_id, version_number)
            .await?
            .ok_or(RecordStoreError::VersionNotFound {
                student_id,
                version: version_number,
            })
    }

    /// Versions ascending by version number; restartable via offset.
    pub async fn list_versions(
        &self,
        student_id: Uuid,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<PeiVersion>> {
        let versions = self.repository.versions_of(student_id).await?;
        let page = match limit {
            Some(limit) => versions.into_iter().skip(offset).take(limit).collect(),
            None => versions.into_iter().skip(offset).collect(),
        };
        Ok(page)
    }

    pub async fn count_versions(&self, student_id: Uuid) -> Result<usize> {
        Ok(self.repository.versions_of(student_id).await?.len())
    }

    /// Field-level comparison of two versions. Pure over the stored
    /// payloads; no side effects.
    pub async fn compare_versions(
        &self,
        student_id: Uuid,
        from_version: u32,
        to_version: u32,
    ) -> Result<VersionDiff> {
        let from = self.get_version(student_id, from_version).await?;
        let to = self.get_version(student_id, to_version).await?;
        Ok(VersionDiff {
            from_version,
            to_version,
            changes: diff_payloads(&from.payload, &to.payload),
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn acquire(&self, student_id: Uuid) -> Result<OwnedMutexGuard<()>> {
        let lock = self
            .locks
            .entry(student_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                warn!(student_id = %student_id, "student write lock acquisition timed out");
                RecordStoreError::conflict("timed out waiting for the student write lock")
            })
    }

    async fn next_version_number(&self, student_id: Uuid) -> Result<u32> {
        let versions = self.repository.versions_of(student_id).await?;
        Ok(versions
            .iter()
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0)
            + 1)
    }

    async fn commit_with_retry(&self, version: PeiVersion) -> Result<PeiVersion> {
        let mut attempt = 0;
        loop {
            match self.repository.commit_active(version.clone()).await {
                Ok(committed) => return Ok(committed),
                Err(err) if err.is_transient() && attempt < self.write_retries => {
                    attempt += 1;
                    warn!(
                        student_id = %version.student_id,
                        attempt,
                        %err,
                        "transient commit failure; retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VersionStatus;
    use crate::repository::InMemoryVersionRepository;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use serde_json::json;
    use tokio::sync::Barrier;

    fn store() -> PeiStore {
        PeiStore::new(
            Arc::new(InMemoryVersionRepository::new()),
            Duration::from_secs(2),
        )
    }

    fn payload(marker: &str) -> PeiPayload {
        PeiPayload::new(json!({"cid": marker}), json!({}), json!({}))
    }

    #[tokio::test]
    async fn round_trip_returns_the_submitted_payload() {
        let store = store();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();

        let submitted = payload("F84.0");
        store
            .create_version(student, author, submitted.clone())
            .await
            .unwrap();

        let active = store.get_active(student).await.unwrap();
        assert_eq!(active.payload, submitted);
        assert_eq!(active.version_number, 1);
        assert_eq!(store.count_versions(student).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn new_version_retires_the_prior_active() {
        let store = store();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();

        store.create_version(student, author, payload("a")).await.unwrap();
        store.create_version(student, author, payload("b")).await.unwrap();

        let versions = store.list_versions(student, 0, None).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version_number, 1);
        assert_eq!(versions[0].status, VersionStatus::Obsolete);
        assert_eq!(versions[1].version_number, 2);
        assert_eq!(versions[1].status, VersionStatus::Active);
    }

    #[tokio::test]
    async fn identical_payload_still_creates_a_new_version() {
        let store = store();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();

        let same = payload("same");
        store.create_version(student, author, same.clone()).await.unwrap();
        let second = store.create_version(student, author, same).await.unwrap();

        assert_eq!(second.version_number, 2);
        assert_eq!(store.count_versions(student).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn concurrent_burst_keeps_exactly_one_active() {
        let store = Arc::new(store());
        let student = Uuid::new_v4();
        let tasks = 8;
        let barrier = Arc::new(Barrier::new(tasks));

        let mut handles = Vec::new();
        for i in 0..tasks {
            let store = store.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                store
                    .create_version(student, Uuid::new_v4(), payload(&format!("v{i}")))
                    .await
            }));
        }

        let mut version_numbers = Vec::new();
        for handle in handles {
            let version = handle.await.unwrap().unwrap();
            version_numbers.push(version.version_number);
        }

        // Every writer serialized onto a distinct number.
        version_numbers.sort_unstable();
        let expected: Vec<u32> = (1..=tasks as u32).collect();
        assert_eq!(version_numbers, expected);

        let versions = store.list_versions(student, 0, None).await.unwrap();
        let active: Vec<&PeiVersion> = versions.iter().filter(|v| v.is_active()).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].version_number, tasks as u32);
    }

    #[tokio::test]
    async fn draft_lifecycle_submit_activates_and_retires() {
        let store = store();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();

        store.create_version(student, author, payload("v1")).await.unwrap();
        let draft = store.save_draft(student, author, payload("v2")).await.unwrap();
        assert_eq!(draft.status, VersionStatus::Draft);

        // The draft does not disturb the Active chain until submitted.
        assert_eq!(store.get_active(student).await.unwrap().version_number, 1);

        let approval = Approval {
            approved_by: Uuid::new_v4(),
            approved_at: chrono::Utc::now(),
        };
        let promoted = store
            .submit_draft(student, draft.version_number, Some(approval.clone()))
            .await
            .unwrap();
        assert_eq!(promoted.status, VersionStatus::Active);
        assert_eq!(promoted.approval, Some(approval));
        assert_eq!(store.get_active(student).await.unwrap().version_number, 2);

        let v1 = store.get_version(student, 1).await.unwrap();
        assert_eq!(v1.status, VersionStatus::Obsolete);
    }

    #[tokio::test]
    async fn restore_appends_a_new_version_with_the_old_payload() {
        let store = store();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();

        let original = payload("original");
        store.create_version(student, author, original.clone()).await.unwrap();
        store.create_version(student, author, payload("revised")).await.unwrap();

        let restored = store.restore_version(student, 1, author).await.unwrap();
        assert_eq!(restored.version_number, 3);
        assert_eq!(restored.payload, original);

        let versions = store.list_versions(student, 0, None).await.unwrap();
        assert_eq!(versions.len(), 3);
        assert!(versions[2].is_active());
    }

    #[tokio::test]
    async fn list_versions_pages_ascending() {
        let store = store();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();
        for i in 0..5 {
            store
                .create_version(student, author, payload(&format!("v{i}")))
                .await
                .unwrap();
        }

        let page = store.list_versions(student, 2, Some(2)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].version_number, 3);
        assert_eq!(page[1].version_number, 4);
    }

    #[tokio::test]
    async fn missing_student_or_version_is_not_found() {
        let store = store();
        let student = Uuid::new_v4();

        assert!(matches!(
            store.get_active(student).await.unwrap_err(),
            RecordStoreError::NoVersions(_)
        ));
        assert!(matches!(
            store.get_version(student, 1).await.unwrap_err(),
            RecordStoreError::VersionNotFound { .. }
        ));
        assert!(store.list_versions(student, 0, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn compare_versions_reports_field_changes() {
        let store = store();
        let student = Uuid::new_v4();
        let author = Uuid::new_v4();

        store
            .create_version(
                student,
                author,
                PeiPayload::new(json!({"cid": "F84.0"}), json!({"goals": 1}), json!({})),
            )
            .await
            .unwrap();
        store
            .create_version(
                student,
                author,
                PeiPayload::new(json!({"cid": "F84.0"}), json!({"goals": 2}), json!({})),
            )
            .await
            .unwrap();

        let diff = store.compare_versions(student, 1, 2).await.unwrap();
        assert_eq!(diff.changed_field_names(), vec!["planning.goals".to_string()]);
    }

    /// Repository that fails `commit_active` a fixed number of times.
    struct FlakyRepository {
        inner: InMemoryVersionRepository,
        failures_left: SyncMutex<u32>,
    }

    #[async_trait]
    impl VersionRepository for FlakyRepository {
        async fn versions_of(&self, student_id: Uuid) -> Result<Vec<PeiVersion>> {
            self.inner.versions_of(student_id).await
        }
        async fn get(&self, student_id: Uuid, version_number: u32) -> Result<Option<PeiVersion>> {
            self.inner.get(student_id, version_number).await
        }
        async fn active_of(&self, student_id: Uuid) -> Result<Option<PeiVersion>> {
            self.inner.active_of(student_id).await
        }
        async fn insert(&self, version: PeiVersion) -> Result<()> {
            self.inner.insert(version).await
        }
        async fn commit_active(&self, version: PeiVersion) -> Result<PeiVersion> {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(RecordStoreError::persistence("simulated outage"));
            }
            drop(left);
            self.inner.commit_active(version).await
        }
        async fn promote_draft(
            &self,
            student_id: Uuid,
            version_number: u32,
            approval: Option<Approval>,
        ) -> Result<PeiVersion> {
            self.inner.promote_draft(student_id, version_number, approval).await
        }
    }

    #[tokio::test]
    async fn transient_commit_failures_are_retried_then_surface() {
        let repo = Arc::new(FlakyRepository {
            inner: InMemoryVersionRepository::new(),
            failures_left: SyncMutex::new(2),
        });
        let store = PeiStore::new(repo, Duration::from_secs(2)).with_write_retries(2);
        let student = Uuid::new_v4();

        // Two failures, two retries: the write lands.
        let version = store
            .create_version(student, Uuid::new_v4(), payload("v1"))
            .await
            .unwrap();
        assert_eq!(version.version_number, 1);

        let exhausted = Arc::new(FlakyRepository {
            inner: InMemoryVersionRepository::new(),
            failures_left: SyncMutex::new(5),
        });
        let store = PeiStore::new(exhausted, Duration::from_secs(2)).with_write_retries(2);
        let err = store
            .create_version(student, Uuid::new_v4(), payload("v1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordStoreError::Persistence(_)));
    }
}
