//! Data access facade used by callers: a TTL cache in front of the simulated API, falling back
//! to the local store when the API injects a failure.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analytics::Dashboard;
use crate::cache::{cache_key, CacheStats, TtlCache};
use crate::mock_api::{ApiError, MockApi};
use crate::pipeline::{
    Assessment, AssessmentDraft, Candidate, CandidateDraft, CandidateId, CandidatePatch,
    CandidateQuery, Job, JobDraft, JobId, JobPatch, JobQuery, Note, NoteDraft, Page,
    ReorderRequest, Stage, Submission, SubmissionDraft, TimelineEvent,
};
use crate::store::{LocalStore, StoreError};

const JOBS: &str = "jobs.";
const CANDIDATES: &str = "candidates.";
const ASSESSMENTS: &str = "assessments.";
const SUBMISSIONS: &str = "submissions.";
const ANALYTICS: &str = "analytics.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Cache,
    Api,
    LocalStore,
}

impl DataSource {
    pub fn label(self) -> &'static str {
        match self {
            DataSource::Cache => "cache",
            DataSource::Api => "api",
            DataSource::LocalStore => "local store",
        }
    }
}

/// A value together with where it was served from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: DataSource,
}

/// Whether injected API failures are retried against the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub reads: bool,
    pub writes: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            reads: true,
            writes: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DataServiceError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DataServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DataServiceError::Api(error) if error.is_transient())
    }

    /// The write was applied to the store but its snapshot could not be saved.
    pub fn is_unsaved_write(&self) -> bool {
        matches!(
            self,
            DataServiceError::Api(ApiError::Store(StoreError::Snapshot(_)))
                | DataServiceError::Store(StoreError::Snapshot(_))
        )
    }
}

pub struct DataService {
    api: Arc<MockApi>,
    store: Arc<LocalStore>,
    cache: TtlCache,
    policy: FallbackPolicy,
}

impl DataService {
    pub fn new(api: Arc<MockApi>, cache: TtlCache, policy: FallbackPolicy) -> Self {
        let store = api.store().clone();
        Self {
            api,
            store,
            cache,
            policy,
        }
    }

    pub fn api(&self) -> &Arc<MockApi> {
        &self.api
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    async fn read_through<T, P>(
        &self,
        operation: &'static str,
        params: &P,
        remote: impl Future<Output = Result<T, ApiError>>,
        local: impl FnOnce(&LocalStore) -> Result<T, StoreError>,
    ) -> Result<Fetched<T>, DataServiceError>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize,
    {
        let key = cache_key(operation, params);
        if let Some(value) = self.cache.get(&key) {
            return Ok(Fetched {
                value,
                source: DataSource::Cache,
            });
        }
        let generation = self.cache.generation();

        let (value, source) = match remote.await {
            Ok(value) => (value, DataSource::Api),
            Err(error) if error.is_transient() && self.policy.reads => {
                warn!(operation, %error, "api read failed, serving from local store");
                (local(&self.store)?, DataSource::LocalStore)
            }
            Err(error) => return Err(error.into()),
        };

        self.cache.insert_if_current(key, &value, generation);
        Ok(Fetched { value, source })
    }

    async fn write_through<T>(
        &self,
        operation: &'static str,
        invalidates: &[&str],
        remote: impl Future<Output = Result<T, ApiError>>,
        local: impl FnOnce(&LocalStore) -> Result<T, StoreError>,
    ) -> Result<Fetched<T>, DataServiceError> {
        let outcome = match remote.await {
            Ok(value) => Ok((value, DataSource::Api)),
            Err(error) if error.is_transient() && self.policy.writes => {
                warn!(operation, %error, "api write failed, writing to local store");
                local(&self.store)
                    .map(|value| (value, DataSource::LocalStore))
                    .map_err(DataServiceError::from)
            }
            Err(error) => Err(error.into()),
        };

        match outcome {
            Ok((value, source)) => {
                self.invalidate(invalidates);
                Ok(Fetched { value, source })
            }
            Err(error) => {
                if error.is_unsaved_write() {
                    warn!(operation, %error, "write kept in memory but not saved");
                    self.invalidate(invalidates);
                }
                Err(error)
            }
        }
    }

    fn invalidate(&self, patterns: &[&str]) {
        for pattern in patterns {
            self.cache.invalidate(pattern);
        }
    }

    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Fetched<Page<Job>>, DataServiceError> {
        self.read_through("jobs.list", query, self.api.list_jobs(query), |store| {
            Ok(store.list_jobs(query))
        })
        .await
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Fetched<Job>, DataServiceError> {
        self.read_through("jobs.get", id, self.api.get_job(id), |store| {
            store.get_job(id)
        })
        .await
    }

    pub async fn create_job(&self, draft: JobDraft) -> Result<Fetched<Job>, DataServiceError> {
        self.write_through(
            "jobs.create",
            &[JOBS, ANALYTICS],
            self.api.create_job(draft.clone()),
            |store| store.create_job(draft),
        )
        .await
    }

    pub async fn update_job(
        &self,
        id: &JobId,
        patch: JobPatch,
    ) -> Result<Fetched<Job>, DataServiceError> {
        self.write_through(
            "jobs.update",
            &[JOBS, ANALYTICS],
            self.api.update_job(id, patch.clone()),
            |store| store.update_job(id, patch),
        )
        .await
    }

    pub async fn reorder_job(
        &self,
        id: &JobId,
        request: ReorderRequest,
    ) -> Result<Fetched<Job>, DataServiceError> {
        self.write_through(
            "jobs.reorder",
            &[JOBS, ANALYTICS],
            self.api.reorder_job(id, request),
            |store| store.reorder_job(id, request),
        )
        .await
    }

    pub async fn list_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Fetched<Page<Candidate>>, DataServiceError> {
        self.read_through(
            "candidates.list",
            query,
            self.api.list_candidates(query),
            |store| Ok(store.list_candidates(query)),
        )
        .await
    }

    pub async fn get_candidate(
        &self,
        id: &CandidateId,
    ) -> Result<Fetched<Candidate>, DataServiceError> {
        self.read_through("candidates.get", id, self.api.get_candidate(id), |store| {
            store.get_candidate(id)
        })
        .await
    }

    pub async fn create_candidate(
        &self,
        draft: CandidateDraft,
    ) -> Result<Fetched<Candidate>, DataServiceError> {
        self.write_through(
            "candidates.create",
            &[CANDIDATES, ANALYTICS],
            self.api.create_candidate(draft.clone()),
            |store| store.create_candidate(draft),
        )
        .await
    }

    pub async fn update_candidate(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Fetched<Candidate>, DataServiceError> {
        self.write_through(
            "candidates.update",
            &[CANDIDATES, ANALYTICS],
            self.api.update_candidate(id, patch.clone()),
            |store| store.update_candidate(id, patch),
        )
        .await
    }

    pub async fn move_candidate(
        &self,
        id: &CandidateId,
        to: Stage,
    ) -> Result<Fetched<Candidate>, DataServiceError> {
        self.write_through(
            "candidates.move",
            &[CANDIDATES, ANALYTICS],
            self.api.move_candidate(id, to),
            |store| store.move_candidate(id, to),
        )
        .await
    }

    pub async fn add_note(
        &self,
        id: &CandidateId,
        draft: NoteDraft,
    ) -> Result<Fetched<Note>, DataServiceError> {
        self.write_through(
            "candidates.note",
            &[CANDIDATES, ANALYTICS],
            self.api.add_note(id, draft.clone()),
            |store| store.add_note(id, draft),
        )
        .await
    }

    pub async fn candidate_timeline(
        &self,
        id: &CandidateId,
    ) -> Result<Fetched<Vec<TimelineEvent>>, DataServiceError> {
        self.read_through(
            "candidates.timeline",
            id,
            self.api.candidate_timeline(id),
            |store| store.candidate_timeline(id),
        )
        .await
    }

    pub async fn get_assessment(
        &self,
        job_id: &JobId,
    ) -> Result<Fetched<Assessment>, DataServiceError> {
        self.read_through(
            "assessments.get",
            job_id,
            self.api.get_assessment(job_id),
            |store| store.get_assessment(job_id),
        )
        .await
    }

    pub async fn save_assessment(
        &self,
        job_id: &JobId,
        draft: AssessmentDraft,
    ) -> Result<Fetched<Assessment>, DataServiceError> {
        self.write_through(
            "assessments.save",
            &[ASSESSMENTS, ANALYTICS],
            self.api.save_assessment(job_id, draft.clone()),
            |store| store.save_assessment(job_id, draft),
        )
        .await
    }

    pub async fn submit_assessment(
        &self,
        job_id: &JobId,
        draft: SubmissionDraft,
    ) -> Result<Fetched<Submission>, DataServiceError> {
        self.write_through(
            "assessments.submit",
            &[CANDIDATES, SUBMISSIONS, ANALYTICS],
            self.api.submit_assessment(job_id, draft.clone()),
            |store| store.submit_assessment(job_id, draft),
        )
        .await
    }

    pub async fn list_submissions(
        &self,
        job_id: &JobId,
    ) -> Result<Fetched<Vec<Submission>>, DataServiceError> {
        self.read_through(
            "submissions.list",
            job_id,
            self.api.list_submissions(job_id),
            |store| Ok(store.list_submissions(job_id)),
        )
        .await
    }

    pub async fn dashboard(&self) -> Result<Fetched<Dashboard>, DataServiceError> {
        self.read_through("analytics.dashboard", &(), self.api.dashboard(), |store| {
            Ok(store.dashboard())
        })
        .await
    }
}
