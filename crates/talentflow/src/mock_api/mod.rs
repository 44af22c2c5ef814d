//! Simulated REST API in front of the local store.
//!
//! Every call waits a random latency and may fail with an injected error before it reaches
//! the store, mimicking a flaky backend during front-end development.

mod chaos;
pub mod router;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::analytics::Dashboard;
use crate::pipeline::{
    Assessment, AssessmentDraft, Candidate, CandidateDraft, CandidateId, CandidatePatch,
    CandidateQuery, Job, JobDraft, JobId, JobPatch, JobQuery, Note, NoteDraft, Page,
    ReorderRequest, Stage, Submission, SubmissionDraft, TimelineEvent,
};
use crate::store::{LocalStore, StoreError};

pub use chaos::{ChaosConfig, FaultInjector, OperationClass, RoundTrip};
pub use router::hiring_router;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("simulated server error during {operation}")]
    Unavailable { operation: &'static str },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Injected failures say nothing about the data and may be retried elsewhere.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Unavailable { .. })
    }
}

pub struct MockApi {
    store: Arc<LocalStore>,
    chaos: FaultInjector,
}

impl MockApi {
    pub fn new(store: Arc<LocalStore>, chaos: ChaosConfig) -> Self {
        Self {
            store,
            chaos: FaultInjector::new(chaos),
        }
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn chaos(&self) -> &ChaosConfig {
        self.chaos.config()
    }

    async fn round_trip(
        &self,
        operation: &'static str,
        class: OperationClass,
    ) -> Result<(), ApiError> {
        let trip = self.chaos.plan(class);
        if !trip.latency.is_zero() {
            tokio::time::sleep(trip.latency).await;
        }

        if trip.fail {
            warn!(operation, latency_ms = trip.latency.as_millis() as u64, "injected api failure");
            return Err(ApiError::Unavailable { operation });
        }

        debug!(operation, latency_ms = trip.latency.as_millis() as u64, "api call");
        Ok(())
    }

    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Page<Job>, ApiError> {
        self.round_trip("jobs.list", OperationClass::Read).await?;
        Ok(self.store.list_jobs(query))
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Job, ApiError> {
        self.round_trip("jobs.get", OperationClass::Read).await?;
        Ok(self.store.get_job(id)?)
    }

    pub async fn create_job(&self, draft: JobDraft) -> Result<Job, ApiError> {
        self.round_trip("jobs.create", OperationClass::Write).await?;
        Ok(self.store.create_job(draft)?)
    }

    pub async fn update_job(&self, id: &JobId, patch: JobPatch) -> Result<Job, ApiError> {
        self.round_trip("jobs.update", OperationClass::Write).await?;
        Ok(self.store.update_job(id, patch)?)
    }

    pub async fn reorder_job(&self, id: &JobId, request: ReorderRequest) -> Result<Job, ApiError> {
        self.round_trip("jobs.reorder", OperationClass::Reorder)
            .await?;
        Ok(self.store.reorder_job(id, request)?)
    }

    pub async fn list_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Page<Candidate>, ApiError> {
        self.round_trip("candidates.list", OperationClass::Read)
            .await?;
        Ok(self.store.list_candidates(query))
    }

    pub async fn get_candidate(&self, id: &CandidateId) -> Result<Candidate, ApiError> {
        self.round_trip("candidates.get", OperationClass::Read)
            .await?;
        Ok(self.store.get_candidate(id)?)
    }

    pub async fn create_candidate(&self, draft: CandidateDraft) -> Result<Candidate, ApiError> {
        self.round_trip("candidates.create", OperationClass::Write)
            .await?;
        Ok(self.store.create_candidate(draft)?)
    }

    pub async fn update_candidate(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, ApiError> {
        self.round_trip("candidates.update", OperationClass::Write)
            .await?;
        Ok(self.store.update_candidate(id, patch)?)
    }

    pub async fn move_candidate(&self, id: &CandidateId, to: Stage) -> Result<Candidate, ApiError> {
        self.round_trip("candidates.move", OperationClass::Write)
            .await?;
        Ok(self.store.move_candidate(id, to)?)
    }

    pub async fn add_note(&self, id: &CandidateId, draft: NoteDraft) -> Result<Note, ApiError> {
        self.round_trip("candidates.note", OperationClass::Write)
            .await?;
        Ok(self.store.add_note(id, draft)?)
    }

    pub async fn candidate_timeline(
        &self,
        id: &CandidateId,
    ) -> Result<Vec<TimelineEvent>, ApiError> {
        self.round_trip("candidates.timeline", OperationClass::Read)
            .await?;
        Ok(self.store.candidate_timeline(id)?)
    }

    pub async fn get_assessment(&self, job_id: &JobId) -> Result<Assessment, ApiError> {
        self.round_trip("assessments.get", OperationClass::Read)
            .await?;
        Ok(self.store.get_assessment(job_id)?)
    }

    pub async fn save_assessment(
        &self,
        job_id: &JobId,
        draft: AssessmentDraft,
    ) -> Result<Assessment, ApiError> {
        self.round_trip("assessments.save", OperationClass::Write)
            .await?;
        Ok(self.store.save_assessment(job_id, draft)?)
    }

    pub async fn submit_assessment(
        &self,
        job_id: &JobId,
        draft: SubmissionDraft,
    ) -> Result<Submission, ApiError> {
        self.round_trip("assessments.submit", OperationClass::Write)
            .await?;
        Ok(self.store.submit_assessment(job_id, draft)?)
    }

    pub async fn list_submissions(&self, job_id: &JobId) -> Result<Vec<Submission>, ApiError> {
        self.round_trip("submissions.list", OperationClass::Read)
            .await?;
        Ok(self.store.list_submissions(job_id))
    }

    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        self.round_trip("analytics.dashboard", OperationClass::Read)
            .await?;
        Ok(self.store.dashboard())
    }
}
