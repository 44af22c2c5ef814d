use chrono::{DateTime, Utc};

use super::snapshot::Sequences;
use super::{LocalStore, StoreError};
use crate::pipeline::{
    Assessment, AssessmentDraft, AssessmentId, JobId, Submission, SubmissionDraft, SubmissionId,
    TimelineKind, ValidationErrors,
};

impl LocalStore {
    pub fn get_assessment(&self, job_id: &JobId) -> Result<Assessment, StoreError> {
        self.read()
            .assessments
            .get(job_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("assessment", job_id))
    }

    /// Creates or replaces the assessment attached to `job_id`, keeping its id stable.
    pub fn save_assessment(
        &self,
        job_id: &JobId,
        draft: AssessmentDraft,
    ) -> Result<Assessment, StoreError> {
        draft.validate()?;

        self.write(|state| {
            if !state.jobs.contains_key(job_id) {
                return Err(StoreError::not_found("job", job_id));
            }

            let id = match state.assessments.get(job_id) {
                Some(existing) => existing.id.clone(),
                None => AssessmentId(Sequences::next(
                    &mut state.sequences.assessments,
                    "asmt",
                )),
            };

            let assessment = Assessment {
                id,
                job_id: job_id.clone(),
                title: draft.title.trim().to_string(),
                sections: draft.sections,
                updated_at: Utc::now(),
            };
            state.assessments.insert(job_id.clone(), assessment.clone());
            Ok(assessment)
        })
    }

    pub fn submit_assessment(
        &self,
        job_id: &JobId,
        draft: SubmissionDraft,
    ) -> Result<Submission, StoreError> {
        self.submit_assessment_at(job_id, draft, Utc::now())
    }

    pub(crate) fn submit_assessment_at(
        &self,
        job_id: &JobId,
        draft: SubmissionDraft,
        at: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        self.write(|state| {
            let assessment = state
                .assessments
                .get(job_id)
                .ok_or_else(|| StoreError::not_found("assessment", job_id))?;
            let candidate = state
                .candidates
                .get(&draft.candidate_id)
                .ok_or_else(|| StoreError::not_found("candidate", &draft.candidate_id))?;
            if candidate.job_id != *job_id {
                return Err(ValidationErrors::single(
                    "candidate_id",
                    format!(
                        "candidate '{}' applied to job '{}', not '{job_id}'",
                        candidate.id, candidate.job_id
                    ),
                )
                .into());
            }

            let evaluated = assessment.evaluate(&draft.answers)?;
            let assessment_id = assessment.id.clone();

            let id = SubmissionId(Sequences::next(&mut state.sequences.submissions, "sub"));
            let submission = Submission {
                id: id.clone(),
                assessment_id,
                job_id: job_id.clone(),
                candidate_id: draft.candidate_id.clone(),
                answers: evaluated.answers,
                score: evaluated.score,
                submitted_at: at,
            };

            if let Some(candidate) = state.candidates.get_mut(&draft.candidate_id) {
                candidate.record(
                    at,
                    TimelineKind::AssessmentSubmitted {
                        submission_id: id.clone(),
                        score: submission.score,
                    },
                );
            }
            state.submissions.insert(id, submission.clone());
            Ok(submission)
        })
    }

    /// Submissions for a job, oldest first.
    pub fn list_submissions(&self, job_id: &JobId) -> Vec<Submission> {
        let state = self.read();
        let mut submissions: Vec<Submission> = state
            .submissions
            .values()
            .filter(|submission| submission.job_id == *job_id)
            .cloned()
            .collect();
        submissions.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        submissions
    }
}
