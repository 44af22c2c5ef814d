//! Hiring pipeline records: jobs, candidates, assessments, and submissions.

pub mod assessments;
pub mod candidates;
pub mod domain;
pub mod jobs;

pub use assessments::{
    Answer, Assessment, AssessmentDraft, Condition, FileAnswer, Question, QuestionKind,
    QuestionValidation, Section, Submission, SubmissionDraft,
};
pub use candidates::{
    extract_mentions, Candidate, CandidateDraft, CandidatePatch, CandidateQuery, Note, NoteDraft,
    StageMove, TimelineEvent, TimelineKind,
};
pub use domain::{
    AssessmentId, CandidateId, FieldError, JobId, JobStatus, NoteId, Page, Pagination, Stage,
    SubmissionId, ValidationErrors,
};
pub use jobs::{slugify, Job, JobDraft, JobPatch, JobQuery, JobSort, ReorderRequest};
