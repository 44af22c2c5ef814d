use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::{JobId, JobStatus, Stage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTotals {
    pub total: usize,
    pub active: usize,
    pub archived: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCountEntry {
    pub stage: Stage,
    pub stage_label: String,
    pub count: usize,
    /// Fraction of all candidates currently in this stage.
    pub share: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelEntry {
    pub stage: Stage,
    pub stage_label: String,
    pub reached: usize,
    /// Share of the previous funnel step that made it here; `None` for the first step or when
    /// nobody reached the previous step.
    pub conversion: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPipelineEntry {
    pub job_id: JobId,
    pub title: String,
    pub status: JobStatus,
    pub order: u32,
    pub candidates: usize,
    pub in_progress: usize,
    pub hired: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentCoverage {
    pub assessments: usize,
    pub submissions: usize,
    pub candidates_assessed: usize,
    pub average_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub jobs: JobTotals,
    pub candidates: usize,
    pub stages: Vec<StageCountEntry>,
    pub funnel: Vec<FunnelEntry>,
    pub rejection_rate: f32,
    pub average_days_to_hire: Option<f32>,
    pub job_pipelines: Vec<JobPipelineEntry>,
    pub assessments: AssessmentCoverage,
}
