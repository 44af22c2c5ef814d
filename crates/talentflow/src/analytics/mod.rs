//! Dashboard figures derived from a store snapshot.

mod views;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::pipeline::{CandidateId, JobId, JobStatus, Stage, Submission};
use crate::store::Snapshot;

pub use views::{
    AssessmentCoverage, Dashboard, FunnelEntry, JobPipelineEntry, JobTotals, StageCountEntry,
};

fn ratio(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        0.0
    } else {
        part as f32 / whole as f32
    }
}

impl Dashboard {
    pub fn build(snapshot: &Snapshot, generated_at: DateTime<Utc>) -> Self {
        let candidates: Vec<_> = snapshot.candidates.values().collect();
        let total = candidates.len();

        let active = snapshot
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Active)
            .count();
        let jobs = JobTotals {
            total: snapshot.jobs.len(),
            active,
            archived: snapshot.jobs.len() - active,
        };

        let mut stage_counts: HashMap<Stage, usize> = HashMap::new();
        for candidate in &candidates {
            *stage_counts.entry(candidate.stage).or_default() += 1;
        }
        let stages = Stage::ordered()
            .into_iter()
            .map(|stage| {
                let count = stage_counts.get(&stage).copied().unwrap_or_default();
                StageCountEntry {
                    stage,
                    stage_label: stage.label().to_string(),
                    count,
                    share: ratio(count, total),
                }
            })
            .collect();

        let mut previous: Option<usize> = None;
        let funnel = Stage::funnel()
            .into_iter()
            .map(|stage| {
                let reached = candidates
                    .iter()
                    .filter(|candidate| candidate.furthest_stage().rank() >= stage.rank())
                    .count();
                let conversion = previous
                    .filter(|prior| *prior > 0)
                    .map(|prior| ratio(reached, prior));
                previous = Some(reached);
                FunnelEntry {
                    stage,
                    stage_label: stage.label().to_string(),
                    reached,
                    conversion,
                }
            })
            .collect();

        let rejected = stage_counts.get(&Stage::Rejected).copied().unwrap_or(0);

        let hire_days: Vec<f32> = candidates
            .iter()
            .filter(|candidate| candidate.stage == Stage::Hired)
            .filter_map(|candidate| {
                candidate
                    .entered_stage_at(Stage::Hired)
                    .map(|hired_at| (hired_at - candidate.applied_at).num_hours() as f32 / 24.0)
            })
            .collect();
        let average_days_to_hire = (!hire_days.is_empty())
            .then(|| hire_days.iter().sum::<f32>() / hire_days.len() as f32);

        let mut per_job: HashMap<&JobId, (usize, usize, usize, usize)> = HashMap::new();
        for candidate in &candidates {
            let entry = per_job.entry(&candidate.job_id).or_default();
            entry.0 += 1;
            match candidate.stage {
                Stage::Hired => entry.2 += 1,
                Stage::Rejected => entry.3 += 1,
                _ => entry.1 += 1,
            }
        }
        let mut job_pipelines: Vec<JobPipelineEntry> = snapshot
            .jobs
            .values()
            .map(|job| {
                let (total, in_progress, hired, rejected) =
                    per_job.get(&job.id).copied().unwrap_or_default();
                JobPipelineEntry {
                    job_id: job.id.clone(),
                    title: job.title.clone(),
                    status: job.status,
                    order: job.order,
                    candidates: total,
                    in_progress,
                    hired,
                    rejected,
                }
            })
            .collect();
        job_pipelines.sort_by_key(|entry| entry.order);

        let assessments = assessment_coverage(snapshot);

        tracing::debug!(candidates = total, "dashboard computed");

        Dashboard {
            generated_at,
            jobs,
            candidates: total,
            stages,
            funnel,
            rejection_rate: ratio(rejected, total),
            average_days_to_hire,
            job_pipelines,
            assessments,
        }
    }

    pub fn stage_count(&self, stage: Stage) -> usize {
        self.stages
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

/// Counts only each candidate's latest submission toward the average.
fn assessment_coverage(snapshot: &Snapshot) -> AssessmentCoverage {
    let mut latest: BTreeMap<&CandidateId, &Submission> = BTreeMap::new();
    for submission in snapshot.submissions.values() {
        latest
            .entry(&submission.candidate_id)
            .and_modify(|current| {
                if submission.submitted_at >= current.submitted_at {
                    *current = submission;
                }
            })
            .or_insert(submission);
    }

    let scores: Vec<f32> = latest
        .values()
        .filter_map(|submission| submission.score.map(f32::from))
        .collect();
    let average_score =
        (!scores.is_empty()).then(|| scores.iter().sum::<f32>() / scores.len() as f32);

    AssessmentCoverage {
        assessments: snapshot.assessments.len(),
        submissions: snapshot.submissions.len(),
        candidates_assessed: latest.len(),
        average_score,
    }
}
