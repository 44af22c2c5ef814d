//! Deterministic demo data: jobs, candidates walked through the pipeline, assessments and
//! submissions.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pipeline::{
    Answer, AssessmentDraft, Candidate, CandidateDraft, Condition, FileAnswer, Job, JobDraft,
    JobPatch, JobStatus, NoteDraft, Question, QuestionKind, QuestionValidation, Section, Stage,
    SubmissionDraft,
};
use crate::store::{LocalStore, StoreError};

const LEVELS: [&str; 5] = ["Junior", "Mid-level", "Senior", "Staff", "Principal"];
const ROLES: [&str; 10] = [
    "Rust Engineer",
    "Frontend Engineer",
    "Platform Engineer",
    "Data Engineer",
    "Product Designer",
    "Site Reliability Engineer",
    "Security Engineer",
    "Engineering Manager",
    "QA Engineer",
    "Developer Advocate",
];
const DEPARTMENTS: [&str; 5] = ["Engineering", "Design", "Infrastructure", "Data", "Security"];
const LOCATIONS: [&str; 6] = ["Remote", "Berlin", "London", "Lisbon", "New York", "Toronto"];
const TAGS: [&str; 10] = [
    "rust", "typescript", "react", "kubernetes", "postgres", "aws", "ml", "design-systems",
    "on-call", "leadership",
];
const FIRST_NAMES: [&str; 20] = [
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Ken", "Margaret", "Dennis", "Frances", "John",
    "Radia", "Linus", "Shafi", "Tim", "Hedy", "Donald", "Sophie", "Guido", "Katherine", "Niklaus",
];
const LAST_NAMES: [&str; 20] = [
    "Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Thompson", "Hamilton", "Ritchie",
    "Allen", "McCarthy", "Perlman", "Torvalds", "Goldwasser", "Berners-Lee", "Lamarr", "Knuth",
    "Wilson", "van Rossum", "Johnson", "Wirth",
];
const NOTES: [&str; 5] = [
    "Strong portfolio, loop in @hiring.manager for the next round.",
    "Asked about remote flexibility; @recruiting please follow up.",
    "Great systems depth in the phone screen.",
    "Salary expectations above band, flagging for @finance.",
    "Reference check scheduled with @ops.",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPlan {
    pub jobs: usize,
    pub candidates: usize,
    pub assessments: usize,
    pub rng_seed: u64,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            jobs: 25,
            candidates: 1000,
            assessments: 3,
            rng_seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub jobs: usize,
    pub archived_jobs: usize,
    pub candidates: usize,
    pub assessments: usize,
    pub submissions: usize,
    pub notes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("store already holds data; clear it before seeding")]
    NotEmpty,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Populates an empty store. The same plan always produces the same records, apart from
/// timestamps which are relative to now.
///
/// The whole run is one store batch, so a file-backed store is written once at the end.
pub fn seed(store: &LocalStore, plan: &SeedPlan) -> Result<SeedSummary, SeedError> {
    if !store.is_empty() {
        return Err(SeedError::NotEmpty);
    }
    store.batch(|store| populate(store, plan))
}

fn populate(store: &LocalStore, plan: &SeedPlan) -> Result<SeedSummary, SeedError> {
    let mut rng = StdRng::seed_from_u64(plan.rng_seed);
    let now = Utc::now();
    let mut summary = SeedSummary::default();

    let mut jobs = Vec::with_capacity(plan.jobs);
    for index in 0..plan.jobs {
        let job = store.create_job(job_draft(&mut rng, index))?;
        let job = if rng.gen_bool(0.2) {
            summary.archived_jobs += 1;
            store.update_job(
                &job.id,
                JobPatch {
                    status: Some(JobStatus::Archived),
                    ..JobPatch::default()
                },
            )?
        } else {
            job
        };
        jobs.push(job);
    }
    summary.jobs = jobs.len();

    let assessed: Vec<&Job> = jobs
        .iter()
        .filter(|job| job.status == JobStatus::Active)
        .take(plan.assessments)
        .collect();
    for job in &assessed {
        store.save_assessment(&job.id, assessment_draft(job))?;
        summary.assessments += 1;
    }

    if jobs.is_empty() {
        info!(?summary, "seed complete");
        return Ok(summary);
    }

    for index in 0..plan.candidates {
        let job = &jobs[rng.gen_range(0..jobs.len())];
        let age_days = rng.gen_range(1..=120);
        let applied_at = now - Duration::days(age_days);
        let candidate =
            store.create_candidate_at(candidate_draft(&mut rng, index, job), applied_at)?;
        summary.candidates += 1;

        let step = Duration::days(rng.gen_range(1..=(age_days / 5).max(1)));
        let candidate = walk_pipeline(store, &mut rng, candidate, step)?;

        if rng.gen_bool(0.1) {
            let body = NOTES[rng.gen_range(0..NOTES.len())];
            let at = candidate.updated_at.min(now);
            store.add_note_at(
                &candidate.id,
                NoteDraft {
                    body: body.to_string(),
                },
                at,
            )?;
            summary.notes += 1;
        }

        let takes_assessment = candidate.furthest_stage().rank() >= Stage::Screen.rank()
            && assessed.iter().any(|job| job.id == candidate.job_id)
            && rng.gen_bool(0.6);
        if takes_assessment {
            let at = (candidate.updated_at + Duration::hours(rng.gen_range(1..12))).min(now);
            store.submit_assessment_at(
                &candidate.job_id,
                SubmissionDraft {
                    candidate_id: candidate.id.clone(),
                    answers: sample_answers(&mut rng),
                },
                at,
            )?;
            summary.submissions += 1;
        }
    }

    info!(
        jobs = summary.jobs,
        candidates = summary.candidates,
        assessments = summary.assessments,
        submissions = summary.submissions,
        "seed complete"
    );
    Ok(summary)
}

fn job_draft(rng: &mut StdRng, index: usize) -> JobDraft {
    let combinations = LEVELS.len() * ROLES.len();
    let role = ROLES[(index / LEVELS.len()) % ROLES.len()];
    let level = LEVELS[index % LEVELS.len()];
    let title = if index < combinations {
        format!("{level} {role}")
    } else {
        format!("{level} {role} {}", index / combinations + 1)
    };

    let tag_count = rng.gen_range(2..=3);
    let tags = TAGS
        .choose_multiple(rng, tag_count)
        .map(|tag| tag.to_string())
        .collect();

    JobDraft {
        description: Some(format!(
            "Join the team as a {} working on {}.",
            title.to_lowercase(),
            DEPARTMENTS[index % DEPARTMENTS.len()].to_lowercase()
        )),
        department: Some(DEPARTMENTS[index % DEPARTMENTS.len()].to_string()),
        location: Some(LOCATIONS[rng.gen_range(0..LOCATIONS.len())].to_string()),
        tags,
        slug: None,
        title,
    }
}

fn candidate_draft(rng: &mut StdRng, index: usize, job: &Job) -> CandidateDraft {
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    let handle = format!("{first}.{last}")
        .to_lowercase()
        .replace([' ', '-'], "");
    let phone = rng
        .gen_bool(0.7)
        .then(|| format!("+1-555-{:04}", rng.gen_range(0..10_000)));

    CandidateDraft {
        name: format!("{first} {last}"),
        email: format!("{handle}{index}@example.com"),
        phone,
        job_id: job.id.clone(),
    }
}

/// Picks a final stage and moves the candidate there one step at a time.
fn walk_pipeline(
    store: &LocalStore,
    rng: &mut StdRng,
    candidate: Candidate,
    step: Duration,
) -> Result<Candidate, StoreError> {
    let roll = rng.gen_range(0..100);
    let (target, rejected) = match roll {
        0..=34 => (Stage::Applied, false),
        35..=54 => (Stage::Screen, false),
        55..=69 => (Stage::Tech, false),
        70..=77 => (Stage::Offer, false),
        78..=84 => (Stage::Hired, false),
        _ => ([Stage::Applied, Stage::Screen, Stage::Tech][rng.gen_range(0..3)], true),
    };

    let mut candidate = if target == Stage::Applied {
        candidate
    } else {
        store.advance_candidate_at(&candidate.id, target, candidate.applied_at, step)?
    };
    if rejected {
        let at = candidate.updated_at + step;
        candidate = store.move_candidate_at(&candidate.id, Stage::Rejected, at)?;
    }
    Ok(candidate)
}

fn question(id: &str, prompt: &str, required: bool, kind: QuestionKind) -> Question {
    Question {
        id: id.to_string(),
        prompt: prompt.to_string(),
        required,
        kind,
        validation: QuestionValidation::default(),
        show_if: None,
    }
}

fn options(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(crate) fn assessment_draft(job: &Job) -> AssessmentDraft {
    let background = Section {
        id: "background".to_string(),
        title: "Background".to_string(),
        questions: vec![
            question(
                "experience",
                "How many years of professional experience do you have?",
                true,
                QuestionKind::SingleChoice {
                    options: options(&["0-2", "3-5", "6-10", "10+"]),
                    correct: None,
                },
            ),
            question("current_role", "What is your current role?", true, QuestionKind::ShortText),
            Question {
                validation: QuestionValidation {
                    min: Some(0.0),
                    max: Some(500_000.0),
                    ..QuestionValidation::default()
                },
                ..question(
                    "salary",
                    "Expected annual salary (USD)",
                    false,
                    QuestionKind::Numeric,
                )
            },
            question("resume", "Upload your resume", true, QuestionKind::FileUpload),
        ],
    };

    let technical = Section {
        id: "technical".to_string(),
        title: "Technical".to_string(),
        questions: vec![
            question(
                "ownership",
                "Which type lets a function read a value without taking ownership?",
                true,
                QuestionKind::SingleChoice {
                    options: options(&["T", "&T", "Box<T>", "Rc<T>"]),
                    correct: Some("&T".to_string()),
                },
            ),
            question(
                "sync_primitives",
                "Which of these can be shared across threads behind an Arc?",
                true,
                QuestionKind::MultiChoice {
                    options: options(&["Mutex<T>", "RefCell<T>", "RwLock<T>", "Cell<T>"]),
                    correct: options(&["Mutex<T>", "RwLock<T>"]),
                },
            ),
            question(
                "async_experience",
                "Have you shipped async code to production?",
                true,
                QuestionKind::SingleChoice {
                    options: options(&["Yes", "No"]),
                    correct: None,
                },
            ),
            Question {
                show_if: Some(Condition {
                    question_id: "async_experience".to_string(),
                    equals: "Yes".to_string(),
                }),
                validation: QuestionValidation {
                    min_length: Some(20),
                    ..QuestionValidation::default()
                },
                ..question(
                    "async_story",
                    "Describe the hardest async bug you fixed.",
                    true,
                    QuestionKind::LongText,
                )
            },
            Question {
                validation: QuestionValidation {
                    min: Some(0.0),
                    max: Some(40.0),
                    ..QuestionValidation::default()
                },
                ..question(
                    "systems_years",
                    "Years spent on systems programming",
                    true,
                    QuestionKind::Numeric,
                )
            },
        ],
    };

    let wrap_up = Section {
        id: "wrap_up".to_string(),
        title: "Wrap-up".to_string(),
        questions: vec![
            Question {
                validation: QuestionValidation {
                    min_length: Some(20),
                    max_length: Some(1000),
                    ..QuestionValidation::default()
                },
                ..question(
                    "motivation",
                    &format!("Why do you want to join as {}?", job.title),
                    true,
                    QuestionKind::LongText,
                )
            },
            question(
                "relocate",
                "Are you open to relocating?",
                true,
                QuestionKind::SingleChoice {
                    options: options(&["Yes", "No"]),
                    correct: None,
                },
            ),
            Question {
                show_if: Some(Condition {
                    question_id: "relocate".to_string(),
                    equals: "Yes".to_string(),
                }),
                ..question(
                    "preferred_city",
                    "Which city would you prefer?",
                    false,
                    QuestionKind::ShortText,
                )
            },
            question(
                "start_date",
                "When could you start?",
                false,
                QuestionKind::ShortText,
            ),
        ],
    };

    AssessmentDraft {
        title: format!("{} assessment", job.title),
        sections: vec![background, technical, wrap_up],
    }
}

fn text(value: &str) -> Answer {
    Answer::Text(value.to_string())
}

fn choice(value: &str) -> Answer {
    Answer::Choice(value.to_string())
}

/// Plausible answers for the seeded assessment; some are deliberately wrong.
pub(crate) fn sample_answers(rng: &mut StdRng) -> BTreeMap<String, Answer> {
    let mut answers = BTreeMap::new();
    let experience = ["0-2", "3-5", "6-10", "10+"][rng.gen_range(0..4)];
    answers.insert("experience".to_string(), choice(experience));
    answers.insert("current_role".to_string(), text("Software Engineer"));
    if rng.gen_bool(0.5) {
        answers.insert(
            "salary".to_string(),
            Answer::Number(f64::from(rng.gen_range(60..=220u32)) * 1000.0),
        );
    }
    answers.insert(
        "resume".to_string(),
        Answer::File(FileAnswer {
            name: "resume.pdf".to_string(),
            size_bytes: rng.gen_range(40_000..400_000),
        }),
    );

    let ownership = if rng.gen_bool(0.75) { "&T" } else { "Box<T>" };
    answers.insert("ownership".to_string(), choice(ownership));
    let primitives = if rng.gen_bool(0.6) {
        options(&["Mutex<T>", "RwLock<T>"])
    } else {
        options(&["Mutex<T>", "RefCell<T>"])
    };
    answers.insert("sync_primitives".to_string(), Answer::Choices(primitives));

    if rng.gen_bool(0.6) {
        answers.insert("async_experience".to_string(), choice("Yes"));
        answers.insert(
            "async_story".to_string(),
            text("A cancelled future left a lock held across an await point."),
        );
    } else {
        answers.insert("async_experience".to_string(), choice("No"));
    }
    answers.insert(
        "systems_years".to_string(),
        Answer::Number(f64::from(rng.gen_range(0..=15u32))),
    );

    answers.insert(
        "motivation".to_string(),
        text("I enjoy building reliable tools with a small, focused team."),
    );
    if rng.gen_bool(0.4) {
        answers.insert("relocate".to_string(), choice("Yes"));
        answers.insert("preferred_city".to_string(), text("Lisbon"));
    } else {
        answers.insert("relocate".to_string(), choice("No"));
    }
    answers
}
