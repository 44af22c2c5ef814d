use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    non_blank, CandidateId, JobId, NoteId, Pagination, Stage, SubmissionId, ValidationErrors,
};

/// Person moving through a job's hiring pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub stage: Stage,
    pub job_id: JobId,
    pub notes: Vec<Note>,
    pub timeline: Vec<TimelineEvent>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    /// Highest non-rejected stage ever reached, including the current one.
    pub fn furthest_stage(&self) -> Stage {
        self.timeline
            .iter()
            .filter_map(|event| match event.kind {
                TimelineKind::StageChanged { to, .. } => Some(to),
                _ => None,
            })
            .chain(std::iter::once(self.stage))
            .filter(|stage| *stage != Stage::Rejected)
            .max_by_key(|stage| stage.rank())
            .unwrap_or(Stage::Applied)
    }

    /// Moment the candidate entered `stage`, if they ever did.
    pub fn entered_stage_at(&self, stage: Stage) -> Option<DateTime<Utc>> {
        if stage == Stage::Applied {
            return Some(self.applied_at);
        }
        self.timeline.iter().find_map(|event| match event.kind {
            TimelineKind::StageChanged { to, .. } if to == stage => Some(event.at),
            _ => None,
        })
    }

    pub(crate) fn record(&mut self, at: DateTime<Utc>, kind: TimelineKind) {
        self.timeline.push(TimelineEvent { at, kind });
        self.updated_at = at;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub body: String,
    /// `@handle` mentions in order of first appearance, without the `@`.
    pub mentions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TimelineKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineKind {
    Created {
        stage: Stage,
    },
    StageChanged {
        from: Stage,
        to: Stage,
    },
    NoteAdded {
        note_id: NoteId,
    },
    AssessmentSubmitted {
        submission_id: SubmissionId,
        score: Option<u8>,
    },
}

impl TimelineKind {
    pub fn describe(&self) -> String {
        match self {
            TimelineKind::Created { stage } => format!("Applied ({})", stage.label()),
            TimelineKind::StageChanged { from, to } => {
                format!("Moved from {} to {}", from.label(), to.label())
            }
            TimelineKind::NoteAdded { note_id } => format!("Note {note_id} added"),
            TimelineKind::AssessmentSubmitted {
                submission_id,
                score,
            } => match score {
                Some(score) => format!("Assessment {submission_id} submitted (score {score})"),
                None => format!("Assessment {submission_id} submitted"),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateDraft {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub job_id: JobId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidatePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub stage: Option<Stage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl CandidateQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.page_size)
    }

    pub fn matches(&self, candidate: &Candidate) -> bool {
        if self.stage.is_some_and(|stage| stage != candidate.stage) {
            return false;
        }
        if let Some(job_id) = &self.job_id {
            if *job_id != candidate.job_id {
                return false;
            }
        }
        match self.search.as_deref().and_then(non_blank) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                candidate.name.to_lowercase().contains(&needle)
                    || candidate.email.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMove {
    pub stage: Stage,
}

pub(crate) fn validate_email(email: &str) -> Option<String> {
    let email = email.trim();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return None;
    }
    let (host, tld) = domain.rsplit_once('.')?;
    if host.is_empty() || tld.is_empty() {
        return None;
    }
    Some(email.to_ascii_lowercase())
}

/// Validated contact details of a new candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewCandidate {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
}

impl CandidateDraft {
    pub(crate) fn validate(&self) -> Result<NewCandidate, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = non_blank(&self.name);
        if name.is_none() {
            errors.push("name", "name is required");
        }
        let email = validate_email(&self.email);
        if email.is_none() {
            errors.push("email", "email address is invalid");
        }
        if non_blank(self.job_id.as_str()).is_none() {
            errors.push("job_id", "job is required");
        }

        errors.into_result()?;

        Ok(NewCandidate {
            name: name.unwrap_or_default(),
            email: email.unwrap_or_default(),
            phone: self.phone.as_deref().and_then(non_blank),
        })
    }
}

impl CandidatePatch {
    /// Applies contact changes to a copy of `candidate`; stage moves are handled separately.
    pub(crate) fn apply_contact(&self, candidate: &Candidate) -> Result<Candidate, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut updated = candidate.clone();

        if let Some(name) = &self.name {
            match non_blank(name) {
                Some(name) => updated.name = name,
                None => errors.push("name", "name is required"),
            }
        }
        if let Some(email) = &self.email {
            match validate_email(email) {
                Some(email) => updated.email = email,
                None => errors.push("email", "email address is invalid"),
            }
        }
        if let Some(phone) = &self.phone {
            updated.phone = non_blank(phone);
        }

        errors.into_result()?;
        Ok(updated)
    }
}

/// Distinct `@handle` mentions in order of first appearance.
pub fn extract_mentions(body: &str) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();

    for (index, _) in body.match_indices('@') {
        let preceded_by_word = body[..index]
            .chars()
            .next_back()
            .is_some_and(|ch| ch.is_alphanumeric());
        if preceded_by_word {
            continue;
        }

        let handle: String = body[index + 1..]
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
            .collect();
        let handle = handle.trim_end_matches('.');
        if handle.is_empty() {
            continue;
        }
        if !mentions.iter().any(|existing| existing.eq_ignore_ascii_case(handle)) {
            mentions.push(handle.to_string());
        }
    }

    mentions
}
