use chrono::{DateTime, Utc};

use super::snapshot::{Sequences, Snapshot};
use super::{LocalStore, StoreError};
use crate::pipeline::{
    extract_mentions, Candidate, CandidateDraft, CandidateId, CandidatePatch, CandidateQuery,
    Note, NoteDraft, NoteId, Page, Stage, TimelineEvent, TimelineKind, ValidationErrors,
};

fn email_taken(state: &Snapshot, email: &str, except: Option<&CandidateId>) -> bool {
    state
        .candidates
        .values()
        .any(|c| Some(&c.id) != except && c.email.eq_ignore_ascii_case(email))
}

fn check_transition(from: Stage, to: Stage) -> Result<(), StoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition { from, to })
    }
}

impl LocalStore {
    pub fn list_candidates(&self, query: &CandidateQuery) -> Page<Candidate> {
        let state = self.read();
        let mut candidates: Vec<Candidate> = state
            .candidates
            .values()
            .filter(|candidate| query.matches(candidate))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Page::slice(candidates, query.pagination())
    }

    pub fn get_candidate(&self, id: &CandidateId) -> Result<Candidate, StoreError> {
        self.read()
            .candidates
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("candidate", id))
    }

    pub fn create_candidate(&self, draft: CandidateDraft) -> Result<Candidate, StoreError> {
        self.create_candidate_at(draft, Utc::now())
    }

    pub(crate) fn create_candidate_at(
        &self,
        draft: CandidateDraft,
        at: DateTime<Utc>,
    ) -> Result<Candidate, StoreError> {
        let details = draft.validate()?;

        self.write(|state| {
            if !state.jobs.contains_key(&draft.job_id) {
                return Err(ValidationErrors::single(
                    "job_id",
                    format!("job '{}' does not exist", draft.job_id),
                )
                .into());
            }
            if email_taken(state, &details.email, None) {
                return Err(StoreError::Conflict(format!(
                    "a candidate with email '{}' already exists",
                    details.email
                )));
            }

            let id = CandidateId(Sequences::next(&mut state.sequences.candidates, "cand"));
            let mut candidate = Candidate {
                id: id.clone(),
                name: details.name,
                email: details.email,
                phone: details.phone,
                stage: Stage::Applied,
                job_id: draft.job_id,
                notes: Vec::new(),
                timeline: Vec::new(),
                applied_at: at,
                updated_at: at,
            };
            candidate.record(
                at,
                TimelineKind::Created {
                    stage: Stage::Applied,
                },
            );
            state.candidates.insert(id, candidate.clone());
            Ok(candidate)
        })
    }

    /// Updates contact details and, when requested, the stage in one write.
    pub fn update_candidate(
        &self,
        id: &CandidateId,
        patch: CandidatePatch,
    ) -> Result<Candidate, StoreError> {
        self.write(|state| {
            let current = state
                .candidates
                .get(id)
                .ok_or_else(|| StoreError::not_found("candidate", id))?;
            let mut updated = patch.apply_contact(current)?;

            if updated.email != current.email && email_taken(state, &updated.email, Some(id)) {
                return Err(StoreError::Conflict(format!(
                    "a candidate with email '{}' already exists",
                    updated.email
                )));
            }

            let now = Utc::now();
            if let Some(to) = patch.stage.filter(|to| *to != current.stage) {
                check_transition(current.stage, to)?;
                updated.stage = to;
                updated.record(
                    now,
                    TimelineKind::StageChanged {
                        from: current.stage,
                        to,
                    },
                );
            }
            updated.updated_at = now;

            state.candidates.insert(id.clone(), updated.clone());
            Ok(updated)
        })
    }

    pub fn move_candidate(&self, id: &CandidateId, to: Stage) -> Result<Candidate, StoreError> {
        self.move_candidate_at(id, to, Utc::now())
    }

    pub(crate) fn move_candidate_at(
        &self,
        id: &CandidateId,
        to: Stage,
        at: DateTime<Utc>,
    ) -> Result<Candidate, StoreError> {
        self.write(|state| {
            let candidate = state
                .candidates
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found("candidate", id))?;
            let from = candidate.stage;
            check_transition(from, to)?;

            candidate.stage = to;
            candidate.record(at, TimelineKind::StageChanged { from, to });
            Ok(candidate.clone())
        })
    }

    /// Walks a candidate forward one stage at a time until `target`, so the timeline shows
    /// every step. `Rejected` is applied directly.
    pub(crate) fn advance_candidate_at(
        &self,
        id: &CandidateId,
        target: Stage,
        mut at: DateTime<Utc>,
        step: chrono::Duration,
    ) -> Result<Candidate, StoreError> {
        let mut candidate = self.get_candidate(id)?;
        if target == Stage::Rejected {
            return self.move_candidate_at(id, target, at);
        }

        for stage in Stage::funnel() {
            if stage.rank() <= candidate.stage.rank() || stage.rank() > target.rank() {
                continue;
            }
            at += step;
            candidate = self.move_candidate_at(id, stage, at)?;
        }
        Ok(candidate)
    }

    pub fn add_note(&self, id: &CandidateId, draft: NoteDraft) -> Result<Note, StoreError> {
        self.add_note_at(id, draft, Utc::now())
    }

    pub(crate) fn add_note_at(
        &self,
        id: &CandidateId,
        draft: NoteDraft,
        now: DateTime<Utc>,
    ) -> Result<Note, StoreError> {
        let body = draft.body.trim().to_string();
        if body.is_empty() {
            return Err(ValidationErrors::single("body", "note must not be empty").into());
        }

        self.write(|state| {
            if !state.candidates.contains_key(id) {
                return Err(StoreError::not_found("candidate", id));
            }

            let note = Note {
                id: NoteId(Sequences::next(&mut state.sequences.notes, "note")),
                mentions: extract_mentions(&body),
                body,
                created_at: now,
            };

            if let Some(candidate) = state.candidates.get_mut(id) {
                candidate.notes.push(note.clone());
                candidate.record(
                    now,
                    TimelineKind::NoteAdded {
                        note_id: note.id.clone(),
                    },
                );
            }
            Ok(note)
        })
    }

    pub fn candidate_timeline(&self, id: &CandidateId) -> Result<Vec<TimelineEvent>, StoreError> {
        self.get_candidate(id).map(|candidate| candidate.timeline)
    }
}
