use chrono::Utc;

use super::snapshot::{Sequences, Snapshot};
use super::{LocalStore, StoreError};
use crate::pipeline::jobs::shifted_order;
use crate::pipeline::{
    Job, JobDraft, JobId, JobPatch, JobQuery, JobStatus, Page, ReorderRequest, ValidationErrors,
};

fn slug_taken(state: &Snapshot, slug: &str, except: Option<&JobId>) -> bool {
    state
        .jobs
        .values()
        .any(|job| Some(&job.id) != except && job.slug.eq_ignore_ascii_case(slug))
}

impl LocalStore {
    pub fn list_jobs(&self, query: &JobQuery) -> Page<Job> {
        let state = self.read();
        let mut jobs: Vec<Job> = state
            .jobs
            .values()
            .filter(|job| query.matches(job))
            .cloned()
            .collect();
        query.sort(&mut jobs);
        Page::slice(jobs, query.pagination())
    }

    pub fn get_job(&self, id: &JobId) -> Result<Job, StoreError> {
        self.read()
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("job", id))
    }

    /// Case-insensitive slug lookup.
    pub fn find_job_by_slug(&self, slug: &str) -> Option<Job> {
        let slug = slug.trim();
        self.read()
            .jobs
            .values()
            .find(|job| job.slug.eq_ignore_ascii_case(slug))
            .cloned()
    }

    pub fn create_job(&self, draft: JobDraft) -> Result<Job, StoreError> {
        let new_job = draft.validate()?;

        self.write(|state| {
            if slug_taken(state, &new_job.slug, None) {
                return Err(StoreError::Conflict(format!(
                    "slug '{}' is already used by another job",
                    new_job.slug
                )));
            }

            let now = Utc::now();
            let id = JobId(Sequences::next(&mut state.sequences.jobs, "job"));
            let job = Job {
                id: id.clone(),
                title: new_job.title,
                slug: new_job.slug,
                status: JobStatus::Active,
                department: new_job.department,
                location: new_job.location,
                order: u32::try_from(state.jobs.len()).unwrap_or(u32::MAX - 1) + 1,
                tags: new_job.tags,
                description: new_job.description,
                created_at: now,
                updated_at: now,
            };
            state.jobs.insert(id, job.clone());
            Ok(job)
        })
    }

    pub fn update_job(&self, id: &JobId, patch: JobPatch) -> Result<Job, StoreError> {
        self.write(|state| {
            let current = state
                .jobs
                .get(id)
                .ok_or_else(|| StoreError::not_found("job", id))?;
            let mut updated = patch.apply(current)?;

            if updated.slug != current.slug && slug_taken(state, &updated.slug, Some(id)) {
                return Err(StoreError::Conflict(format!(
                    "slug '{}' is already used by another job",
                    updated.slug
                )));
            }

            updated.updated_at = Utc::now();
            state.jobs.insert(id.clone(), updated.clone());
            Ok(updated)
        })
    }

    /// Moves a job on the board, shifting the jobs in between to keep the ranking dense.
    pub fn reorder_job(&self, id: &JobId, request: ReorderRequest) -> Result<Job, StoreError> {
        self.write(|state| {
            let current = state
                .jobs
                .get(id)
                .ok_or_else(|| StoreError::not_found("job", id))?;

            if current.order != request.from_order {
                return Err(StoreError::Conflict(format!(
                    "job '{id}' is at position {}, not {}",
                    current.order, request.from_order
                )));
            }

            let count = u32::try_from(state.jobs.len()).unwrap_or(u32::MAX);
            if request.to_order == 0 || request.to_order > count {
                return Err(ValidationErrors::single(
                    "to_order",
                    format!("position must be between 1 and {count}"),
                )
                .into());
            }

            let (from, to) = (request.from_order, request.to_order);
            if from != to {
                let now = Utc::now();
                for job in state.jobs.values_mut() {
                    let order = shifted_order(job.order, from, to);
                    if order != job.order {
                        job.order = order;
                        job.updated_at = now;
                    }
                }
            }

            state
                .jobs
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("job", id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::job_draft;
    use super::*;
    use crate::pipeline::JobSort;

    fn store_with(titles: &[&str]) -> (LocalStore, Vec<Job>) {
        let store = LocalStore::in_memory();
        let jobs = titles
            .iter()
            .map(|title| store.create_job(job_draft(title)).expect("job created"))
            .collect();
        (store, jobs)
    }

    fn board(store: &LocalStore) -> Vec<String> {
        store
            .list_jobs(&JobQuery {
                page_size: Some(100),
                ..JobQuery::default()
            })
            .data
            .into_iter()
            .map(|job| job.title)
            .collect()
    }

    #[test]
    fn create_appends_to_the_board() {
        let (_, jobs) = store_with(&["Rust Engineer", "Designer"]);
        assert_eq!(jobs[0].order, 1);
        assert_eq!(jobs[1].order, 2);
        assert_eq!(jobs[1].id.as_str(), "job-000002");
        assert_eq!(jobs[0].status, JobStatus::Active);
    }

    #[test]
    fn duplicate_slug_conflicts() {
        let (store, _) = store_with(&["Rust Engineer"]);
        let err = store
            .create_job(job_draft("rust engineer!"))
            .expect_err("slug collides");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn update_archives_and_checks_slug() {
        let (store, jobs) = store_with(&["Rust Engineer", "Designer"]);

        let archived = store
            .update_job(
                &jobs[0].id,
                JobPatch {
                    status: Some(JobStatus::Archived),
                    ..JobPatch::default()
                },
            )
            .expect("archive succeeds");
        assert_eq!(archived.status, JobStatus::Archived);

        let err = store
            .update_job(
                &jobs[1].id,
                JobPatch {
                    slug: Some("rust-engineer".to_string()),
                    ..JobPatch::default()
                },
            )
            .expect_err("slug collides");
        assert!(matches!(err, StoreError::Conflict(_)));

        let missing = store
            .update_job(&JobId::from("job-999999"), JobPatch::default())
            .expect_err("unknown job");
        assert!(matches!(missing, StoreError::NotFound { kind: "job", .. }));
    }

    #[test]
    fn list_filters_and_paginates() {
        let (store, jobs) = store_with(&["Rust Engineer", "Designer", "Rust Intern"]);
        store
            .update_job(
                &jobs[2].id,
                JobPatch {
                    status: Some(JobStatus::Archived),
                    ..JobPatch::default()
                },
            )
            .expect("archive succeeds");

        let active_rust = store.list_jobs(&JobQuery {
            search: Some("rust".to_string()),
            status: Some(JobStatus::Active),
            ..JobQuery::default()
        });
        assert_eq!(active_rust.total, 1);
        assert_eq!(active_rust.data[0].title, "Rust Engineer");

        let by_title = store.list_jobs(&JobQuery {
            sort: JobSort::Title,
            page: Some(2),
            page_size: Some(2),
            ..JobQuery::default()
        });
        assert_eq!(by_title.total, 3);
        assert_eq!(by_title.data.len(), 1);
        assert_eq!(by_title.data[0].title, "Rust Intern");
    }

    #[test]
    fn search_matches_tags() {
        let (store, _) = store_with(&["Designer"]);
        let tagged = store
            .create_job(JobDraft {
                tags: vec!["Rust".to_string()],
                ..job_draft("Platform Engineer")
            })
            .expect("job created");

        let found = store.list_jobs(&JobQuery {
            search: Some("rust".to_string()),
            ..JobQuery::default()
        });
        assert_eq!(found.total, 1);
        assert_eq!(found.data[0].id, tagged.id);
    }

    #[test]
    fn reorder_shifts_neighbours() {
        let (store, jobs) = store_with(&["A", "B", "C", "D"]);

        let moved = store
            .reorder_job(
                &jobs[0].id,
                ReorderRequest {
                    from_order: 1,
                    to_order: 3,
                },
            )
            .expect("reorder succeeds");
        assert_eq!(moved.order, 3);
        assert_eq!(board(&store), vec!["B", "C", "A", "D"]);

        store
            .reorder_job(
                &jobs[3].id,
                ReorderRequest {
                    from_order: 4,
                    to_order: 1,
                },
            )
            .expect("reorder succeeds");
        assert_eq!(board(&store), vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn stale_or_out_of_range_reorders_fail() {
        let (store, jobs) = store_with(&["A", "B"]);

        let stale = store
            .reorder_job(
                &jobs[0].id,
                ReorderRequest {
                    from_order: 2,
                    to_order: 1,
                },
            )
            .expect_err("stale position");
        assert!(matches!(stale, StoreError::Conflict(_)));

        let out_of_range = store
            .reorder_job(
                &jobs[0].id,
                ReorderRequest {
                    from_order: 1,
                    to_order: 5,
                },
            )
            .expect_err("position past the end");
        assert!(matches!(out_of_range, StoreError::Validation(_)));
        assert_eq!(board(&store), vec!["A", "B"]);
    }
}
