//! Local document store: the durable source of truth behind the simulated API.
//!
//! All collections live behind one lock so multi-record writes (a submission touching the
//! candidate timeline, a reorder shifting every job) are applied as a unit. Each write
//! validates before mutating and then hands the new state to the configured
//! [`SnapshotSink`].

mod assessments;
mod candidates;
mod jobs;
mod snapshot;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::debug;

use crate::analytics::Dashboard;
use crate::pipeline::{Stage, ValidationErrors};

pub use snapshot::{JsonFileSink, MemorySink, Sequences, Snapshot, SnapshotError, SnapshotSink};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("cannot move candidate from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<ValidationErrors> for StoreError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

pub struct LocalStore {
    state: RwLock<Snapshot>,
    sink: Arc<dyn SnapshotSink>,
    /// Open [`LocalStore::batch`] scopes; saves are skipped while non-zero.
    deferred: AtomicUsize,
}

impl LocalStore {
    /// Store whose snapshots are only kept in memory.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            sink: Arc::new(MemorySink::default()),
            deferred: AtomicUsize::new(0),
        }
    }

    /// Opens a store, hydrating it from whatever the sink last saved.
    pub fn open(sink: Arc<dyn SnapshotSink>) -> Result<Self, StoreError> {
        let snapshot = sink.load()?.unwrap_or_default();
        debug!(
            jobs = snapshot.jobs.len(),
            candidates = snapshot.candidates.len(),
            "local store opened"
        );
        Ok(Self {
            state: RwLock::new(snapshot),
            sink,
            deferred: AtomicUsize::new(0),
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drops every record and resets the id sequences.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.write(|state| {
            *state = Snapshot::default();
            Ok(())
        })
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::build(&self.read(), chrono::Utc::now())
    }

    /// Runs `f` with snapshot saves suspended and saves once when the outermost batch ends,
    /// whether or not `f` succeeded.
    pub fn batch<T, E>(&self, f: impl FnOnce(&Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        self.deferred.fetch_add(1, Ordering::SeqCst);
        let result = f(self);
        if self.deferred.fetch_sub(1, Ordering::SeqCst) != 1 {
            return result;
        }

        let saved = self.sink.save(&self.read());
        let value = result?;
        saved.map_err(StoreError::from)?;
        Ok(value)
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `op` under the write lock and persists the result when it succeeds.
    fn write<T>(
        &self,
        op: impl FnOnce(&mut Snapshot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let value = op(&mut *guard)?;
        if self.deferred.load(Ordering::SeqCst) == 0 {
            self.sink.save(&*guard)?;
        }
        Ok(value)
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::in_memory()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn writes_are_saved_through_the_sink() {
        let sink = Arc::new(MemorySink::default());
        let store = LocalStore::open(sink.clone()).expect("store opens");

        store
            .create_job(job_draft("Rust Engineer"))
            .expect("job created");

        let saved = sink.saves().expect("snapshot saved");
        assert_eq!(saved.jobs.len(), 1);
        assert_eq!(saved.sequences.jobs, 1);
    }

    #[test]
    fn reopening_continues_sequences() {
        let sink = Arc::new(MemorySink::default());
        let first = LocalStore::open(sink.clone()).expect("store opens");
        first
            .create_job(job_draft("Rust Engineer"))
            .expect("job created");

        let second = LocalStore::open(sink).expect("store reopens");
        let job = second
            .create_job(job_draft("Data Engineer"))
            .expect("job created");
        assert_eq!(job.id.as_str(), "job-000002");
        assert_eq!(job.order, 2);
    }

    #[test]
    fn failing_sink_surfaces_snapshot_error() {
        let store = LocalStore::open(Arc::new(ReadOnlySink)).expect("store opens");
        let err = store
            .create_job(job_draft("Rust Engineer"))
            .expect_err("save fails");
        assert!(matches!(err, StoreError::Snapshot(_)));
    }

    #[test]
    fn batched_writes_are_saved_once() {
        let sink = Arc::new(CountingSink::default());
        let store = LocalStore::open(sink.clone()).expect("store opens");

        let created = store
            .batch(|store| {
                for title in ["Rust Engineer", "Designer", "Data Engineer"] {
                    store.create_job(job_draft(title))?;
                }
                Ok::<_, StoreError>(store.snapshot().jobs.len())
            })
            .expect("batch succeeds");
        assert_eq!(created, 3);
        assert_eq!(sink.saves(), 1);

        let reopened = LocalStore::open(sink.clone()).expect("store reopens");
        assert_eq!(reopened.snapshot().jobs.len(), 3);

        store
            .create_job(job_draft("QA Engineer"))
            .expect("job created");
        assert_eq!(sink.saves(), 2);
    }

    #[test]
    fn failed_batch_still_saves_what_was_written() {
        let sink = Arc::new(CountingSink::default());
        let store = LocalStore::open(sink.clone()).expect("store opens");

        let err = store
            .batch(|store| {
                store.create_job(job_draft("Rust Engineer"))?;
                store.create_job(job_draft("Rust Engineer"))
            })
            .expect_err("duplicate slug");
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(sink.saves(), 1);
        assert_eq!(
            LocalStore::open(sink).expect("reopens").snapshot().jobs.len(),
            1
        );
    }

    #[test]
    fn clear_resets_everything() {
        let store = LocalStore::in_memory();
        store
            .create_job(job_draft("Rust Engineer"))
            .expect("job created");
        store.clear().expect("clear succeeds");
        assert!(store.is_empty());
        assert_eq!(store.snapshot().sequences, Sequences::default());
    }
}
