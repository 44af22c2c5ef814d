use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    Assessment, Candidate, CandidateId, Job, JobId, Submission, SubmissionId,
};

/// Entire contents of the local document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub jobs: BTreeMap<JobId, Job>,
    #[serde(default)]
    pub candidates: BTreeMap<CandidateId, Candidate>,
    /// Keyed by the owning job.
    #[serde(default)]
    pub assessments: BTreeMap<JobId, Assessment>,
    #[serde(default)]
    pub submissions: BTreeMap<SubmissionId, Submission>,
    #[serde(default)]
    pub sequences: Sequences,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
            && self.candidates.is_empty()
            && self.assessments.is_empty()
            && self.submissions.is_empty()
    }
}

/// Last identifier handed out per collection; ids are never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
    pub jobs: u64,
    pub candidates: u64,
    pub assessments: u64,
    pub submissions: u64,
    pub notes: u64,
}

impl Sequences {
    pub(crate) fn next(counter: &mut u64, prefix: &str) -> String {
        *counter += 1;
        format!("{prefix}-{:06}", *counter)
    }
}

/// Persistence hook invoked after every successful store write.
pub trait SnapshotSink: Send + Sync {
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError>;
    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot sink unavailable: {0}")]
    Unavailable(String),
}

/// Pretty-printed JSON file, replaced atomically through a sibling temp file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotSink for JsonFileSink {
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }

        let payload = serde_json::to_vec_pretty(snapshot)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, payload).map_err(|err| self.io_error(err))?;
        fs::rename(&tmp, &self.path).map_err(|err| self.io_error(err))
    }
}

/// Keeps the last saved snapshot in memory; used when no data path is configured.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Option<Snapshot>>,
}

impl MemorySink {
    pub fn saves(&self) -> Option<Snapshot> {
        self.saved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotSink for MemorySink {
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        Ok(self.saves())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        *self
            .saved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "talentflow-{name}-{}-{}.json",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[test]
    fn missing_file_loads_as_none() {
        let sink = JsonFileSink::new(temp_path("missing"));
        assert!(sink.load().expect("load succeeds").is_none());
    }

    #[test]
    fn json_file_round_trips_sequences() {
        let path = temp_path("roundtrip");
        let sink = JsonFileSink::new(&path);
        let mut snapshot = Snapshot::default();
        snapshot.sequences.jobs = 7;

        sink.save(&snapshot).expect("save succeeds");
        let loaded = sink.load().expect("load succeeds").expect("snapshot present");
        assert_eq!(loaded.sequences.jobs, 7);
        assert!(loaded.is_empty());

        fs::remove_file(path).ok();
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = temp_path("corrupt");
        fs::write(&path, b"{ not json").expect("write fixture");
        let err = JsonFileSink::new(&path).load().expect_err("corrupt snapshot");
        assert!(matches!(err, SnapshotError::Json(_)));
        fs::remove_file(path).ok();
    }

    #[test]
    fn sequence_ids_are_zero_padded() {
        let mut counter = 41;
        assert_eq!(Sequences::next(&mut counter, "job"), "job-000042");
        assert_eq!(counter, 42);
    }
}
