//! Bulk candidate import from CSV exports.
//!
//! Expected header: `name,email,phone,job,stage`. `job` is the job slug and `stage` is
//! optional; rows land at `applied` and are walked forward to the requested stage.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::pipeline::{CandidateDraft, Stage};
use crate::store::{LocalStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSkip {
    /// 1-based line in the source file, counting the header.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: Vec<ImportSkip>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed candidate csv: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct CandidateRow {
    name: String,
    email: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    job: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    stage: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub fn import_candidates_from_path(
    store: &LocalStore,
    path: impl AsRef<Path>,
) -> Result<ImportSummary, ImportError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    import_candidates(store, file)
}

/// Imports every row it can; rows rejected by the store are reported in the summary, while a
/// malformed file or a persistence failure aborts the import.
pub fn import_candidates<R: Read>(
    store: &LocalStore,
    reader: R,
) -> Result<ImportSummary, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut summary = ImportSummary::default();

    for (index, record) in csv_reader.deserialize::<CandidateRow>().enumerate() {
        let line = index + 2;
        let row = record?;
        match import_row(store, row) {
            Ok(()) => summary.imported += 1,
            Err(RowOutcome::Skip(reason)) => {
                warn!(line, %reason, "candidate row skipped");
                summary.skipped.push(ImportSkip { line, reason });
            }
            Err(RowOutcome::Abort(error)) => return Err(error.into()),
        }
    }

    info!(
        imported = summary.imported,
        skipped = summary.skipped.len(),
        "candidate import finished"
    );
    Ok(summary)
}

enum RowOutcome {
    Skip(String),
    Abort(StoreError),
}

impl From<StoreError> for RowOutcome {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Snapshot(_) => RowOutcome::Abort(error),
            other => RowOutcome::Skip(other.to_string()),
        }
    }
}

fn import_row(store: &LocalStore, row: CandidateRow) -> Result<(), RowOutcome> {
    let job = store
        .find_job_by_slug(&row.job)
        .ok_or_else(|| RowOutcome::Skip(format!("unknown job '{}'", row.job)))?;

    let target = match row.stage.as_deref() {
        Some(raw) => Stage::parse(raw)
            .ok_or_else(|| RowOutcome::Skip(format!("unknown stage '{raw}'")))?,
        None => Stage::Applied,
    };

    let candidate = store.create_candidate(CandidateDraft {
        name: row.name,
        email: row.email,
        phone: row.phone,
        job_id: job.id,
    })?;

    if target != Stage::Applied {
        store.advance_candidate_at(&candidate.id, target, Utc::now(), Duration::zero())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::JobDraft;

    fn store_with_job() -> LocalStore {
        let store = LocalStore::in_memory();
        store
            .create_job(JobDraft {
                title: "Rust Engineer".to_string(),
                ..JobDraft::default()
            })
            .expect("job created");
        store
    }

    #[test]
    fn imports_rows_and_walks_stages() {
        let store = store_with_job();
        let csv = "name,email,phone,job,stage\n\
                   Ada Lovelace,ada@example.com,+1-555-0100,rust-engineer,tech\n\
                   Grace Hopper,grace@example.com,,rust-engineer,\n";

        let summary = import_candidates(&store, csv.as_bytes()).expect("import succeeds");
        assert_eq!(summary.imported, 2);
        assert!(summary.skipped.is_empty());

        let snapshot = store.snapshot();
        let ada = snapshot
            .candidates
            .values()
            .find(|candidate| candidate.email == "ada@example.com")
            .expect("ada imported");
        assert_eq!(ada.stage, Stage::Tech);
        assert_eq!(ada.timeline.len(), 3);
        let grace = snapshot
            .candidates
            .values()
            .find(|candidate| candidate.email == "grace@example.com")
            .expect("grace imported");
        assert_eq!(grace.stage, Stage::Applied);
        assert!(grace.phone.is_none());
    }

    #[test]
    fn bad_rows_are_skipped_with_line_numbers() {
        let store = store_with_job();
        let csv = "name,email,phone,job,stage\n\
                   Ada Lovelace,ada@example.com,,rust-engineer,screen\n\
                   Ada Again,ADA@example.com,,rust-engineer,\n\
                   Alan Turing,alan@example.com,,no-such-job,\n\
                   Edsger Dijkstra,edsger@example.com,,rust-engineer,interviewing\n\
                   ,nobody@example.com,,rust-engineer,\n";

        let summary = import_candidates(&store, csv.as_bytes()).expect("import succeeds");
        assert_eq!(summary.imported, 1);
        let lines: Vec<usize> = summary.skipped.iter().map(|skip| skip.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
        assert!(summary.skipped[1].reason.contains("no-such-job"));
        assert!(summary.skipped[2].reason.contains("interviewing"));
    }

    #[test]
    fn malformed_csv_aborts() {
        let store = store_with_job();
        let csv = "name,email,phone,job,stage\nAda Lovelace,ada@example.com\n";
        let err = import_candidates(&store, csv.as_bytes()).expect_err("short row");
        assert!(matches!(err, ImportError::Csv(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let store = store_with_job();
        let err = import_candidates_from_path(&store, "/definitely/not/here.csv")
            .expect_err("missing file");
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
