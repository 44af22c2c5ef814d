use clap::Args;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talentflow::analytics::Dashboard;
use talentflow::config::StorageConfig;
use talentflow::error::AppError;
use talentflow::import::ImportSummary;
use talentflow::seed::{seed, SeedPlan, SeedSummary};
use talentflow::store::{JsonFileSink, LocalStore, MemorySink, SnapshotSink};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct StoreArgs {
    /// Snapshot file for the local store (overrides APP_DATA_PATH)
    #[arg(long)]
    pub(crate) data_path: Option<PathBuf>,
}

pub(crate) fn open_store(
    storage: &StorageConfig,
    args: &StoreArgs,
) -> Result<Arc<LocalStore>, AppError> {
    let path = args.data_path.clone().or_else(|| storage.data_path.clone());
    let sink: Arc<dyn SnapshotSink> = match path {
        Some(path) => {
            info!(path = %path.display(), "opening local store");
            Arc::new(JsonFileSink::new(path))
        }
        None => {
            warn!("no data path configured; local store lives in memory only");
            Arc::new(MemorySink::default())
        }
    };
    Ok(Arc::new(LocalStore::open(sink)?))
}

/// Seeds the default demo data set when the store is empty and seeding is enabled.
pub(crate) fn seed_if_empty(
    store: &LocalStore,
    storage: &StorageConfig,
) -> Result<Option<SeedSummary>, AppError> {
    if !storage.seed_on_start || !store.is_empty() {
        return Ok(None);
    }
    let summary = seed(store, &SeedPlan::default())?;
    Ok(Some(summary))
}

pub(crate) fn render_seed_summary(summary: &SeedSummary) {
    println!("Seeded local store");
    println!(
        "  Jobs: {} ({} archived)",
        summary.jobs, summary.archived_jobs
    );
    println!("  Candidates: {}", summary.candidates);
    println!("  Assessments: {}", summary.assessments);
    println!("  Submissions: {}", summary.submissions);
    println!("  Notes: {}", summary.notes);
}

pub(crate) fn render_import_summary(summary: &ImportSummary) {
    println!("Imported {} candidate(s)", summary.imported);
    if summary.skipped.is_empty() {
        println!("Skipped rows: none");
        return;
    }
    println!("Skipped rows");
    for skip in &summary.skipped {
        println!("  - line {}: {}", skip.line, skip.reason);
    }
}

pub(crate) fn render_dashboard(dashboard: &Dashboard) {
    println!(
        "Hiring dashboard (generated {})",
        dashboard.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!(
        "Jobs: {} total, {} active, {} archived",
        dashboard.jobs.total, dashboard.jobs.active, dashboard.jobs.archived
    );
    println!("Candidates: {}", dashboard.candidates);

    println!("\nStage distribution");
    for entry in &dashboard.stages {
        println!(
            "  - {:<10} {:>5} ({:>5.1}%)",
            entry.stage_label,
            entry.count,
            entry.share * 100.0
        );
    }

    println!("\nConversion funnel");
    for entry in &dashboard.funnel {
        let conversion = entry
            .conversion
            .map(|rate| format!("{:.1}%", rate * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  - {:<10} reached {:>5}, from previous {}",
            entry.stage_label, entry.reached, conversion
        );
    }

    println!("\nRejection rate: {:.1}%", dashboard.rejection_rate * 100.0);
    match dashboard.average_days_to_hire {
        Some(days) => println!("Average days to hire: {days:.1}"),
        None => println!("Average days to hire: no hires yet"),
    }

    println!("\nJobs by board order");
    for row in &dashboard.job_pipelines {
        println!(
            "  {:>2}. {} [{}] candidates {}, in progress {}, hired {}, rejected {}",
            row.order,
            row.title,
            row.status.label(),
            row.candidates,
            row.in_progress,
            row.hired,
            row.rejected
        );
    }

    let coverage = &dashboard.assessments;
    println!(
        "\nAssessments: {} built, {} submission(s) from {} candidate(s)",
        coverage.assessments, coverage.submissions, coverage.candidates_assessed
    );
    if let Some(score) = coverage.average_score {
        println!("Average latest score: {score:.1}");
    }
}
