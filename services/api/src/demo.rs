use clap::Args;
use std::collections::BTreeMap;
use std::sync::Arc;
use talentflow::cache::TtlCache;
use talentflow::config::AppConfig;
use talentflow::error::AppError;
use talentflow::mock_api::{ChaosConfig, MockApi};
use talentflow::pipeline::{
    CandidateQuery, JobDraft, JobQuery, NoteDraft, ReorderRequest, Stage,
};
use talentflow::seed::{seed, SeedPlan};
use talentflow::service::{DataService, DataSource, FallbackPolicy, Fetched};
use talentflow::store::LocalStore;
use talentflow::telemetry;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Candidates to generate for the demo store
    #[arg(long, default_value_t = 200)]
    pub(crate) candidates: usize,
    /// Probability that a simulated write fails (defaults to APP_MOCK_WRITE_FAILURE_RATE)
    #[arg(long)]
    pub(crate) write_failure_rate: Option<f64>,
    /// Probability that a simulated read fails (defaults to APP_MOCK_READ_FAILURE_RATE)
    #[arg(long)]
    pub(crate) read_failure_rate: Option<f64>,
    /// Skip the simulated network latency
    #[arg(long)]
    pub(crate) no_latency: bool,
    /// Disable the local-store fallback so injected failures surface
    #[arg(long)]
    pub(crate) no_fallback: bool,
    /// Seed for both the data generator and the fault injector
    #[arg(long, default_value_t = 7)]
    pub(crate) rng_seed: u64,
}

#[derive(Default)]
struct SourceTally {
    counts: BTreeMap<&'static str, usize>,
}

impl SourceTally {
    fn record<T>(&mut self, operation: &str, fetched: &Fetched<T>, detail: String) {
        *self.counts.entry(fetched.source.label()).or_default() += 1;
        let marker = if fetched.source == DataSource::LocalStore {
            " (fallback)"
        } else {
            ""
        };
        println!(
            "  {:<22} <- {}{} {}",
            operation,
            fetched.source.label(),
            marker,
            detail
        );
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let mut chaos = ChaosConfig {
        rng_seed: Some(args.rng_seed),
        ..config.chaos.clone()
    };
    if let Some(rate) = args.write_failure_rate {
        chaos.write_failure_rate = rate.clamp(0.0, 1.0);
        chaos.reorder_failure_rate = rate.clamp(0.0, 1.0);
    }
    if let Some(rate) = args.read_failure_rate {
        chaos.read_failure_rate = rate.clamp(0.0, 1.0);
    }
    if args.no_latency {
        chaos.latency_min_ms = 0;
        chaos.latency_max_ms = 0;
    }
    let policy = if args.no_fallback {
        FallbackPolicy {
            reads: false,
            writes: false,
        }
    } else {
        FallbackPolicy::default()
    };

    println!("TalentFlow data service demo");
    println!(
        "Simulated API: latency {}-{} ms, read failures {:.0}%, write failures {:.0}%, reorder failures {:.0}%",
        chaos.latency_min_ms,
        chaos.latency_max_ms,
        chaos.read_failure_rate * 100.0,
        chaos.write_failure_rate * 100.0,
        chaos.reorder_failure_rate * 100.0
    );

    let store = Arc::new(LocalStore::in_memory());
    let summary = seed(
        &store,
        &SeedPlan {
            jobs: 8,
            candidates: args.candidates,
            assessments: 2,
            rng_seed: args.rng_seed,
        },
    )?;
    println!(
        "Seeded {} jobs, {} candidates, {} submissions\n",
        summary.jobs, summary.candidates, summary.submissions
    );

    let api = Arc::new(MockApi::new(store, chaos));
    let service = DataService::new(api, TtlCache::new(config.cache.ttl), policy);
    let mut tally = SourceTally::default();

    println!("Reads");
    let query = JobQuery::default();
    for _ in 0..2 {
        let jobs = service.list_jobs(&query).await?;
        let detail = format!("{} jobs", jobs.value.total);
        tally.record("jobs.list", &jobs, detail);
    }
    let dashboard = service.dashboard().await?;
    let detail = format!(
        "{} candidates, {:.1}% rejected",
        dashboard.value.candidates,
        dashboard.value.rejection_rate * 100.0
    );
    tally.record("analytics.dashboard", &dashboard, detail);

    println!("\nWrites");
    let job = service
        .create_job(JobDraft {
            title: "Demo Rust Engineer".to_string(),
            department: Some("Engineering".to_string()),
            location: Some("Remote".to_string()),
            tags: vec!["rust".to_string(), "demo".to_string()],
            ..JobDraft::default()
        })
        .await?;
    let detail = format!("{} at position {}", job.value.slug, job.value.order);
    tally.record("jobs.create", &job, detail);

    let reordered = service
        .reorder_job(
            &job.value.id,
            ReorderRequest {
                from_order: job.value.order,
                to_order: 1,
            },
        )
        .await?;
    let detail = format!("now at position {}", reordered.value.order);
    tally.record("jobs.reorder", &reordered, detail);

    let jobs = service.list_jobs(&query).await?;
    let detail = format!("{} jobs after invalidation", jobs.value.total);
    tally.record("jobs.list", &jobs, detail);

    let applied = service
        .list_candidates(&CandidateQuery {
            stage: Some(Stage::Applied),
            page_size: Some(1),
            ..CandidateQuery::default()
        })
        .await?;
    let detail = format!("{} waiting for screening", applied.value.total);
    tally.record("candidates.list", &applied, detail);

    if let Some(candidate) = applied.value.data.first() {
        let moved = service.move_candidate(&candidate.id, Stage::Screen).await?;
        let detail = format!("{} moved to {}", moved.value.name, moved.value.stage.label());
        tally.record("candidates.move", &moved, detail);

        let note = service
            .add_note(
                &candidate.id,
                NoteDraft {
                    body: "Phone screen booked, @hiring.manager to join.".to_string(),
                },
            )
            .await?;
        let detail = format!("mentions {:?}", note.value.mentions);
        tally.record("candidates.note", &note, detail);

        let timeline = service.candidate_timeline(&candidate.id).await?;
        let detail = format!("{} events", timeline.value.len());
        tally.record("candidates.timeline", &timeline, detail);
        for event in &timeline.value {
            println!(
                "      {} {}",
                event.at.format("%Y-%m-%d"),
                event.kind.describe()
            );
        }
    }

    let dashboard = service.dashboard().await?;
    let detail = format!("{} jobs on the board", dashboard.value.jobs.total);
    tally.record("analytics.dashboard", &dashboard, detail);

    let stats = service.cache_stats();
    println!("\nCache");
    println!(
        "  entries {}, hits {}, misses {}, invalidated {}",
        service.cache().len(),
        stats.hits,
        stats.misses,
        stats.invalidations
    );
    println!("Served from");
    for (source, count) in &tally.counts {
        println!("  - {source}: {count}");
    }

    Ok(())
}
