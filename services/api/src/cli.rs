use crate::demo::{run_demo, DemoArgs};
use crate::infra::{
    open_store, render_dashboard, render_import_summary, render_seed_summary, seed_if_empty,
    StoreArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use talentflow::config::AppConfig;
use talentflow::error::AppError;
use talentflow::import::import_candidates_from_path;
use talentflow::seed::{seed, SeedPlan};
use talentflow::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "TalentFlow",
    about = "Run the TalentFlow hiring pipeline backend and its tooling from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Fill the local store with generated jobs, candidates and assessments
    Seed(SeedArgs),
    /// Print hiring analytics for the local store
    Dashboard(DashboardArgs),
    /// Import candidates from a CSV file (name,email,phone,job,stage)
    ImportCandidates(ImportArgs),
    /// Exercise the cached data service against a flaky simulated API
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

#[derive(Args, Debug)]
pub(crate) struct SeedArgs {
    #[command(flatten)]
    pub(crate) store: StoreArgs,
    /// Number of jobs to create
    #[arg(long, default_value_t = 25)]
    pub(crate) jobs: usize,
    /// Number of candidates to create
    #[arg(long, default_value_t = 1000)]
    pub(crate) candidates: usize,
    /// Number of jobs that get an assessment
    #[arg(long, default_value_t = 3)]
    pub(crate) assessments: usize,
    /// Seed for the record generator
    #[arg(long, default_value_t = 42)]
    pub(crate) rng_seed: u64,
    /// Drop existing records before seeding
    #[arg(long)]
    pub(crate) reset: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    #[command(flatten)]
    pub(crate) store: StoreArgs,
    /// Print the dashboard as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV file to import
    pub(crate) file: PathBuf,
    #[command(flatten)]
    pub(crate) store: StoreArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed(args) => run_seed(args),
        Command::Dashboard(args) => run_dashboard(args),
        Command::ImportCandidates(args) => run_import(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

fn load_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let store = open_store(&config.storage, &args.store)?;
    if args.reset {
        store.clear()?;
    }

    let plan = SeedPlan {
        jobs: args.jobs,
        candidates: args.candidates,
        assessments: args.assessments,
        rng_seed: args.rng_seed,
    };
    let summary = seed(&store, &plan)?;
    render_seed_summary(&summary);
    Ok(())
}

fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let store = open_store(&config.storage, &args.store)?;
    seed_if_empty(&store, &config.storage)?;
    let dashboard = store.dashboard();

    if args.json {
        let json = serde_json::to_string_pretty(&dashboard)
            .map_err(|err| AppError::Io(err.into()))?;
        println!("{json}");
    } else {
        render_dashboard(&dashboard);
    }
    Ok(())
}

fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let store = open_store(&config.storage, &args.store)?;
    let summary = import_candidates_from_path(&store, &args.file)?;
    render_import_summary(&summary);
    Ok(())
}
