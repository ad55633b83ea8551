use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use transjob::batch::{BatchCancel, BatchOrchestrator, BatchRequest, GroupResult};
use transjob::db::{self, Database, DatabaseError};
use transjob::logging::{self, LoggingError};
use transjob::service::JobQuery;
use transjob::{
    load_config, CheckSweep, Config, ConfigError, ContentItem, FileDropProvider, JobError,
    JobService, JobStatus, JobStore, LocalFileStore, PickedSite, ProviderRegistry, SharedConfig,
    TranslationJob, TranslationSet,
};

/// Translation job lifecycle runner
#[derive(Parser, Debug)]
#[command(name = "transjob", version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "transjob.json")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List jobs
    Jobs {
        /// Only jobs in this status
        #[arg(long)]
        status: Option<JobStatus>,
    },
    /// Submit a pending job to its provider
    Submit { key: Uuid },
    /// Check a submitted job for returned translations
    Check { key: Uuid },
    /// Create one job per target culture from a batch file
    Batch {
        file: PathBuf,
        /// Submit the created jobs right away
        #[arg(long)]
        send: bool,
    },
    /// Periodically check submitted jobs until interrupted
    Sweep,
}

/// On-disk shape of a batch request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchFile {
    picked: Vec<PickedSite>,
    sets: Vec<TranslationSet>,
    items: Vec<ContentItem>,
    #[serde(default)]
    name_template: String,
    #[serde(default)]
    provider_options: String,
    #[serde(default)]
    auto_approve: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid batch file: {0}")]
    BatchFile(#[from] serde_json::Error),

    #[error("No database path configured and no home directory found")]
    NoDatabasePath,

    #[error("Signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "transjob=debug" } else { "transjob=info" };
    if let Err(e) = logging::init(filter, cli.json_logs) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::warn!("{} not found, using defaults", path.display());
        Ok(Config::default())
    }
}

fn build_service(config: &SharedConfig) -> Result<Arc<JobService>, CliError> {
    let (database_path, media_root) = {
        let config = config.read().unwrap_or_else(|p| p.into_inner());
        let database_path = match &config.database_path {
            Some(path) => PathBuf::from(path),
            None => db::default_database_path().ok_or(CliError::NoDatabasePath)?,
        };
        (database_path, config.media_root.clone())
    };

    let store = JobStore::with_database(Database::open(&database_path)?);
    store.load_from_database()?;

    let files = Arc::new(LocalFileStore::new(media_root));
    let providers =
        ProviderRegistry::new().with(Arc::new(FileDropProvider::new(files, config.clone())))?;

    Ok(Arc::new(JobService::new(Arc::new(store), Arc::new(providers))))
}

fn print_job(job: &TranslationJob) {
    println!(
        "{}  {:<10} {} -> {}  {}/{} units  {}",
        job.key,
        job.status,
        job.source_culture,
        job.target_culture,
        job.translated_count(),
        job.units.len(),
        job.name
    );
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = read_config(&cli.config)?;
    let sweep_config = config.sweep.clone();
    let batch_config = config.batch.clone();
    let config = config.into_shared();
    let service = build_service(&config)?;

    match cli.command {
        Command::Jobs { status } => {
            let query = JobQuery {
                status,
                ..Default::default()
            };
            for job in service.list(&query)? {
                print_job(&job);
            }
        }
        Command::Submit { key } => print_job(&service.submit(key).await?),
        Command::Check { key } => match service.check(key).await {
            Ok(job) => print_job(&job),
            Err(JobError::NotReady(reason)) => println!("not ready: {reason}"),
            Err(e) => return Err(e.into()),
        },
        Command::Batch { file, send } => {
            let content = std::fs::read_to_string(&file).map_err(|e| CliError::Read {
                path: file.clone(),
                source: e,
            })?;
            let batch: BatchFile = serde_json::from_str(&content)?;
            let request = BatchRequest {
                picked: batch.picked,
                sets: batch.sets,
                items: batch.items,
                name_template: batch.name_template,
                provider_key: None,
                provider_options: batch.provider_options,
                auto_approve: batch.auto_approve,
                send_now: send,
            };

            let orchestrator = BatchOrchestrator::with_config(service, &batch_config);
            let report = orchestrator.run(request, BatchCancel::new()).await?;
            for outcome in &report.outcomes {
                match &outcome.result {
                    GroupResult::Created(job) => print_job(job),
                    GroupResult::Failed(e) => println!("{}: failed: {}", outcome.culture, e),
                    GroupResult::Skipped => println!("{}: skipped", outcome.culture),
                }
            }
        }
        Command::Sweep => {
            if !sweep_config.enabled {
                tracing::warn!("Sweep is disabled in {}", cli.config.display());
                return Ok(());
            }
            let sweep = Arc::new(CheckSweep::from_config(service, &sweep_config));
            let handle = sweep.start();
            sweep.trigger();

            let stopper = Arc::clone(&sweep);
            ctrlc::set_handler(move || stopper.stop())?;
            tracing::info!("Sweeping every {}s, press Ctrl-C to stop", sweep_config.interval_secs);

            if let Err(e) = handle.await {
                tracing::error!("Sweep task failed: {}", e);
            }
        }
    }

    Ok(())
}
