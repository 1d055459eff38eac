use std::{io, process, sync::Arc};

use pressroom::{
    application::{
        analytics::{AnalyticsEvent, AnalyticsRecorder, AnalyticsService, RecorderConfig},
        clock::{Clock, SystemClock},
        content::ContentLifecycleService,
        enrichment::UnknownEnrichment,
        error::AppError,
        repos::{AnalyticsRepo, ContentRepo, ContentWriteRepo, SitesRepo},
        storage::StorageDeadline,
    },
    config::{self, Command, LoadError, PublishDueArgs, ReportArgs, Settings},
    infra::{db::PostgresRepositories, error::InfraError, telemetry},
};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinError;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[derive(Debug, Error)]
enum RunError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to read events: {0}")]
    Input(#[from] io::Error),
    #[error("analytics worker failed: {0}")]
    Worker(#[from] JoinError),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_error(&error);
        process::exit(1);
    }
}

fn report_error(error: &RunError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "pressroom failed");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "pressroom failed");
    });
}

async fn run() -> Result<(), RunError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let repositories = Arc::new(
        PostgresRepositories::connect(&settings.database, settings.storage.timeout).await?,
    );

    match cli_args.command {
        Command::Migrate => run_migrate(&repositories).await,
        Command::PublishDue(args) => run_publish_due(&settings, repositories, args).await,
        Command::Report(args) => run_report(&settings, repositories, args).await,
        Command::Ingest => run_ingest(&settings, repositories).await,
    }
}

async fn run_migrate(repositories: &PostgresRepositories) -> Result<(), RunError> {
    repositories.run_migrations().await.map_err(InfraError::from)?;
    info!(target = "pressroom::migrate", "migrations applied");
    Ok(())
}

async fn run_publish_due(
    settings: &Settings,
    repositories: Arc<PostgresRepositories>,
    args: PublishDueArgs,
) -> Result<(), RunError> {
    let sites: Arc<dyn SitesRepo> = repositories.clone();
    let reader: Arc<dyn ContentRepo> = repositories.clone();
    let writer: Arc<dyn ContentWriteRepo> = repositories;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = ContentLifecycleService::new(
        sites,
        reader,
        writer,
        clock,
        StorageDeadline::new(settings.storage.timeout),
    );

    let limit = args
        .limit
        .unwrap_or_else(|| settings.scheduler.publish_batch.get());
    let report = service.publish_due(limit).await?;
    info!(
        target = "pressroom::publish_due",
        published = report.published.len(),
        skipped = report.skipped.len(),
        "publish-due finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_report(
    settings: &Settings,
    repositories: Arc<PostgresRepositories>,
    args: ReportArgs,
) -> Result<(), RunError> {
    let service = analytics_service(settings, repositories);
    let summary = service.aggregate(args.content_id, args.window_days).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct IngestReport {
    accepted: u64,
    malformed: u64,
}

async fn run_ingest(
    settings: &Settings,
    repositories: Arc<PostgresRepositories>,
) -> Result<(), RunError> {
    let (recorder, worker) = AnalyticsRecorder::spawn(
        analytics_service(settings, repositories),
        Arc::new(UnknownEnrichment),
        RecorderConfig::from(&settings.analytics),
    );

    let mut report = IngestReport::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0_u64;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AnalyticsEvent>(&line) {
            Ok(event) => {
                if !recorder.submit(event).await {
                    break;
                }
                report.accepted += 1;
            }
            Err(err) => {
                report.malformed += 1;
                warn!(
                    target = "pressroom::ingest",
                    line = line_no,
                    error = %err,
                    "skipping malformed event"
                );
            }
        }
    }

    drop(recorder);
    worker.await?;
    info!(
        target = "pressroom::ingest",
        accepted = report.accepted,
        malformed = report.malformed,
        "ingest finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn analytics_service(
    settings: &Settings,
    repositories: Arc<PostgresRepositories>,
) -> AnalyticsService {
    let content: Arc<dyn ContentRepo> = repositories.clone();
    let analytics: Arc<dyn AnalyticsRepo> = repositories;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    AnalyticsService::new(
        content,
        analytics,
        clock,
        StorageDeadline::new(settings.storage.timeout),
    )
}
