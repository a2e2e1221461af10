// crates/cli/src/main.rs
//! `gource-jobs`: start a clone, bulk import or render on a gource-studio
//! backend and follow it to completion in the terminal.

mod args;
mod progress;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use gource_studio_client::{ClientConfig, StudioApi};
use gource_studio_jobs::{BackendError, JobError, JobEvent, JobHooks, JobRunner, TrackingConfig};
use gource_studio_types::{JobSnapshot, RunnerPhase};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::args::{Cli, GlobalArgs};
use crate::progress::JobProgress;

/// Logs job outcomes; the terminal output comes from the progress bar.
struct LogHooks;

impl JobHooks for LogHooks {
    fn on_completed(&self, snapshot: &JobSnapshot) {
        tracing::info!(
            kind = %snapshot.job.kind,
            job_id = ?snapshot.job.id,
            summary = ?snapshot.summary,
            "Job completed"
        );
    }

    fn on_failed(&self, snapshot: &JobSnapshot, error: &str) {
        tracing::warn!(kind = %snapshot.job.kind, job_id = ?snapshot.job.id, error, "Job failed");
    }

    fn on_error(&self, error: &JobError) {
        tracing::warn!(%error, "Job tracking error");
    }
}

enum Outcome {
    Finished(JobSnapshot),
    Interrupted,
}

fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_directive = match verbose {
        0 => "warn",
        1 => "warn,gource_studio_jobs=info,gource_studio_client=info",
        2 => "info,gource_studio_jobs=debug,gource_studio_client=debug",
        _ => "debug,gource_studio_jobs=trace,gource_studio_client=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let stderr = fmt::layer().compact().with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .try_init()?;
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log file path {} has no file name", path.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().json().with_ansi(false).with_writer(writer))
        .try_init()?;
    Ok(Some(guard))
}

fn load_tracking_config(path: Option<&Path>) -> Result<TrackingConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match TrackingConfig::default_path() {
            Some(path) => path,
            None => return Ok(TrackingConfig::default()),
        },
    };
    TrackingConfig::load(&path).with_context(|| format!("loading {}", path.display()))
}

fn client_config(global: &GlobalArgs) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &global.api_url {
        config = config.with_base_url(url.as_str());
    }
    if let Some(secs) = global.timeout.filter(|s| *s > 0) {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    config
}

/// Follow runner events until the job reaches an end state or Ctrl-C.
async fn follow(
    runner: &JobRunner,
    mut events: broadcast::Receiver<JobEvent>,
    bar: &JobProgress,
) -> Outcome {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                runner.shutdown();
                return Outcome::Interrupted;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    bar.update(event.snapshot());
                    match &event {
                        JobEvent::Error { error, .. } => {
                            bar.println(format!("  ! {error}"));
                            return Outcome::Finished(event.snapshot().clone());
                        }
                        JobEvent::Stopped(snapshot) => return Outcome::Finished(snapshot.clone()),
                        _ if event.is_terminal() => return Outcome::Finished(event.snapshot().clone()),
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress display fell behind");
                    let snapshot = runner.snapshot();
                    bar.update(&snapshot);
                    if !snapshot.phase.is_busy() {
                        return Outcome::Finished(snapshot);
                    }
                }
                Err(RecvError::Closed) => return Outcome::Finished(runner.snapshot()),
            }
        }
    }
}

fn start_hint(error: &JobError) -> Option<String> {
    match error.backend()? {
        BackendError::SuggestBulkImport { github_url } => Some(format!(
            "hint: that URL names an account; try `gource-jobs bulk-import {github_url}`"
        )),
        BackendError::Transport(_) => {
            Some("hint: is the backend running? Set --api-url or GOURCE_STUDIO_API_URL".into())
        }
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.global.verbose, cli.global.log_file.as_deref())?;

    let tracking = load_tracking_config(cli.global.config.as_deref())?;
    let client = client_config(&cli.global);
    tracing::debug!(base_url = %client.base_url, timeout = ?client.timeout, "Client configured");

    let api = StudioApi::new(&client).context("building HTTP client")?;
    let request = cli.command.into_request();
    let kind = request.kind();

    let runner = JobRunner::new(kind, Arc::new(api), &tracking, Arc::new(LogHooks));
    let events = runner.subscribe();
    let bar = JobProgress::new(kind)?;

    eprintln!("\n  gource-jobs v{}: {}\n", env!("CARGO_PKG_VERSION"), request.describe());

    if let Err(error) = runner.start(request).await {
        bar.clear();
        eprintln!("  \u{2717} {error}");
        if let Some(hint) = start_hint(&error) {
            eprintln!("    {hint}");
        }
        return Ok(ExitCode::from(2));
    }

    let snapshot = match follow(&runner, events, &bar).await {
        Outcome::Finished(snapshot) => snapshot,
        Outcome::Interrupted => {
            bar.clear();
            eprintln!("  Interrupted; the job keeps running on the backend.");
            return Ok(ExitCode::from(130));
        }
    };
    bar.finish(&snapshot);

    if let Some(summary) = snapshot.summary.filter(|s| s.has_failures()) {
        eprintln!("    {} of {} items failed", summary.failed, summary.total);
    }
    if cli.global.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(match snapshot.phase {
        RunnerPhase::Completed => ExitCode::SUCCESS,
        RunnerPhase::Failed => ExitCode::from(1),
        _ => ExitCode::from(2),
    })
}
