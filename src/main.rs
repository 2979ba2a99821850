//! Checkstorm Binary Entry Point
//!
//! Probes `count` copies of one health endpoint with bounded concurrency and
//! prints a final report. Core functionality is provided by the `checkstorm`
//! library crate.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use checkstorm::{
    ConsoleSink, Dispatcher, FinalReport, HttpProbe, OutputFormat, ProgressReporter, RunConfig,
    config::parse_duration, targets,
};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Checkstorm - Bounded-Concurrency HTTP Liveness Prober
#[derive(Parser, Debug)]
#[command(name = "checkstorm", version, about, long_about = None)]
struct Cli {
    /// Path to an optional YAML configuration file
    #[arg(short, long, env = "CHECKSTORM_CONFIG")]
    config: Option<PathBuf>,

    /// Number of targets to probe
    #[arg(short = 'n', long, env = "CHECKSTORM_COUNT")]
    count: Option<usize>,

    /// Base URL of the probed service
    #[arg(long, env = "CHECKSTORM_BASE_URL")]
    base_url: Option<String>,

    /// Path appended to the base URL
    #[arg(long, env = "CHECKSTORM_PATH")]
    path: Option<String>,

    /// Maximum probes in flight
    #[arg(long, visible_alias = "max", env = "CHECKSTORM_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Per-probe deadline (e.g. "5s", "750ms")
    #[arg(long, value_parser = parse_duration, env = "CHECKSTORM_TIMEOUT")]
    timeout: Option<Duration>,

    /// Progress line interval (e.g. "5s")
    #[arg(long, value_parser = parse_duration, env = "CHECKSTORM_REPORT_INTERVAL")]
    report_interval: Option<Duration>,

    /// User-Agent header sent with every probe
    #[arg(long, env = "CHECKSTORM_USER_AGENT")]
    user_agent: Option<String>,

    /// Final report format: text or json
    #[arg(long, env = "CHECKSTORM_FORMAT")]
    format: Option<OutputFormat>,
}

impl Cli {
    /// Resolve the run configuration (CLI > ENV > config file > defaults).
    fn into_config(self) -> Result<RunConfig, checkstorm::ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration");
                RunConfig::load(path)?
            }
            None => RunConfig::default(),
        };

        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(path) = self.path {
            config.path = path;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(interval) = self.report_interval {
            config.report_interval = interval;
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        if let Some(format) = self.format {
            config.format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only progress lines and the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,checkstorm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Cli::parse().into_config()?;

    tracing::info!(
        base_url = %config.base_url,
        path = %config.path,
        count = config.count,
        concurrency = config.concurrency,
        timeout = ?config.timeout,
        "Starting checkstorm run"
    );

    let probe = HttpProbe::new(&config.probe_config())?;
    let dispatcher = Dispatcher::new(probe, config.concurrency, config.timeout);
    let list = targets::generate(&config.base_url, &config.path, config.count);

    let cancel = CancellationToken::new();
    let signals = tokio::spawn(shutdown_signal(cancel.clone()));

    let done = CancellationToken::new();
    let reporter = ProgressReporter::new(dispatcher.stats(), config.report_interval)
        .spawn(ConsoleSink, done.clone());

    let started = Instant::now();
    let summary = dispatcher.run(list, &cancel).await;
    let elapsed = started.elapsed();

    done.cancel();
    if let Err(e) = reporter.await {
        tracing::warn!(error = %e, "Progress reporter ended abnormally");
    }
    signals.abort();

    if summary.panicked > 0 {
        tracing::error!(panicked = summary.panicked, "Some probe tasks panicked");
    }

    let report = FinalReport::new(dispatcher.stats().snapshot(), elapsed, &summary);
    match config.format {
        OutputFormat::Text => println!("\n{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    tracing::info!(
        total = report.stats.total,
        cancelled = report.cancelled,
        "Run complete"
    );
    Ok(())
}

/// Cancel the run on Ctrl+C or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, cancelling run");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, cancelling run");
        }
    }

    cancel.cancel();
}
