//! nmtscope - JVM Native Memory Tracking history
//!
//! Collects NMT summaries from a running JVM on a fixed interval and serves
//! them over HTTP for a time window.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nmtscope::{
    api::{build_app, ApiState},
    collector::CollectionTrigger,
    config::NmtScopeConfig,
    report::{ReportGenerator, ReportStore},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nmtscope")]
#[command(version)]
#[command(about = "Periodic JVM native memory tracking snapshots")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NMTSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags layered on top of the configuration file
#[derive(clap::Args)]
struct Overrides {
    /// Directory to store NMT reports
    #[arg(long, global = true, alias = "report_dir")]
    report_dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Interval in seconds to collect NMT metrics (0 disables collection)
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Retention time in minutes to keep NMT metrics
    #[arg(long, global = true)]
    retention: Option<u64>,

    /// Path to jcmd binary
    #[arg(long, global = true)]
    jcmd: Option<String>,

    /// PID of the Java process to monitor
    #[arg(long, global = true, allow_negative_numbers = true)]
    pid: Option<i32>,
}

impl Overrides {
    fn apply(self, config: &mut NmtScopeConfig) {
        if let Some(dir) = self.report_dir {
            config.storage.report_dir = dir;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(interval) = self.interval {
            config.collector.interval_secs = interval;
        }
        if let Some(retention) = self.retention {
            config.storage.retention_minutes = retention;
        }
        if let Some(jcmd) = self.jcmd {
            config.collector.jcmd = jcmd;
        }
        if let Some(pid) = self.pid {
            config.collector.pid = pid;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Collect periodically and serve the query API (default)
    Serve,

    /// Capture a single report and exit
    Collect,

    /// Print reports for a time window as JSON
    Query {
        /// Window start, unix seconds
        #[arg(long)]
        begin: i64,

        /// Window end, unix seconds
        #[arg(long)]
        end: i64,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("nmtscope={},tower_http={}", log_level, log_level).into());
    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => NmtScopeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => NmtScopeConfig::default(),
    };
    cli.overrides.apply(&mut config);
    tracing::debug!(config = ?config, "Effective configuration");

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            config.validate()?;
            run_server(config).await?;
        }
        Commands::Collect => {
            config.validate()?;
            let path = ReportGenerator::from_config(&config)
                .generate(&CancellationToken::new())
                .await?;
            println!("{}", path.display());
        }
        Commands::Query { begin, end } => {
            anyhow::ensure!(begin < end, "begin must be less than end");
            let mut reports = ReportStore::from_config(&config.storage)
                .query(begin, end)
                .await?;
            reports.sort_by_key(|r| (r.created, r.pid));
            let response = nmtscope::report::ReportsResponse { data: reports };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Config => {
            println!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn run_server(config: NmtScopeConfig) -> Result<()> {
    tracing::info!(
        pid = config.collector.pid,
        report_dir = %config.storage.report_dir.display(),
        retention_minutes = config.storage.retention_minutes,
        "Starting nmtscope"
    );

    let cancel = CancellationToken::new();

    let generator = Arc::new(ReportGenerator::from_config(&config));
    let collection = CollectionTrigger::every_secs(generator, config.collector.interval_secs)
        .spawn(cancel.clone());

    let store = Arc::new(ReportStore::from_config(&config.storage));
    let app = build_app(ApiState { store }, &config.server.cors_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not listen on {}", addr))?;
    tracing::info!("nmtscope listening on {}", addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutting down...");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    if let Some(handle) = collection {
        if let Err(e) = handle.await {
            tracing::warn!("Collection task ended abnormally: {}", e);
        }
    }

    tracing::info!("nmtscope stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
