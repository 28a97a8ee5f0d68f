use anyhow::{Context, Result};
use bridge_traits::time::LogLevel;
use clap::{Parser, Subcommand, ValueEnum};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{bootstrap_desktop, BookmarkSyncService};
use core_sync::SyncReport;
use std::path::PathBuf;

/// Turn an XBEL bookmark export into a Markdown note.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the settings file.
    /// Defaults to $XDG_CONFIG_HOME/xbel-notes/settings.json
    #[arg(long, value_name = "PATH", global = true)]
    settings: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = Format::Compact, global = true)]
    log_format: Format,

    /// Log filter directives, e.g. "core_sync=trace".
    #[arg(long, value_name = "FILTER", global = true)]
    log_filter: Option<String>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Regenerate the note and fetch missing enrichment files.
    Sync,
    /// Forget which pages were fetched, then sync.
    Resync,
    /// Sync now, then keep syncing on the configured timer until Ctrl-C.
    Watch,
    /// Print the effective settings as JSON.
    ShowConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
    Compact,
}

impl From<Format> for LogFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Pretty => LogFormat::Pretty,
            Format::Json => LogFormat::Json,
            Format::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::default()
        .with_format(cli.log_format.into())
        .with_level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .with_target(false);
    if let Some(filter) = cli.log_filter {
        logging = logging.with_filter(filter);
    }
    init_logging(logging).context("Failed to initialize logging")?;

    let service = bootstrap_desktop(cli.settings)
        .await
        .context("Failed to start bookmark sync")?;

    match cli.command {
        Command::Sync => {
            let report = service.sync_now().await?;
            finish(report).await
        }
        Command::Resync => {
            let report = service.resync().await?;
            finish(report).await
        }
        Command::Watch => watch(&service).await,
        Command::ShowConfig => {
            let settings = service.settings().await;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

/// Print the outcome of a run, waiting for its enrichment fetches.
async fn finish(report: SyncReport) -> Result<()> {
    println!(
        "Wrote {} bookmarks to {}",
        report.bookmarks,
        report.output_path.display()
    );

    if let Some(summary) = report.wait_for_fetch().await? {
        println!(
            "Fetched {} pages, {} failed",
            summary.fetched.len(),
            summary.failed.len()
        );
    }
    Ok(())
}

async fn watch(service: &BookmarkSyncService) -> Result<()> {
    match service.start().await {
        Ok(report) => println!(
            "Wrote {} bookmarks to {}",
            report.bookmarks,
            report.output_path.display()
        ),
        Err(e) => tracing::error!(error = %e, "Startup sync failed"),
    }

    if service.settings().await.update_period().is_none() {
        tracing::warn!("automaticUpdate is off, only manual syncs will run");
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");
    service.shutdown().await;
    Ok(())
}
