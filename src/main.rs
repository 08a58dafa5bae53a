use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bucketsync::config::{load_file_config, Args, Settings};
use bucketsync::error::{Result, SyncError};
use bucketsync::fs::{ObjectStore, OpendalStore};
use bucketsync::sync::{SyncEngine, SyncReport};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn,bucketsync=info",
        1 => "warn,bucketsync=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let file = load_file_config(args.config.as_deref())?;
    let settings = Settings::resolve(&args, file)?;

    let source = OpendalStore::open_source(&settings.source).await.map_err(|e| SyncError::Client {
        backend: settings.source.provider.display_name().to_string(),
        reason: format!("{:#}", e),
    })?;
    let dest = OpendalStore::open_destination(&settings.destination).map_err(|e| SyncError::Client {
        backend: "GCS".to_string(),
        reason: format!("{:#}", e),
    })?;

    if let Some(project) = &settings.destination.project_id {
        info!(project = %project, "Destination project");
    }
    info!(
        "Syncing {} to {}",
        source.display_path(&settings.sync.prefix),
        dest.display_path(""),
    );
    if settings.sync.bandwidth_limit.is_limited() {
        info!("Bandwidth limit {}", settings.sync.bandwidth_limit.display());
    }
    if settings.sync.dry_run {
        info!("Dry run, no objects will be written");
    }

    let engine = SyncEngine::new(Arc::new(source), Arc::new(dest), settings.sync.clone());
    let report = engine.run().await?;

    if settings.json {
        print_json(&report)?;
    } else {
        print_summary(&report);
    }

    report.ensure_success()
}

fn print_json(report: &SyncReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&report.summary())
        .map_err(|e| SyncError::Config(format!("cannot serialize report: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_summary(report: &SyncReport) {
    let stats = &report.stats;

    if report.dry_run {
        println!("{}", "Dry run".yellow().bold());
    }
    println!(
        "Amount transferred {} in {:.1}s ({})",
        stats.bytes_display().bold(),
        stats.elapsed().as_secs_f64(),
        stats.rate_display()
    );
    println!(
        "  {} listed, {} hash matches, {} size matches, {} transferred, {} would transfer, {} excluded",
        stats.objects_listed,
        stats.hash_matches,
        stats.size_matches,
        stats.transferred.to_string().green(),
        stats.dry_run,
        stats.excluded
    );

    for failure in &report.failures {
        println!("  {} {}: {}", "failed".red(), failure.key, failure.error);
    }
}
