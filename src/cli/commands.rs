//! Command handlers for Course Fetcher CLI
//!
//! This module implements the command handlers that coordinate between
//! CLI arguments and the core application functionality.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::coordinator::{format_bytes, format_duration};
use crate::app::{
    load_manifest, Coordinator, ExpansionReport, FetchClient, LoadedManifest, RunSummary,
    VerificationReport,
};
use crate::cli::{
    ConfigAction, ConfigArgs, DownloadArgs, PlanArgs, ProgressConfig, ProgressDisplay, VerifyArgs,
};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle the download command
///
/// Loads the manifest, expands it into tasks and runs them through the
/// coordinator. Individual task failures are reported in the summary and do
/// not make the command fail.
pub async fn handle_download(args: DownloadArgs, mut config: AppConfig, quiet: bool) -> Result<()> {
    args.validate().map_err(AppError::generic)?;
    args.apply(&mut config);
    config.validate()?;

    let (manifest, plan) = load_and_expand(&args.manifest, &config).await?;
    report_unresolved(&plan, quiet);

    if args.dry_run {
        println!(
            "Dry run - would process {} videos from {} courses:",
            plan.tasks.len(),
            manifest.stats.courses
        );
        print_tasks(&plan, 10);
        return Ok(());
    }

    if plan.tasks.is_empty() {
        println!("ℹ️  Nothing to download: no video in the manifest has a usable URL");
        return Ok(());
    }

    let client = Arc::new(FetchClient::with_config(config.client.clone())?);
    let coordinator_config = config.coordinator_config();
    let worker_count = coordinator_config.worker_count;
    let buffer_size = coordinator_config.progress_buffer_size;
    let coordinator = Coordinator::new(coordinator_config, client, config.checker())?;

    let total = plan.tasks.len();
    let (tx, rx) = mpsc::channel(buffer_size);
    let display = ProgressDisplay::new(ProgressConfig {
        enable_progress_bars: !args.no_progress && !quiet,
        ..Default::default()
    })
    .spawn(total, rx)?;
    let coordinator = coordinator.with_progress(tx);

    if !quiet {
        println!(
            "🚀 Downloading {} videos into {} with {} workers...",
            total,
            config.paths.root.display(),
            worker_count
        );
    }

    let summary = coordinator.run_all(plan.tasks.clone()).await;

    // Closing the last sender lets the display drain and finish
    drop(coordinator);
    if let Err(e) = display.await {
        warn!("Progress display stopped unexpectedly: {}", e);
    }

    print_summary(&summary, &plan);
    Ok(())
}

/// Handle the plan command
pub async fn handle_plan(args: PlanArgs, mut config: AppConfig) -> Result<()> {
    args.layout.validate().map_err(AppError::generic)?;
    args.layout.apply(&mut config);
    config.validate()?;

    let (manifest, plan) = load_and_expand(&args.manifest, &config).await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&plan.tasks)
            .map_err(|e| AppError::generic(format!("Could not render plan: {}", e)))?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("📋 Download Plan");
    println!("================");
    for (path, layout) in &manifest.sources {
        println!("Source: {} ({})", path.display(), layout);
    }
    println!(
        "Courses: {}  Lessons: {}  Videos: {}",
        manifest.stats.courses, manifest.stats.lessons, manifest.stats.videos
    );
    println!("Root: {}", config.paths.root.display());
    println!("Resolutions: {}", config.paths.resolutions.join(", "));
    println!();

    print_tasks(&plan, usize::MAX);
    report_unresolved(&plan, false);
    Ok(())
}

/// Handle the verify command
pub async fn handle_verify(args: VerifyArgs, mut config: AppConfig) -> Result<()> {
    args.layout.validate().map_err(AppError::generic)?;
    args.apply(&mut config);
    config.validate()?;

    let (_, plan) = load_and_expand(&args.manifest, &config).await?;

    println!("🔍 Verifying {} files...", plan.tasks.len());
    let report = config.checker().verify_tasks(&plan.tasks).await;
    print_verification(&report, &plan);
    Ok(())
}

/// Handle configuration commands
pub async fn handle_config(args: ConfigArgs, config_file: Option<PathBuf>) -> Result<()> {
    match args.action {
        ConfigAction::Init { path, force } => {
            let written = AppConfig::init(path, force).await?;
            println!("📁 Created default configuration file:");
            println!("   {}", written.display());
            println!("   You can customize settings by editing this file.");
            Ok(())
        }
        ConfigAction::Show => {
            let config = AppConfig::load(config_file.clone()).await?;
            match config_file.or_else(AppConfig::find_config_file) {
                Some(path) => println!("# Loaded from {}", path.display()),
                None => println!("# No config file found; showing defaults"),
            }
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn load_and_expand(
    manifest_path: &Path,
    config: &AppConfig,
) -> Result<(LoadedManifest, ExpansionReport)> {
    let load_start = Instant::now();
    let manifest = load_manifest(manifest_path).await?;
    info!(
        "Loaded {} courses ({} videos) from {} in {:?}",
        manifest.stats.courses,
        manifest.stats.videos,
        manifest_path.display(),
        load_start.elapsed()
    );

    let plan = config.expander().expand_all(&manifest.courses);
    info!(
        "Expanded {} tasks, {} entries without a usable URL, {} duplicate destinations",
        plan.tasks.len(),
        plan.unresolved.len(),
        plan.duplicates.len()
    );
    Ok((manifest, plan))
}

fn print_tasks(plan: &ExpansionReport, limit: usize) {
    let total = plan.tasks.len();
    for task in plan.tasks.iter().take(limit) {
        println!(
            "  ({}/{}) [{}] {}",
            task.sequence,
            total,
            task.resolution,
            task.destination.display()
        );
    }
    if total > limit {
        println!("  ... and {} more videos", total - limit);
    }
}

fn report_unresolved(plan: &ExpansionReport, quiet: bool) {
    if quiet {
        return;
    }

    if !plan.duplicates.is_empty() {
        println!(
            "⚠️  {} videos share a destination with an earlier video and will be skipped:",
            plan.duplicates.len()
        );
        for entry in &plan.duplicates {
            println!(
                "   • {} / {} / Video {} - {} -> {}",
                entry.course,
                entry.lesson,
                entry.index,
                entry.title,
                entry.destination.display()
            );
        }
    }

    if plan.unresolved.is_empty() {
        return;
    }

    println!(
        "⚠️  {} videos have no usable URL and will be skipped:",
        plan.unresolved.len()
    );
    for entry in &plan.unresolved {
        let available = if entry.available.is_empty() {
            "no resolutions".to_string()
        } else {
            format!("empty: {}", entry.available.join(", "))
        };
        println!(
            "   • {} / {} / Video {} - {} ({})",
            entry.course, entry.lesson, entry.index, entry.title, available
        );
    }
}

fn print_summary(summary: &RunSummary, plan: &ExpansionReport) {
    println!("\n📊 Download Summary:");
    println!("  Total videos: {}", summary.total_tasks);
    println!("  Downloaded: {}", summary.downloaded);
    println!("  Already present: {}", summary.skipped);
    println!("  Failed: {}", summary.failed);
    if summary.not_started > 0 {
        println!("  Not started: {}", summary.not_started);
    }
    if !plan.unresolved.is_empty() {
        println!("  Without usable URL: {}", plan.unresolved.len());
    }
    if !plan.duplicates.is_empty() {
        println!("  Duplicate destinations: {}", plan.duplicates.len());
    }
    println!("  Transferred: {}", format_bytes(summary.total_bytes));
    println!(
        "  Started: {}",
        summary
            .started_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Finished: {}",
        summary
            .finished_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Elapsed: {}", format_duration(summary.elapsed));

    if summary.interrupted {
        println!("\n🛑 Run was interrupted; re-run the same command to continue.");
    }

    if !summary.failures.is_empty() {
        warn!("{} downloads failed", summary.failures.len());
        println!("\nFailed downloads:");
        for failure in &summary.failures {
            println!(
                "  • #{} {} -> {} ({})",
                failure.sequence,
                failure.title,
                failure.destination.display(),
                failure.reason
            );
        }
    } else if summary.is_complete() {
        println!("\n✅ All videos are in place.");
    }
}

fn print_verification(report: &VerificationReport, plan: &ExpansionReport) {
    println!("\n📊 Verification Summary:");
    println!("  Checked: {}", report.files_checked);
    println!("  Usable: {}", report.files_usable);
    println!("  Missing: {}", report.files_missing);
    println!("  Corrupt: {}", report.files_corrupt);
    println!("  Success rate: {:.1}%", report.success_rate());
    println!("  Time: {:?}", report.verification_time);

    if !report.corrupt_files.is_empty() {
        println!("\nCorrupt files (will be downloaded again):");
        for (path, reason) in &report.corrupt_files {
            println!("  • {} ({})", path.display(), reason);
        }
    }

    if plan.dropped() > 0 {
        println!(
            "\n{} videos have no usable URL or a duplicate destination and were not checked.",
            plan.dropped()
        );
    }

    if report.is_complete() {
        println!("\n✅ Every file is usable.");
    }
}
