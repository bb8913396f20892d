//! Store and restore command implementations

use crate::SyncArgs;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pagemark_core::storage::{DeviceDatabase, JsonLibrary, LibraryStore};
use pagemark_core::sync::{commit_to_device, commit_to_library, CommitOutcome};
use pagemark_core::{BatchReport, SyncConfig, SyncCoordinator, SyncDirection, SyncPolicy};
use std::path::PathBuf;
use std::time::Duration;

/// Store device reading positions in the library
pub fn store(config: SyncConfig, policy: SyncPolicy, args: &SyncArgs) -> Result<()> {
    let (mut coordinator, mut library, device_path) = prepare(config, args)?;
    let device = DeviceDatabase::open_read_only(&device_path)
        .with_context(|| format!("Failed to open device database {}", device_path.display()))?;

    let report = run(&mut coordinator, &device, &library, args, SyncDirection::Store, policy)?;

    let commit = if args.dry_run {
        None
    } else {
        Some(
            commit_to_library(&mut library, &report)
                .with_context(|| format!("Failed to update {}", args.library.display()))?,
        )
    };

    finish(&report, commit.as_ref(), args.json)
}

/// Restore library reading positions to the device
pub fn restore(config: SyncConfig, policy: SyncPolicy, args: &SyncArgs) -> Result<()> {
    let (mut coordinator, library, device_path) = prepare(config, args)?;
    let mut device = DeviceDatabase::open(&device_path)
        .with_context(|| format!("Failed to open device database {}", device_path.display()))?;

    let report = run(&mut coordinator, &device, &library, args, SyncDirection::Restore, policy)?;

    let commit = if args.dry_run {
        None
    } else {
        Some(
            commit_to_device(&mut device, &report)
                .with_context(|| format!("Failed to update {}", device_path.display()))?,
        )
    };

    finish(&report, commit.as_ref(), args.json)
}

fn prepare(
    mut config: SyncConfig,
    args: &SyncArgs,
) -> Result<(SyncCoordinator, JsonLibrary, PathBuf)> {
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    let device_path = super::device_database(&config, args.device.as_deref())?;

    let library = JsonLibrary::open(&args.library, config.columns.clone())
        .with_context(|| format!("Failed to open library {}", args.library.display()))?;
    let coordinator = SyncCoordinator::new(&config).context("Invalid sync configuration")?;

    Ok((coordinator, library, device_path))
}

fn run(
    coordinator: &mut SyncCoordinator,
    device: &DeviceDatabase,
    library: &JsonLibrary,
    args: &SyncArgs,
    direction: SyncDirection,
    mut policy: SyncPolicy,
) -> Result<BatchReport> {
    policy.run_in_background |= args.background;

    let book_ids = if args.books.is_empty() {
        library.all_ids()
    } else {
        args.books.clone()
    };
    tracing::info!("Reconciling {} books ({:?})", book_ids.len(), direction);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message(format!("Reconciling {} books", book_ids.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = coordinator.run_batch(device, library, &book_ids, direction, policy);
    spinner.finish_and_clear();

    report.context("Sync batch failed")
}

fn finish(report: &BatchReport, commit: Option<&CommitOutcome>, json: bool) -> Result<()> {
    let failed = commit.map_or(0, |c| c.failed.len());

    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        let summary = &report.summary;
        println!("\nSync complete:");
        println!("  Updated:       {}", summary.updated);
        println!("  Unchanged:     {}", summary.unchanged);
        println!("  Not on device: {}", summary.not_on_device);
        println!("  Unresolved:    {}", summary.unresolved);
        println!("  Total:         {}", summary.total);
        match commit {
            Some(commit) => println!("  Written:       {}", commit.applied),
            None => println!("  (dry run, nothing written)"),
        }
        for (book_id, reason) in &report.unresolved {
            println!("  Book {}: {}", book_id, reason);
        }
        if let Some(commit) = commit {
            for (book_id, reason) in &commit.failed {
                println!("  Book {} not written: {}", book_id, reason);
            }
        }
    }

    let problems = report.summary.unresolved + failed;
    if problems > 0 {
        bail!("Sync completed with {} books unresolved or not written", problems);
    }

    Ok(())
}
