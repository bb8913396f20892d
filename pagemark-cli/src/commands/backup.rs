//! Backup command implementation

use anyhow::{Context, Result};
use chrono::Utc;
use pagemark_core::storage::{backup_device_database, BackupOutcome};
use pagemark_core::SyncConfig;
use std::path::{Path, PathBuf};

/// Back up the device database directory
pub fn backup(
    config: SyncConfig,
    database: Option<&Path>,
    output_dir: Option<PathBuf>,
    keep: Option<usize>,
) -> Result<()> {
    let path = super::device_database(&config, database)?;

    let mut settings = config.backup;
    if let Some(dir) = output_dir {
        settings.destination = dir;
    }
    if let Some(keep) = keep {
        settings.copies_to_keep = keep;
    }

    let outcome = backup_device_database(&settings, &path, Utc::now())
        .with_context(|| format!("Failed to back up {}", path.display()))?;

    match outcome {
        BackupOutcome::AlreadyDoneToday(existing) => {
            println!("Already backed up today: {}", existing.display());
        }
        BackupOutcome::Created {
            directory,
            files,
            removed,
        } => {
            println!("Backed up {} files to {}", files.len(), directory.display());
            for old in removed {
                println!("  Removed {}", old.display());
            }
        }
    }

    Ok(())
}
