//! Check command implementation

use anyhow::{bail, Context, Result};
use pagemark_core::storage::{check_database_file, quarantine};
use pagemark_core::{StorageError, SyncConfig};
use std::path::Path;

/// Integrity-check a device database
pub fn check(config: &SyncConfig, database: Option<&Path>, move_aside: bool) -> Result<()> {
    let path = super::device_database(config, database)?;

    match check_database_file(&path) {
        Ok(()) => {
            println!("{}: ok", path.display());
            Ok(())
        }
        Err(StorageError::StoreCorrupt { detail, .. }) => {
            println!("{}: corrupt ({})", path.display(), detail);
            if move_aside {
                let moved = quarantine(&path)
                    .with_context(|| format!("Failed to quarantine {}", path.display()))?;
                println!("Moved to {}", moved.display());
            }
            bail!("Device database {} failed the integrity check", path.display());
        }
        Err(e) => Err(e).with_context(|| format!("Failed to check {}", path.display())),
    }
}
