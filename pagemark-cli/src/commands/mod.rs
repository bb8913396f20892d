//! CLI command implementations

mod backup;
mod book;
mod check;
mod sync;

pub use backup::backup;
pub use book::{decode, percent};
pub use check::check;
pub use sync::{restore, store};

use anyhow::{bail, Context, Result};
use pagemark_core::SyncConfig;
use std::path::{Path, PathBuf};

/// Load the configuration file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(SyncConfig::default()),
    }
}

/// The device database from the command line or the configuration
fn device_database(config: &SyncConfig, over: Option<&Path>) -> Result<PathBuf> {
    let path = over.unwrap_or(&config.device.database_path);
    if path.as_os_str().is_empty() {
        bail!("No device database given; pass one or set device.databasePath in the configuration");
    }
    Ok(path.to_path_buf())
}
