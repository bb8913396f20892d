//! Daily backups of the device database directory

use super::device::{check_database_file, quarantine};
use crate::config::BackupConfig;
use crate::error::{ConfigError, StorageError};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder in [`BackupConfig::name_template`]
pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// What a backup run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// A backup stamped with today's date exists already
    AlreadyDoneToday(PathBuf),

    Created {
        directory: PathBuf,
        files: Vec<PathBuf>,
        /// Older backups deleted to honour `copies_to_keep`
        removed: Vec<PathBuf>,
    },
}

/// Copy every `*.db` next to `database` into a new timestamped backup directory
///
/// Each copy is integrity-checked; a corrupt copy is renamed `_CORRUPT` and
/// fails the backup.
pub fn backup_device_database(
    config: &BackupConfig,
    database: &Path,
    now: DateTime<Utc>,
) -> crate::Result<BackupOutcome> {
    let (prefix, suffix) = config
        .name_template
        .split_once(TIMESTAMP_PLACEHOLDER)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "backup.nameTemplate",
            reason: format!("must contain {}", TIMESTAMP_PLACEHOLDER),
        })?;
    let pattern = backup_pattern(prefix, suffix).map_err(|e| ConfigError::InvalidValue {
        field: "backup.nameTemplate",
        reason: e.to_string(),
    })?;

    fs::create_dir_all(&config.destination)?;
    let existing = existing_backups(&config.destination, &pattern)?;

    let today = now.format("%Y%m%d").to_string();
    if let Some(done) = existing
        .iter()
        .find(|(stamp, _)| stamp.starts_with(&today))
    {
        tracing::info!("Device database already backed up today: {}", done.1.display());
        return Ok(BackupOutcome::AlreadyDoneToday(done.1.clone()));
    }

    let stamp = now.format("%Y%m%d-%H%M%S").to_string();
    let directory = config
        .destination
        .join(format!("{}{}{}", prefix, stamp, suffix));
    fs::create_dir_all(&directory)?;

    let source_dir = database
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut files = Vec::new();
    for entry in fs::read_dir(source_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "db") {
            if let Some(name) = path.file_name() {
                let target = directory.join(name);
                fs::copy(&path, &target)?;
                files.push(target);
            }
        }
    }
    files.sort();
    tracing::info!("Copied {} database files to {}", files.len(), directory.display());

    for copy in &files {
        if let Err(e) = check_database_file(copy) {
            let detail = match &e {
                StorageError::StoreCorrupt { detail, .. } => detail.clone(),
                other => other.to_string(),
            };
            tracing::error!("Backup copy {} is corrupt: {}", copy.display(), detail);
            quarantine(copy)?;
            return Err(StorageError::StoreCorrupt {
                path: copy.clone(),
                detail,
            }
            .into());
        }
    }

    let mut removed = Vec::new();
    if config.copies_to_keep > 0 {
        let mut all = existing_backups(&config.destination, &pattern)?;
        all.sort();
        let excess = all.len().saturating_sub(config.copies_to_keep);
        for (_, old) in all.into_iter().take(excess) {
            tracing::debug!("Removing old backup {}", old.display());
            if let Err(e) = fs::remove_dir_all(&old) {
                tracing::warn!("Could not remove old backup {}: {}", old.display(), e);
            } else {
                removed.push(old);
            }
        }
    }

    Ok(BackupOutcome::Created {
        directory,
        files,
        removed,
    })
}

fn backup_pattern(prefix: &str, suffix: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^{}(\d{{8}}-\d{{6}}){}$",
        regex::escape(prefix),
        regex::escape(suffix)
    ))
}

/// Backup directories in `dir` with their timestamps, unordered
fn existing_backups(dir: &Path, pattern: &Regex) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(caps) = pattern.captures(&name.to_string_lossy()) {
            found.push((caps[1].to_string(), entry.path()));
        }
    }
    Ok(found)
}
