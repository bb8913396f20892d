//! Typed sync configuration

use crate::error::ConfigError;
use crate::types::SyncPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a configuration file
pub const CONFIG_ENV: &str = "PAGEMARK_CONFIG";

/// Library column keys for the three reading-state fields
///
/// An absent key means the field is neither read nor written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LibraryColumns {
    pub bookmark: Option<String>,
    pub percent_read: Option<String>,
    pub last_read: Option<String>,
}

impl LibraryColumns {
    pub fn new(
        bookmark: Option<&str>,
        percent_read: Option<&str>,
        last_read: Option<&str>,
    ) -> Self {
        Self {
            bookmark: bookmark.map(str::to_string),
            percent_read: percent_read.map(str::to_string),
            last_read: last_read.map(str::to_string),
        }
    }

    /// All three columns under their conventional keys
    pub fn all() -> Self {
        Self::new(
            Some("#reading_bookmark"),
            Some("#reading_percent"),
            Some("#last_read"),
        )
    }

    pub fn has_bookmark(&self) -> bool {
        self.bookmark.is_some()
    }

    pub fn has_percent_read(&self) -> bool {
        self.percent_read.is_some()
    }

    pub fn has_last_read(&self) -> bool {
        self.last_read.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !(self.has_bookmark() || self.has_percent_read() || self.has_last_read())
    }

    /// Policy options that depend on a column being configured
    pub fn check_policy(&self, policy: &SyncPolicy) -> Result<(), ConfigError> {
        if self.is_empty() {
            return Err(ConfigError::NoColumnsConfigured);
        }
        if policy.store_only_if_more_recent && !self.has_last_read() {
            return Err(ConfigError::MissingColumn {
                option: "storeOnlyIfMoreRecent",
                column: "lastRead",
            });
        }
        if policy.skip_if_library_finished && !self.has_percent_read() {
            return Err(ConfigError::MissingColumn {
                option: "skipIfLibraryFinished",
                column: "percentRead",
            });
        }
        Ok(())
    }
}

/// Where the device database lives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceConfig {
    pub database_path: PathBuf,

    /// Prefix for relative book paths recorded in the library
    pub mount_root: Option<PathBuf>,
}

impl DeviceConfig {
    /// Resolve a library book path against the mount root
    pub fn resolve_book_path(&self, path: &Path) -> PathBuf {
        match &self.mount_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Device database backup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackupConfig {
    pub destination: PathBuf,

    /// Backups kept after a new one is made; 0 keeps everything
    pub copies_to_keep: usize,

    /// Directory name for a backup; `{timestamp}` becomes `YYYYMMDD-HHMMSS`
    pub name_template: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("backups"),
            copies_to_keep: 5,
            name_template: "device-backup-{timestamp}".to_string(),
        }
    }
}

/// Everything one sync invocation needs to know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    pub policy: SyncPolicy,
    pub columns: LibraryColumns,
    pub device: DeviceConfig,
    pub backup: BackupConfig,

    /// Worker threads in the job pool
    pub workers: usize,

    /// Give up on jobs still running after this many seconds
    pub job_timeout_secs: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: SyncPolicy::default(),
            columns: LibraryColumns::all(),
            device: DeviceConfig::default(),
            backup: BackupConfig::default(),
            workers: 4,
            job_timeout_secs: None,
        }
    }
}

impl SyncConfig {
    /// Read and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: SyncConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Combinations of options that cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.columns.check_policy(&self.policy)?;
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.backup.name_template.contains("{timestamp}") {
            return Err(ConfigError::InvalidValue {
                field: "backup.nameTemplate",
                reason: "must contain {timestamp}".to_string(),
            });
        }
        if self.job_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "jobTimeoutSecs",
                reason: "must be positive when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: SyncConfig = serde_json::from_str(
            r##"{
                "policy": { "storeOnlyIfMoreRecent": true },
                "columns": { "lastRead": "#last_read" },
                "device": { "databasePath": "/mnt/reader/.device/reader.sqlite" },
                "workers": 2
            }"##,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert!(config.columns.bookmark.is_none());
        assert_eq!(config.workers, 2);
        assert_eq!(config.backup.copies_to_keep, 5);
    }

    #[test]
    fn test_no_columns() {
        let config = SyncConfig {
            columns: LibraryColumns::default(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoColumnsConfigured)
        ));
    }

    #[test]
    fn test_policy_needs_column() {
        let mut config = SyncConfig {
            columns: LibraryColumns::new(Some("#bm"), None, None),
            ..Default::default()
        };
        config.policy.store_only_if_more_recent = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingColumn { column: "lastRead", .. })
        ));

        config.policy.store_only_if_more_recent = false;
        config.policy.skip_if_library_finished = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingColumn { column: "percentRead", .. })
        ));
    }

    #[test]
    fn test_zero_workers() {
        let config = SyncConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_book_path() {
        let device = DeviceConfig {
            mount_root: Some(PathBuf::from("/mnt/reader")),
            ..Default::default()
        };
        assert_eq!(
            device.resolve_book_path(Path::new("books/a.epub")),
            PathBuf::from("/mnt/reader/books/a.epub")
        );
        assert_eq!(
            device.resolve_book_path(Path::new("/abs/a.epub")),
            PathBuf::from("/abs/a.epub")
        );
    }
}
