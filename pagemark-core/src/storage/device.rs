//! The reader's on-device SQLite database

use super::StorageResult;
use crate::error::StorageError;
use crate::types::{BookId, DeviceChanges, DeviceReadingState, ReadStatus, Staged};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// MIME type of device-native books
pub const EPUB_MIME_TYPE: &str = "application/epub+zip";

const STORE_STATE_QUERY: &str = "
    SELECT cp.mark,
           np.percent,
           b.reading_time,
           np.client_create_date,
           c.ReadStatus,
           c.MimeType
    FROM books b
    LEFT OUTER JOIN current_position cp ON cp.content_id = b._id
    LEFT OUTER JOIN network_position np ON np.content_id = b._id
    LEFT OUTER JOIN content c ON c.ContentID = b._id AND c.BookID IS NULL
    WHERE b._id = ?1";

const CONTENT_STATE_QUERY: &str = "
    SELECT bookmark, ReadStatus, PercentRead, DateLastRead, MimeType
    FROM content
    WHERE ContentID = ?1 AND BookID IS NULL";

/// Connection to the device database
///
/// Opened once per batch by the coordinator. Workers never see it.
pub struct DeviceDatabase {
    conn: Connection,
    path: PathBuf,
}

impl DeviceDatabase {
    /// Open an existing database for reading and writing
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with(path.as_ref(), OpenFlags::SQLITE_OPEN_READ_WRITE)
    }

    pub fn open_read_only(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with(path.as_ref(), OpenFlags::SQLITE_OPEN_READ_ONLY)
    }

    fn open_with(path: &Path, flags: OpenFlags) -> StorageResult<Self> {
        if !path.is_file() {
            return Err(StorageError::NotFound(path.display().to_string()));
        }
        let conn = Connection::open_with_flags(path, flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        tracing::debug!("Opened device database {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reading state recorded for a content id, as the store direction sees it
    ///
    /// `None` when the device has no book row for the id.
    pub fn store_state(&self, content_id: &str) -> StorageResult<Option<DeviceReadingState>> {
        let row = self
            .conn
            .query_row(STORE_STATE_QUERY, params![content_id], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })
            .optional()?;

        let Some((mark, percent, reading_time, created, status, mime_type)) = row else {
            return Ok(None);
        };

        let mark = mark.filter(|m| !m.trim_matches('\0').is_empty());
        let raw_percent = percent.map(clamp_percent);
        let read_status = match status {
            Some(code) => ReadStatus::from_code(code),
            None => derived_status(mark.is_some(), raw_percent),
        };

        Ok(Some(DeviceReadingState {
            mark,
            read_status,
            raw_percent,
            last_read: reading_time.or(created).and_then(DateTime::from_timestamp_millis),
            native_format: is_native(mime_type.as_deref()),
        }))
    }

    /// The `content` row for a content id, as the restore direction compares it
    pub fn content_state(&self, content_id: &str) -> StorageResult<Option<DeviceReadingState>> {
        let row = self
            .conn
            .query_row(CONTENT_STATE_QUERY, params![content_id], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .optional()?;

        Ok(row.map(|(mark, status, percent, last_read, mime_type)| DeviceReadingState {
            mark: mark.filter(|m| !m.is_empty()),
            read_status: status.map(ReadStatus::from_code).unwrap_or_default(),
            raw_percent: percent.map(clamp_percent),
            last_read: last_read.as_deref().and_then(parse_device_time),
            native_format: is_native(mime_type.as_deref()),
        }))
    }

    /// Write one book's staged columns in a single transaction
    pub fn apply_restore(
        &mut self,
        book_id: BookId,
        content_id: &str,
        changes: &DeviceChanges,
    ) -> StorageResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Staged::Write(mark) = &changes.bookmark {
            sets.push("bookmark = ?");
            values.push(mark.clone().map(Value::Text).unwrap_or(Value::Null));
        }
        if let Staged::Write(status) = &changes.read_status {
            sets.push("ReadStatus = ?");
            values.push(Value::Integer(status.code()));
        }
        if let Staged::Write(percent) = &changes.percent_read {
            sets.push("PercentRead = ?");
            values.push(Value::Integer(percent.map(i64::from).unwrap_or(0)));
        }
        if let Staged::Write(last_read) = &changes.last_read {
            sets.push("DateLastRead = ?");
            values.push(
                last_read
                    .map(|t| Value::Text(format_device_time(t)))
                    .unwrap_or(Value::Null),
            );
        }
        values.push(Value::Text(content_id.to_string()));

        let sql = format!(
            "UPDATE content SET {} WHERE ContentID = ? AND BookID IS NULL",
            sets.join(", ")
        );

        let partial = |detail: String| StorageError::PartialWriteFailure { book_id, detail };

        let tx = self.conn.transaction().map_err(|e| partial(e.to_string()))?;
        let updated = tx
            .execute(&sql, params_from_iter(values))
            .map_err(|e| partial(e.to_string()))?;
        if updated != 1 {
            // dropping the transaction rolls it back
            return Err(partial(format!(
                "expected one content row for {}, updated {}",
                content_id, updated
            )));
        }
        tx.commit().map_err(|e| partial(e.to_string()))?;

        tracing::debug!("Restored {} columns for book {}", sets.len(), book_id);
        Ok(())
    }

    /// Run SQLite's integrity check; anything but `ok` is corruption
    pub fn integrity_check(&self) -> StorageResult<()> {
        check_connection(&self.conn, &self.path)
    }
}

/// Integrity-check the database file at `path` without keeping it open
pub fn check_database_file(path: &Path) -> StorageResult<()> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    check_connection(&conn, path)
}

fn check_connection(conn: &Connection, path: &Path) -> StorageResult<()> {
    let corrupt = |detail: String| StorageError::StoreCorrupt {
        path: path.to_path_buf(),
        detail,
    };

    let mut stmt = conn
        .prepare("PRAGMA integrity_check")
        .map_err(|e| corrupt(e.to_string()))?;
    let messages = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| corrupt(e.to_string()))?;

    if messages.len() == 1 && messages[0] == "ok" {
        Ok(())
    } else {
        Err(corrupt(messages.join("; ")))
    }
}

/// Move a corrupt database aside as `<name>_CORRUPT.<ext>`
pub fn quarantine(path: &Path) -> StorageResult<PathBuf> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_CORRUPT.{}", stem, ext.to_string_lossy()),
        None => format!("{}_CORRUPT", stem),
    };
    let target = path.with_file_name(name);
    std::fs::rename(path, &target)?;
    tracing::warn!(
        "Quarantined corrupt database {} as {}",
        path.display(),
        target.display()
    );
    Ok(target)
}

fn is_native(mime_type: Option<&str>) -> bool {
    mime_type.map_or(true, |mime| mime == EPUB_MIME_TYPE)
}

fn clamp_percent(percent: i64) -> u8 {
    percent.clamp(0, 100) as u8
}

fn derived_status(has_mark: bool, percent: Option<u8>) -> ReadStatus {
    match percent {
        Some(p) if p >= 100 => ReadStatus::Finished,
        Some(p) if p > 0 => ReadStatus::Reading,
        _ if has_mark => ReadStatus::Reading,
        _ => ReadStatus::Unread,
    }
}

/// `DateLastRead` as the reader firmware writes it
const DEVICE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn parse_device_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    // older firmware omits the zone; those times are UTC
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(t) => Some(Utc.from_utc_datetime(&t)),
        Err(e) => {
            tracing::warn!("Unreadable DateLastRead {:?}: {}", raw, e);
            None
        }
    }
}

fn format_device_time(time: DateTime<Utc>) -> String {
    time.format(DEVICE_TIME_FORMAT).to_string()
}
