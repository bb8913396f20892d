//! Library stores holding reading state in custom columns

use super::{LibraryStore, StorageResult};
use crate::config::LibraryColumns;
use crate::error::StorageError;
use crate::types::{BookId, LibraryChanges, LibraryReadingState, Staged};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A book as the library knows it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookEntry {
    pub id: BookId,
    pub title: String,

    #[serde(default)]
    pub authors: Vec<String>,

    /// Device content ids of this book's copies
    #[serde(default)]
    pub content_ids: Vec<String>,

    /// Book files on the device, parallel to `content_ids`
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Custom column values keyed by column key
    #[serde(default)]
    pub columns: BTreeMap<String, Value>,
}

impl BookEntry {
    pub fn new(id: BookId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_copy(mut self, content_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.content_ids.push(content_id.into());
        self.paths.push(path.into());
        self
    }

    /// Reading state from the configured columns
    pub fn reading_state(&self, columns: &LibraryColumns) -> LibraryReadingState {
        let value = |key: &Option<String>| key.as_ref().and_then(|k| self.columns.get(k));

        LibraryReadingState {
            bookmark: value(&columns.bookmark)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            percent_read: value(&columns.percent_read)
                .and_then(Value::as_u64)
                .map(|p| p.min(100) as u8),
            last_read: value(&columns.last_read)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc)),
        }
    }

    /// Apply staged column writes; a cleared value removes the column entry
    pub fn apply(&mut self, columns: &LibraryColumns, changes: &LibraryChanges) {
        if let (Some(key), Staged::Write(bookmark)) = (&columns.bookmark, &changes.bookmark) {
            self.set_column(key, bookmark.clone().map(Value::String));
        }
        if let (Some(key), Staged::Write(percent)) = (&columns.percent_read, &changes.percent_read) {
            self.set_column(key, percent.map(Value::from));
        }
        if let (Some(key), Staged::Write(last_read)) = (&columns.last_read, &changes.last_read) {
            self.set_column(key, last_read.map(|t| Value::String(t.to_rfc3339())));
        }
    }

    fn set_column(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.columns.insert(key.to_string(), value);
            }
            None => {
                self.columns.remove(key);
            }
        }
    }
}

/// On-disk shape of a library file
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LibraryFile {
    pub books: Vec<BookEntry>,
}

/// Books and columns shared by both stores
#[derive(Debug, Default)]
struct Books {
    columns: LibraryColumns,
    books: BTreeMap<BookId, BookEntry>,
}

impl Books {
    fn new(columns: LibraryColumns, books: impl IntoIterator<Item = BookEntry>) -> Self {
        Self {
            columns,
            books: books.into_iter().map(|b| (b.id, b)).collect(),
        }
    }

    fn get(&self, id: BookId) -> StorageResult<&BookEntry> {
        self.books
            .get(&id)
            .ok_or_else(|| StorageError::NotFound(format!("book {}", id)))
    }

    fn select(&self, ids: &[BookId]) -> Vec<BookEntry> {
        ids.iter()
            .filter_map(|id| match self.books.get(id) {
                Some(book) => Some(book.clone()),
                None => {
                    tracing::warn!("Book {} is not in the library", id);
                    None
                }
            })
            .collect()
    }

    /// Changes land on a copy that replaces the entry, so a book is never half-updated
    fn apply(&mut self, id: BookId, changes: &LibraryChanges) -> StorageResult<()> {
        let mut updated = self.get(id)?.clone();
        updated.apply(&self.columns, changes);
        self.books.insert(id, updated);
        Ok(())
    }
}

/// Library kept in a JSON file
pub struct JsonLibrary {
    path: PathBuf,
    inner: Books,
    dirty: bool,
}

impl JsonLibrary {
    /// Load the library file; a missing file is an empty library
    pub fn open(path: impl AsRef<Path>, columns: LibraryColumns) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file: LibraryFile = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LibraryFile::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Loaded {} books from {}", file.books.len(), path.display());
        Ok(Self {
            path,
            inner: Books::new(columns, file.books),
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the library back through a temp file and rename
    pub fn save(&self) -> StorageResult<()> {
        let file = LibraryFile {
            books: self.inner.books.values().cloned().collect(),
        };
        let data = serde_json::to_string_pretty(&file)?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, data)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl LibraryStore for JsonLibrary {
    fn books(&self, ids: &[BookId]) -> StorageResult<Vec<BookEntry>> {
        Ok(self.inner.select(ids))
    }

    fn all_ids(&self) -> Vec<BookId> {
        self.inner.books.keys().copied().collect()
    }

    fn reading_state(&self, id: BookId) -> StorageResult<LibraryReadingState> {
        Ok(self.inner.get(id)?.reading_state(&self.inner.columns))
    }

    fn apply(&mut self, id: BookId, changes: &LibraryChanges) -> StorageResult<()> {
        self.inner.apply(id, changes)?;
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.dirty {
            self.save()?;
            self.dirty = false;
        }
        Ok(())
    }
}

/// In-memory library
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    inner: Books,
}

impl MemoryLibrary {
    pub fn new(columns: LibraryColumns) -> Self {
        Self {
            inner: Books::new(columns, Vec::new()),
        }
    }

    pub fn with_book(mut self, book: BookEntry) -> Self {
        self.inner.books.insert(book.id, book);
        self
    }

    pub fn book(&self, id: BookId) -> Option<&BookEntry> {
        self.inner.books.get(&id)
    }
}

impl LibraryStore for MemoryLibrary {
    fn books(&self, ids: &[BookId]) -> StorageResult<Vec<BookEntry>> {
        Ok(self.inner.select(ids))
    }

    fn all_ids(&self) -> Vec<BookId> {
        self.inner.books.keys().copied().collect()
    }

    fn reading_state(&self, id: BookId) -> StorageResult<LibraryReadingState> {
        Ok(self.inner.get(id)?.reading_state(&self.inner.columns))
    }

    fn apply(&mut self, id: BookId, changes: &LibraryChanges) -> StorageResult<()> {
        self.inner.apply(id, changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn book() -> BookEntry {
        let mut book = BookEntry::new(1, "Middlemarch").with_copy("file:///mnt/a.epub", "a.epub");
        book.columns
            .insert("#reading_bookmark".into(), Value::from("c1.xhtml#point(/1/4:0)"));
        book.columns.insert("#reading_percent".into(), Value::from(12));
        book.columns.insert("#unrelated".into(), Value::from("x"));
        book
    }

    #[test]
    fn test_reading_state_from_columns() {
        let state = book().reading_state(&LibraryColumns::all());
        assert_eq!(state.bookmark.as_deref(), Some("c1.xhtml#point(/1/4:0)"));
        assert_eq!(state.percent_read, Some(12));
        assert!(state.last_read.is_none());

        let state = book().reading_state(&LibraryColumns::new(None, Some("#reading_percent"), None));
        assert!(state.bookmark.is_none());
        assert_eq!(state.percent_read, Some(12));
    }

    #[test]
    fn test_apply_only_touches_configured_columns() {
        let columns = LibraryColumns::new(Some("#reading_bookmark"), None, Some("#last_read"));
        let when = Utc.with_ymd_and_hms(2023, 5, 4, 3, 2, 1).unwrap();
        let changes = LibraryChanges {
            bookmark: Staged::Write(None),
            percent_read: Staged::Write(Some(99)),
            last_read: Staged::Write(Some(when)),
        };

        let mut book = book();
        book.apply(&columns, &changes);

        assert!(!book.columns.contains_key("#reading_bookmark"));
        assert_eq!(book.columns["#reading_percent"], Value::from(12));
        assert_eq!(book.reading_state(&columns).last_read, Some(when));
        assert_eq!(book.columns["#unrelated"], Value::from("x"));
    }

    #[test]
    fn test_json_library_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.json");
        let file = LibraryFile { books: vec![book()] };
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let mut library = JsonLibrary::open(&path, LibraryColumns::all()).unwrap();
        let changes = LibraryChanges {
            percent_read: Staged::Write(Some(55)),
            ..Default::default()
        };
        library.apply(1, &changes).unwrap();
        library.flush().unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonLibrary::open(&path, LibraryColumns::all()).unwrap();
        assert_eq!(reopened.reading_state(1).unwrap().percent_read, Some(55));
    }

    #[test]
    fn test_missing_library_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let library = JsonLibrary::open(dir.path().join("none.json"), LibraryColumns::all()).unwrap();
        assert!(library.all_ids().is_empty());
        assert!(matches!(
            library.reading_state(3),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_memory_library_selects_known_books() {
        let library = MemoryLibrary::new(LibraryColumns::all()).with_book(book());
        let books = library.books(&[1, 2]).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Middlemarch");
    }
}
