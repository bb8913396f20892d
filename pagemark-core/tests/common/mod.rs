//! Fixtures shared by the integration tests

#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// =============================================================================
// EPUB fixtures
// =============================================================================

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// An XHTML chapter whose body holds one paragraph per entry
pub fn chapter(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", p))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>Chapter</title></head><body>{}</body></html>"#,
        body
    )
}

/// Write a minimal EPUB with the given `(file name, xhtml)` spine documents
pub fn build_epub(dir: &Path, name: &str, chapters: &[(&str, String)]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).expect("create epub");
    let mut zip = ZipWriter::new(file);
    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", stored).unwrap();
    zip.write_all(CONTAINER_XML.as_bytes()).unwrap();

    let manifest: String = chapters
        .iter()
        .enumerate()
        .map(|(i, (file, _))| {
            format!(
                r#"<item id="c{}" href="{}" media-type="application/xhtml+xml"/>"#,
                i, file
            )
        })
        .collect();
    let spine: String = (0..chapters.len())
        .map(|i| format!(r#"<itemref idref="c{}"/>"#, i))
        .collect();
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture</dc:title>
    <dc:language>en</dc:language>
    <dc:identifier id="id">fixture-1</dc:identifier>
  </metadata>
  <manifest>{}</manifest>
  <spine>{}</spine>
</package>"#,
        manifest, spine
    );
    zip.start_file("OEBPS/content.opf", stored).unwrap();
    zip.write_all(opf.as_bytes()).unwrap();

    for (file, xhtml) in chapters {
        zip.start_file(format!("OEBPS/{}", file), stored).unwrap();
        zip.write_all(xhtml.as_bytes()).unwrap();
    }

    zip.finish().unwrap();
    path
}

/// Three chapters of 100 characters each, two 50-character paragraphs per chapter
pub fn uniform_epub(dir: &Path) -> PathBuf {
    let para = "x".repeat(50);
    let chapters: Vec<(&str, String)> = ["chap1.xhtml", "chap2.xhtml", "chap3.xhtml"]
        .into_iter()
        .map(|name| (name, chapter(&[&para, &para])))
        .collect();
    build_epub(dir, "uniform.epub", &chapters)
}

// =============================================================================
// Device database fixtures
// =============================================================================

pub const DEVICE_SCHEMA: &str = "
    CREATE TABLE books (_id TEXT PRIMARY KEY, reading_time INTEGER);
    CREATE TABLE current_position (content_id TEXT PRIMARY KEY, mark TEXT);
    CREATE TABLE network_position (content_id TEXT PRIMARY KEY, percent INTEGER, client_create_date INTEGER);
    CREATE TABLE content (
        ContentID TEXT PRIMARY KEY,
        BookID TEXT,
        ReadStatus INTEGER DEFAULT 0,
        PercentRead INTEGER DEFAULT 0,
        DateLastRead TEXT,
        bookmark TEXT,
        MimeType TEXT
    );";

pub fn create_device_db(path: &Path) -> Connection {
    let conn = Connection::open(path).expect("open device db");
    conn.execute_batch(DEVICE_SCHEMA).expect("create schema");
    conn
}

/// A book row as the device records it after reading
pub fn insert_device_book(
    conn: &Connection,
    content_id: &str,
    mark: Option<&str>,
    percent: Option<i64>,
    reading_time_ms: Option<i64>,
    read_status: i64,
) {
    conn.execute(
        "INSERT INTO books (_id, reading_time) VALUES (?1, ?2)",
        params![content_id, reading_time_ms],
    )
    .unwrap();
    if let Some(mark) = mark {
        conn.execute(
            "INSERT INTO current_position (content_id, mark) VALUES (?1, ?2)",
            params![content_id, mark],
        )
        .unwrap();
    }
    if let Some(percent) = percent {
        conn.execute(
            "INSERT INTO network_position (content_id, percent, client_create_date) VALUES (?1, ?2, NULL)",
            params![content_id, percent],
        )
        .unwrap();
    }
    conn.execute(
        "INSERT INTO content (ContentID, BookID, ReadStatus, PercentRead, MimeType)
         VALUES (?1, NULL, ?2, ?3, 'application/epub+zip')",
        params![content_id, read_status, percent.unwrap_or(0)],
    )
    .unwrap();
}
