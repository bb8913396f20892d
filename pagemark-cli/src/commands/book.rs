//! Bookmark inspection commands

use anyhow::{Context, Result};
use pagemark_core::codec::{self, BOOKMARK_SEPARATOR};
use pagemark_core::document::EpubBook;
use pagemark_core::estimate::whole_percent;
use pagemark_core::{estimate, Position};
use serde::Serialize;
use std::path::Path;

/// Where a bookmark points in a book
#[derive(Serialize)]
struct MarkInfo {
    file: String,
    spine_index: usize,
    spine_len: usize,
    path: String,
    text_offset: Option<u32>,
    device_mark: String,
}

#[derive(Serialize)]
struct PercentInfo {
    mark: String,
    percent: f64,
    whole_percent: u8,
}

fn open_and_decode(book: &Path, mark: &str) -> Result<(EpubBook, Position, String)> {
    // library bookmarks may carry extra parts after the location
    let location = mark.split(BOOKMARK_SEPARATOR).next().unwrap_or(mark).trim();

    let epub = EpubBook::open(book)
        .with_context(|| format!("Failed to open {}", book.display()))?;
    let position = codec::decode(epub.spine(), location)
        .with_context(|| format!("Failed to decode bookmark {}", location))?;
    Ok((epub, position, location.to_string()))
}

/// Decode a device bookmark and show the position it names
pub fn decode(book: &Path, mark: &str, json: bool) -> Result<()> {
    let (epub, position, _) = open_and_decode(book, mark)?;

    let info = MarkInfo {
        file: epub
            .spine()
            .relative_href(position.spine_index)
            .unwrap_or_default()
            .to_string(),
        spine_index: position.spine_index,
        spine_len: epub.spine().len(),
        path: position.path_string(),
        text_offset: position.text_offset,
        device_mark: codec::encode(epub.spine(), &position)
            .context("Failed to re-encode the position")?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("File:        {}", info.file);
        println!("Spine:       {} of {}", info.spine_index + 1, info.spine_len);
        println!("Path:        {}", info.path);
        println!("Device mark: {}", info.device_mark);
    }

    Ok(())
}

/// Estimate the percent read at a bookmark
pub fn percent(book: &Path, mark: &str, json: bool) -> Result<()> {
    let (epub, position, location) = open_and_decode(book, mark)?;

    let percent = estimate(epub.spine(), &epub, &position)
        .with_context(|| format!("Failed to estimate position in {}", book.display()))?;
    tracing::debug!("Estimated {} at {:.3}%", location, percent);

    let info = PercentInfo {
        mark: location,
        percent,
        whole_percent: whole_percent(percent),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}%", info.whole_percent);
    }

    Ok(())
}
