//! Conversion between device bookmarks and structured positions
//!
//! The device numbers element paths without the invisible head element the
//! document tree model counts, so a leading step of `1` on the device is
//! step `2` in a [`Position`]. The rewrite is applied to the first step only,
//! in both directions, and must stay bit-for-bit compatible with firmware.

mod bookmark;

pub use bookmark::{to_device_mark, to_library_bookmark, DeviceBookmark, BOOKMARK_SEPARATOR};

use crate::error::CodecError;
use crate::types::{Position, SpineDocument};

/// Decodes and encodes bookmarks against one book's spine
pub struct PositionCodec<'a> {
    spine: &'a SpineDocument,
}

impl<'a> PositionCodec<'a> {
    pub fn new(spine: &'a SpineDocument) -> Self {
        Self { spine }
    }

    /// Parse a device bookmark into a position in this spine
    pub fn decode(&self, mark: &str) -> Result<Position, CodecError> {
        let bookmark = DeviceBookmark::parse(mark)?;
        let spine_index = self
            .spine
            .index_of(&bookmark.file)
            .ok_or_else(|| CodecError::UnknownSpineFile(bookmark.file.clone()))?;

        let mut path = bookmark.path;
        if let Some(first) = path.first_mut() {
            if first.index == 1 && first.anchor.is_none() {
                first.index = 2;
            }
        }

        Ok(Position {
            spine_index,
            path,
            text_offset: bookmark.text_offset,
        })
    }

    /// Render a position as the device's bookmark string
    pub fn encode(&self, position: &Position) -> Result<String, CodecError> {
        let file = self.spine.relative_href(position.spine_index).ok_or(
            CodecError::SpineIndexOutOfRange {
                index: position.spine_index,
                len: self.spine.len(),
            },
        )?;

        let mut path = position.path.clone();
        if let Some(first) = path.first_mut() {
            if first.index == 2 && first.anchor.is_none() {
                first.index = 1;
            }
        }

        let bookmark = DeviceBookmark {
            file: file.to_string(),
            path,
            text_offset: position.text_offset,
        };
        Ok(bookmark.to_string())
    }
}

/// Decode `mark` against `spine`
pub fn decode(spine: &SpineDocument, mark: &str) -> Result<Position, CodecError> {
    PositionCodec::new(spine).decode(mark)
}

/// Encode `position` against `spine`
pub fn encode(spine: &SpineDocument, position: &Position) -> Result<String, CodecError> {
    PositionCodec::new(spine).encode(position)
}
