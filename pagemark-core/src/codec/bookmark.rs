//! The device's textual bookmark format
//!
//! Devices record a reading location as `<relative-file-path>#point(<path>)`,
//! e.g. `titlepage.xhtml#point(/1/4/2/2:0)`. Side-loaded content additionally
//! carries its content id in front: `<content-id>#<file>#point(<path>)`.

use crate::error::CodecError;
use crate::types::PathStep;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Separator between the location and any trailing parts of a library bookmark
pub const BOOKMARK_SEPARATOR: &str = "|@ @|";

const POINT_MARKER: &str = "#point";

static STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\[([^\]]*)\])?(?::(.*))?$").expect("step pattern is valid")
});

/// A parsed device bookmark, still in device numbering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBookmark {
    /// Content file the bookmark points into, relative to the book root
    pub file: String,

    /// Path steps exactly as the device wrote them
    pub path: Vec<PathStep>,

    /// Offset suffix of the final step
    pub text_offset: Option<u32>,
}

impl DeviceBookmark {
    /// Parse `<file>#point(<path>)`
    pub fn parse(mark: &str) -> Result<Self, CodecError> {
        let malformed = || CodecError::MalformedBookmark(mark.to_string());

        let (file, point) = mark.split_once(POINT_MARKER).ok_or_else(malformed)?;
        if file.is_empty() {
            return Err(malformed());
        }

        // Some firmware pads the wrapped path with NULs
        let wrapped = point.trim_end_matches('\0');
        let inner = wrapped
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(malformed)?;
        let inner = inner.trim_start_matches('\0');

        let segments = inner.strip_prefix('/').ok_or_else(malformed)?;
        let segments: Vec<&str> = segments.split('/').collect();
        let last = segments.len() - 1;

        let mut path = Vec::with_capacity(segments.len());
        let mut text_offset = None;
        for (i, segment) in segments.iter().enumerate() {
            let caps = STEP_RE.captures(segment).ok_or_else(malformed)?;
            let index: u32 = caps[1].parse().map_err(|_| malformed())?;
            let mut step = PathStep::new(index);
            if let Some(anchor) = caps.get(2) {
                step = step.with_anchor(anchor.as_str());
            }
            if let Some(offset) = caps.get(3) {
                if i != last {
                    return Err(malformed());
                }
                text_offset = Some(parse_offset(offset.as_str(), mark));
            }
            path.push(step);
        }

        Ok(Self {
            file: file.to_string(),
            path,
            text_offset,
        })
    }
}

/// A non-numeric offset is not worth losing the bookmark over
fn parse_offset(raw: &str, mark: &str) -> u32 {
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!("Bookmark {:?} has a non-numeric offset {:?}, using 0", mark, raw);
        0
    })
}

impl fmt::Display for DeviceBookmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}(", self.file, POINT_MARKER)?;
        for step in &self.path {
            write!(f, "/{}", step)?;
        }
        if let Some(offset) = self.text_offset {
            write!(f, ":{}", offset)?;
        }
        write!(f, ")")
    }
}

/// Translate a device mark into the form kept in the library
///
/// Native marks are kept verbatim; side-loaded marks lose their
/// `<content-id>#` prefix. Either way the result must parse.
pub fn to_library_bookmark(
    mark: &str,
    content_id: &str,
    native_format: bool,
) -> Result<String, CodecError> {
    let bookmark = if native_format {
        mark
    } else {
        mark.strip_prefix(content_id)
            .and_then(|rest| rest.strip_prefix('#'))
            .ok_or_else(|| CodecError::MalformedBookmark(mark.to_string()))?
    };
    DeviceBookmark::parse(bookmark)?;
    Ok(bookmark.to_string())
}

/// Translate a library bookmark into the mark the device expects
///
/// Returns `None` when the library holds no usable location.
pub fn to_device_mark(bookmark: &str, content_id: &str, native_format: bool) -> Option<String> {
    let location = bookmark.split(BOOKMARK_SEPARATOR).next()?.trim();
    if location.is_empty() {
        return None;
    }
    if native_format {
        Some(location.to_string())
    } else {
        Some(format!("{}#{}", content_id, location))
    }
}
