//! Structured reading positions inside a spine document

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a position path
///
/// Odd indices address a text run, even indices address child element
/// `(index - 1) / 2`. An anchor, when present, names the element the step
/// should resolve to and wins over the numeric index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathStep {
    /// Raw step number as written in the bookmark
    pub index: u32,

    /// Optional `[anchor-id]` qualifier
    pub anchor: Option<String>,
}

impl PathStep {
    /// Create a plain numeric step
    pub fn new(index: u32) -> Self {
        Self {
            index,
            anchor: None,
        }
    }

    /// Attach an anchor id to the step
    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    /// Whether the step points into a text run rather than an element
    pub fn is_text_run(&self) -> bool {
        self.index % 2 == 1
    }

    /// Child slot addressed by this step
    pub fn child_index(&self) -> usize {
        (self.index.saturating_sub(1) / 2) as usize
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)?;
        if let Some(anchor) = &self.anchor {
            write!(f, "[{}]", anchor)?;
        }
        Ok(())
    }
}

/// A location inside a book: spine document, element path and text offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Index of the document in the book's spine
    pub spine_index: usize,

    /// Element path from the document root
    pub path: Vec<PathStep>,

    /// Character offset into the text run addressed by the last step.
    /// `None` when the bookmark carried no `:offset` suffix.
    pub text_offset: Option<u32>,
}

impl Position {
    pub fn new(spine_index: usize, path: Vec<PathStep>) -> Self {
        Self {
            spine_index,
            path,
            text_offset: None,
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.text_offset = Some(offset);
        self
    }

    /// Offset into the final text run, zero when absent
    pub fn offset(&self) -> u32 {
        self.text_offset.unwrap_or(0)
    }

    /// The numeric step values, ignoring anchors
    pub fn indices(&self) -> Vec<u32> {
        self.path.iter().map(|step| step.index).collect()
    }

    /// Render the path in `/a/b/c:offset` form
    pub fn path_string(&self) -> String {
        let mut out = String::new();
        for step in &self.path {
            out.push('/');
            out.push_str(&step.to_string());
        }
        if let Some(offset) = self.text_offset {
            out.push(':');
            out.push_str(&offset.to_string());
        }
        out
    }
}
