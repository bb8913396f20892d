//! The ordered content documents of one book

use serde::{Deserialize, Serialize};

/// A single content document in reading order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpineEntry {
    /// Path of the document, possibly under the spine's root prefix
    pub href: String,

    /// Relative size of the document (character count)
    pub weight: u64,
}

impl SpineEntry {
    pub fn new(href: impl Into<String>, weight: u64) -> Self {
        Self {
            href: href.into(),
            weight,
        }
    }
}

/// Ordered list of a book's content documents with their weights
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpineDocument {
    /// Directory prefix stripped from hrefs when talking to the device
    pub root: String,

    /// Documents in reading order
    pub entries: Vec<SpineEntry>,
}

impl SpineDocument {
    /// Create a spine with no root prefix
    pub fn new(entries: Vec<SpineEntry>) -> Self {
        Self {
            root: String::new(),
            entries,
        }
    }

    /// Set the root/temp-directory prefix of every href
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SpineEntry> {
        self.entries.get(index)
    }

    /// Device-relative filename of a spine document
    pub fn relative_href(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|entry| {
            let href = entry.href.as_str();
            let stripped = if self.root.is_empty() {
                href
            } else {
                href.strip_prefix(self.root.as_str()).unwrap_or(href)
            };
            stripped.trim_start_matches('/')
        })
    }

    /// Find the spine index of a device-relative filename
    pub fn index_of(&self, file: &str) -> Option<usize> {
        let file = file.trim_start_matches('/');
        (0..self.entries.len())
            .find(|&i| self.relative_href(i) == Some(file))
            .or_else(|| {
                // Devices sometimes record the name relative to the OPF directory
                let suffix = format!("/{}", file);
                (0..self.entries.len()).find(|&i| {
                    self.relative_href(i)
                        .map(|href| href.ends_with(&suffix))
                        .unwrap_or(false)
                })
            })
    }

    /// Sum of all document weights
    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// Sum of the weights of every document strictly before `index`
    pub fn weight_before(&self, index: usize) -> u64 {
        self.entries.iter().take(index).map(|e| e.weight).sum()
    }
}
