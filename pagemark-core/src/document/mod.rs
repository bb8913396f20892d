//! Parsed content documents used by the percent estimator
//!
//! Documents are modelled the way the reference tree model sees them: every
//! element owns the text before its first child (`text`) and the text that
//! follows its own end tag up to the next sibling (`tail`).

mod epub;
mod html;

pub use self::epub::EpubBook;
pub use self::html::parse_body;

use crate::error::EstimateError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// An element of a parsed content document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Element name
    pub tag: String,

    /// Value of the `id` attribute
    pub id: Option<String>,

    /// Text before the first child element
    pub text: String,

    /// Text after this element's end tag, before the next sibling
    pub tail: String,

    /// Child elements in document order
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }

    pub fn with_child(mut self, child: ContentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Characters of flattened text inside this element, excluding its tail
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
            + self
                .children
                .iter()
                .map(ContentNode::outer_len)
                .sum::<usize>()
    }

    /// Characters of this element's tail
    pub fn tail_len(&self) -> usize {
        self.tail.chars().count()
    }

    /// Flattened text plus tail
    pub fn outer_len(&self) -> usize {
        self.text_len() + self.tail_len()
    }

    /// Position of the direct child carrying `id`
    pub fn child_with_id(&self, id: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.id.as_deref() == Some(id))
    }
}

/// Source of parsed document trees for a book's spine
///
/// Each tree is rooted at the document's `<body>` element.
pub trait DocumentTrees {
    fn document(&self, spine_index: usize) -> crate::Result<Cow<'_, ContentNode>>;
}

impl DocumentTrees for [ContentNode] {
    fn document(&self, spine_index: usize) -> crate::Result<Cow<'_, ContentNode>> {
        self.get(spine_index)
            .map(Cow::Borrowed)
            .ok_or_else(|| EstimateError::MissingDocument(spine_index).into())
    }
}

impl DocumentTrees for Vec<ContentNode> {
    fn document(&self, spine_index: usize) -> crate::Result<Cow<'_, ContentNode>> {
        self.as_slice().document(spine_index)
    }
}

impl DocumentTrees for HashMap<usize, ContentNode> {
    fn document(&self, spine_index: usize) -> crate::Result<Cow<'_, ContentNode>> {
        self.get(&spine_index)
            .map(Cow::Borrowed)
            .ok_or_else(|| EstimateError::MissingDocument(spine_index).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        let node = ContentNode::new("p")
            .with_text("ab")
            .with_child(ContentNode::new("em").with_text("cde").with_tail("fg"))
            .with_tail("\n");
        assert_eq!(node.text_len(), 7);
        assert_eq!(node.tail_len(), 1);
        assert_eq!(node.outer_len(), 8);
    }

    #[test]
    fn test_lengths_count_chars_not_bytes() {
        let node = ContentNode::new("p").with_text("héllo");
        assert_eq!(node.text_len(), 5);
    }

    #[test]
    fn test_child_with_id() {
        let node = ContentNode::new("body")
            .with_child(ContentNode::new("p"))
            .with_child(ContentNode::new("p").with_id("two"));
        assert_eq!(node.child_with_id("two"), Some(1));
        assert_eq!(node.child_with_id("three"), None);
    }

    #[test]
    fn test_missing_document() {
        let trees: Vec<ContentNode> = vec![ContentNode::new("body")];
        assert!(trees.document(0).is_ok());
        assert!(trees.document(1).is_err());
    }
}
