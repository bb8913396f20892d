//! EPUB books as spine + document trees

use super::{parse_body, ContentNode, DocumentTrees};
use crate::error::{DocumentError, EstimateError};
use crate::types::{SpineDocument, SpineEntry};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// An EPUB opened for position estimation
///
/// Spine documents are weighted by their body character count. Trees are
/// re-parsed on demand; only one is needed per estimate.
pub struct EpubBook {
    path: PathBuf,
    spine: SpineDocument,
    documents: Vec<String>,
}

impl EpubBook {
    /// Open the EPUB at `path` and weigh its spine
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocumentError::MissingContentFile(
                path.display().to_string(),
            ));
        }

        let mut epub = ::epub::doc::EpubDoc::new(path)
            .map_err(|e| DocumentError::InvalidEpub(format!("{}: {}", path.display(), e)))?;

        // Device marks name files relative to the OPF directory
        let root = epub.root_base.to_string_lossy().replace('\\', "/");
        let root = match root.trim_end_matches('/') {
            "" => String::new(),
            dir => format!("{}/", dir),
        };

        let spine_items = epub.spine.clone();
        let mut entries = Vec::with_capacity(spine_items.len());
        let mut documents = Vec::with_capacity(spine_items.len());

        for item in &spine_items {
            let item_id = &item.idref;
            let href = epub
                .resources
                .get(item_id)
                .map(|resource| resource.path.to_string_lossy().replace('\\', "/"))
                .ok_or_else(|| DocumentError::MissingContentFile(item_id.clone()))?;
            let (content, _mime) = epub
                .get_resource_str(item_id)
                .ok_or_else(|| DocumentError::MissingContentFile(href.clone()))?;

            let weight = parse_body(&content).text_len() as u64;
            tracing::trace!("Spine document {} weighs {}", href, weight);

            entries.push(SpineEntry::new(href, weight));
            documents.push(content);
        }

        Ok(Self {
            path: path.to_path_buf(),
            spine: SpineDocument::new(entries).with_root(root),
            documents,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spine(&self) -> &SpineDocument {
        &self.spine
    }
}

impl DocumentTrees for EpubBook {
    fn document(&self, spine_index: usize) -> crate::Result<Cow<'_, ContentNode>> {
        let raw = self
            .documents
            .get(spine_index)
            .ok_or(EstimateError::MissingDocument(spine_index))?;
        Ok(Cow::Owned(parse_body(raw)))
    }
}
