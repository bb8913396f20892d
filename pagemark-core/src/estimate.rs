//! Percent-through-book estimation from a structured position
//!
//! The walk starts at the document's `<body>`, which the first two path steps
//! address, and accumulates the characters on either side of the pointer.
//! The intra-document fraction is then scaled by the spine weights.

use crate::document::{ContentNode, DocumentTrees};
use crate::error::{CodecError, EstimateError};
use crate::types::{PathStep, Position, SpineDocument};

/// Path steps that lead from the document root to `<body>`
pub const BODY_DEPTH: usize = 2;

/// Longest path the walk will follow
pub const MAX_PATH_DEPTH: usize = 512;

/// Characters before and after a pointer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Weights {
    pub left: usize,
    pub right: usize,
}

impl Weights {
    /// Fraction of the document before the pointer, zero for an empty document
    pub fn fraction(&self) -> f64 {
        let total = self.left + self.right;
        if total == 0 {
            0.0
        } else {
            self.left as f64 / total as f64
        }
    }
}

/// Percent of the whole book read at `position`, in `[0, 100]`
pub fn estimate<T>(spine: &SpineDocument, trees: &T, position: &Position) -> crate::Result<f64>
where
    T: DocumentTrees + ?Sized,
{
    let total = spine.total_weight();
    if total == 0 {
        return Err(EstimateError::EmptyBook.into());
    }
    let entry = spine
        .get(position.spine_index)
        .ok_or(CodecError::SpineIndexOutOfRange {
            index: position.spine_index,
            len: spine.len(),
        })?;
    if position.path.len() > MAX_PATH_DEPTH {
        return Err(EstimateError::PathTooDeep {
            depth: position.path.len(),
            limit: MAX_PATH_DEPTH,
        }
        .into());
    }

    let body = trees.document(position.spine_index)?;
    let weights = document_weights(&body, position);

    let before = spine.weight_before(position.spine_index) as f64;
    let within = entry.weight as f64 * weights.fraction();
    let percent = 100.0 * (before + within) / total as f64;

    tracing::trace!(
        "Position {} in spine {}: left={} right={} -> {:.2}%",
        position.path_string(),
        position.spine_index,
        weights.left,
        weights.right,
        percent
    );

    Ok(percent.clamp(0.0, 100.0))
}

/// Round an estimate to the whole-percent value stored by device and library
pub fn whole_percent(percent: f64) -> u8 {
    percent.round().clamp(0.0, 100.0) as u8
}

/// Character weights on either side of `position` inside one document body
pub fn document_weights(body: &ContentNode, position: &Position) -> Weights {
    let steps = position.path.get(BODY_DEPTH..).unwrap_or(&[]);
    if steps.is_empty() {
        return Weights {
            left: 0,
            right: body.text_len(),
        };
    }
    walk(body, steps, position.text_offset, false)
}

fn walk(parent: &ContentNode, steps: &[PathStep], offset: Option<u32>, with_tail: bool) -> Weights {
    let Some((step, rest)) = steps.split_first() else {
        return Weights::default();
    };
    let children = &parent.children;
    let text_len = parent.text.chars().count();
    let outer = |nodes: &[ContentNode]| nodes.iter().map(ContentNode::outer_len).sum::<usize>();

    let mut weights = Weights {
        left: 0,
        right: if with_tail { parent.tail_len() } else { 0 },
    };

    let (is_text, slot) = match step
        .anchor
        .as_deref()
        .and_then(|id| parent.child_with_id(id))
    {
        Some(found) => (false, found),
        None => (step.is_text_run(), step.child_index()),
    };

    if is_text {
        // Run `slot` is the parent's own text or the tail of the previous child
        let run = slot.min(children.len());
        let run_len = if run == 0 {
            text_len
        } else {
            children[run - 1].tail_len()
        };
        if !rest.is_empty() {
            tracing::debug!("Path continues below text step {}, ignoring the rest", step);
        }
        let off = if rest.is_empty() {
            (offset.unwrap_or(0) as usize).min(run_len)
        } else {
            0
        };
        weights.left += text_len + outer(&children[..run]) - run_len + off;
        weights.right += run_len - off + outer(&children[run..]);
    } else if slot >= children.len() {
        tracing::debug!(
            "Step {} is past the last of {} children, pointing at the end",
            step,
            children.len()
        );
        weights.left += parent.text_len();
    } else {
        let target = &children[slot];
        weights.left += text_len + outer(&children[..slot]);
        weights.right += outer(&children[slot + 1..]);

        if rest.is_empty() {
            let off = (offset.unwrap_or(0) as usize).min(target.text_len());
            weights.left += off;
            weights.right += target.outer_len() - off;
        } else {
            let inner = walk(target, rest, offset, true);
            weights.left += inner.left;
            weights.right += inner.right;
        }
    }

    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpineEntry;

    fn steps(indices: &[u32]) -> Vec<PathStep> {
        indices.iter().copied().map(PathStep::new).collect()
    }

    /// body: "" [p "aaaa"] "" [p "bbbb" [em "cc"] "dd"] "" [p "eeee"]
    fn body() -> ContentNode {
        ContentNode::new("body")
            .with_child(ContentNode::new("p").with_text("aaaa"))
            .with_child(
                ContentNode::new("p")
                    .with_id("middle")
                    .with_text("bbbb")
                    .with_child(ContentNode::new("em").with_text("cc").with_tail("dd")),
            )
            .with_child(ContentNode::new("p").with_text("eeee"))
    }

    #[test]
    fn test_weights_at_element_start() {
        let position = Position::new(0, steps(&[2, 4, 4]));
        let weights = document_weights(&body(), &position);
        assert_eq!(weights, Weights { left: 4, right: 12 });
    }

    #[test]
    fn test_weights_with_offset_into_element() {
        let position = Position::new(0, steps(&[2, 4, 4])).with_offset(3);
        let weights = document_weights(&body(), &position);
        assert_eq!(weights, Weights { left: 7, right: 9 });
    }

    #[test]
    fn test_weights_text_run_inside_element() {
        // third run of the middle paragraph is the em's tail "dd"
        let position = Position::new(0, steps(&[2, 4, 4, 3])).with_offset(1);
        let weights = document_weights(&body(), &position);
        assert_eq!(weights, Weights { left: 4 + 4 + 2 + 1, right: 1 + 4 });
    }

    #[test]
    fn test_weights_first_text_run() {
        let position = Position::new(0, steps(&[2, 4, 4, 1])).with_offset(2);
        let weights = document_weights(&body(), &position);
        assert_eq!(weights, Weights { left: 6, right: 10 });
    }

    #[test]
    fn test_anchor_overrides_index() {
        let position = Position::new(
            0,
            vec![
                PathStep::new(2),
                PathStep::new(4),
                PathStep::new(6).with_anchor("middle"),
            ],
        );
        let weights = document_weights(&body(), &position);
        assert_eq!(weights, Weights { left: 4, right: 12 });
    }

    #[test]
    fn test_step_past_end() {
        let position = Position::new(0, steps(&[2, 4, 40]));
        let weights = document_weights(&body(), &position);
        assert_eq!(weights, Weights { left: 16, right: 0 });
    }

    #[test]
    fn test_short_path_points_at_start() {
        let position = Position::new(0, steps(&[2, 4]));
        let weights = document_weights(&body(), &position);
        assert_eq!(weights, Weights { left: 0, right: 16 });
    }

    #[test]
    fn test_offset_is_clamped() {
        let position = Position::new(0, steps(&[2, 4, 2])).with_offset(1000);
        let weights = document_weights(&body(), &position);
        assert_eq!(weights.left + weights.right, 16);
        assert_eq!(weights, Weights { left: 4, right: 12 });
    }

    #[test]
    fn test_estimate_scales_by_spine() {
        let spine = SpineDocument::new(vec![
            SpineEntry::new("a.xhtml", 100),
            SpineEntry::new("b.xhtml", 100),
        ]);
        let trees = vec![body(), body()];
        let position = Position::new(1, steps(&[2, 4, 4])).with_offset(4);
        // left 8 of 16 in the second half of the book
        let percent = estimate(&spine, &trees, &position).unwrap();
        assert!((percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_empty_document_contributes_nothing() {
        let spine = SpineDocument::new(vec![
            SpineEntry::new("a.xhtml", 10),
            SpineEntry::new("b.xhtml", 10),
        ]);
        let trees = vec![ContentNode::new("body"), ContentNode::new("body")];
        let position = Position::new(1, steps(&[2, 4, 2])).with_offset(5);
        let percent = estimate(&spine, &trees, &position).unwrap();
        assert!((percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_empty_book() {
        let spine = SpineDocument::new(vec![SpineEntry::new("a.xhtml", 0)]);
        let trees = vec![body()];
        let position = Position::new(0, steps(&[2, 4, 2]));
        let err = estimate(&spine, &trees, &position).unwrap_err();
        assert!(matches!(
            err,
            crate::PagemarkError::Estimate(EstimateError::EmptyBook)
        ));
    }

    #[test]
    fn test_estimate_rejects_deep_paths() {
        let spine = SpineDocument::new(vec![SpineEntry::new("a.xhtml", 10)]);
        let trees = vec![body()];
        let position = Position::new(0, vec![PathStep::new(2); MAX_PATH_DEPTH + 1]);
        assert!(estimate(&spine, &trees, &position).is_err());
    }

    #[test]
    fn test_whole_percent() {
        assert_eq!(whole_percent(49.5), 50);
        assert_eq!(whole_percent(-3.0), 0);
        assert_eq!(whole_percent(100.4), 100);
    }
}
