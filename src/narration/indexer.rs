use crate::document::{DocumentModel, NodeId, SelectionRange, TextPoint};
use crate::error::NarrationError;

use super::entry::{Anchor, EntryDescriptor};
use super::{Block, Passage, SourceSpan};

/// Where playback begins once an entry descriptor is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Block-by-block playback of `blocks` from `start`.
    Blocks { blocks: Vec<Block>, start: usize },
    /// A single ad-hoc utterance with no continuation.
    Selection(Passage),
    /// The selection, then the rest of its block, then `following` from 0.
    SelectionThenBlocks {
        selection: Passage,
        remainder: Option<Passage>,
        following: Vec<Block>,
    },
}

/// Every narration block of the document, in document order.
pub fn all_blocks(doc: &impl DocumentModel) -> Vec<Block> {
    doc.ordered_narration_nodes()
        .into_iter()
        .enumerate()
        .map(|(index, node)| block_for(doc, node, index))
        .collect()
}

pub fn resolve_entry(
    doc: &impl DocumentModel,
    entry: &EntryDescriptor,
) -> Result<Resolution, NarrationError> {
    match entry {
        EntryDescriptor::FromPage(anchor) => Ok(from_node(doc, page_target(doc, anchor))),
        EntryDescriptor::FromPoint(point) => Ok(from_node(doc, doc.node_at_point(*point))),
        EntryDescriptor::Selection(selection) => {
            let range = selection
                .filter(|range| !range.is_collapsed())
                .ok_or(NarrationError::EmptySelection)?;
            let (block, _) = containing_block(doc, range.start.node);
            let passage =
                selection_passage(doc, &range, &block).ok_or(NarrationError::EmptySelection)?;
            Ok(Resolution::Selection(passage))
        }
        EntryDescriptor::FromSelection { selection, point } => {
            let Some(range) = selection.filter(|range| !range.is_collapsed()) else {
                let anchor = match selection {
                    Some(range) => Anchor::Node(range.start.node),
                    None => Anchor::Point(*point),
                };
                tracing::debug!("Selection collapsed, reading from its anchor instead");
                return Ok(from_node(doc, page_target(doc, &anchor)));
            };

            let (start_block, start_following) = containing_block(doc, range.start.node);
            let Some(passage) = selection_passage(doc, &range, &start_block) else {
                tracing::debug!("Selection has no readable text, reading from its anchor instead");
                return Ok(from_node(doc, Some(range.start.node)));
            };

            // continue from the block the selection ends in, when that one comes later
            let (block, following) = match doc.narration_ancestor(range.end.node) {
                Some(end) if end != start_block.node => {
                    let (end_block, end_following) = containing_block(doc, range.end.node);
                    if end_following.len() < start_following.len() {
                        (end_block, end_following)
                    } else {
                        (start_block, start_following)
                    }
                }
                _ => (start_block, start_following),
            };
            let remainder = compute_remainder(doc, &block, range.end);
            Ok(Resolution::SelectionThenBlocks {
                selection: passage,
                remainder,
                following,
            })
        }
    }
}

/// Text of `block` following `selection_end`, trimmed. `None` when nothing
/// narrable is left.
pub fn compute_remainder(
    doc: &impl DocumentModel,
    block: &Block,
    selection_end: TextPoint,
) -> Option<Passage> {
    let raw = doc.text_after(block.node, selection_end);
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let full = doc.text_of(block.node);
    let full_len = full.chars().count();
    let consumed = full_len.saturating_sub(raw.chars().count());
    let offset = (consumed + leading_whitespace(&raw)).saturating_sub(leading_whitespace(&full));

    Some(Passage {
        text: text.to_string(),
        language: block.language.clone(),
        source: Some(SourceSpan {
            node: block.node,
            offset,
            source_len: block.text.chars().count(),
        }),
    })
}

fn block_for(doc: &impl DocumentModel, node: NodeId, index: usize) -> Block {
    Block {
        index,
        node,
        text: doc.text_of(node).trim().to_string(),
        language: doc.language_of(node),
    }
}

fn whole_document(doc: &impl DocumentModel) -> Block {
    block_for(doc, doc.root(), 0)
}

fn reindex(blocks: impl IntoIterator<Item = Block>) -> Vec<Block> {
    blocks
        .into_iter()
        .enumerate()
        .map(|(index, block)| Block { index, ..block })
        .collect()
}

fn page_target(doc: &impl DocumentModel, anchor: &Anchor) -> Option<NodeId> {
    match anchor {
        Anchor::Node(node) => Some(*node),
        Anchor::Point(point) => doc.focused_node().or_else(|| doc.node_at_point(*point)),
    }
}

/// Blocks from the narration ancestor of `node` to the end, or the whole
/// document as one block when there is none.
fn from_node(doc: &impl DocumentModel, node: Option<NodeId>) -> Resolution {
    let blocks = all_blocks(doc);
    let target = node.and_then(|n| doc.narration_ancestor(n));
    match target.and_then(|t| blocks.iter().position(|b| b.node == t)) {
        Some(k) => Resolution::Blocks {
            blocks: reindex(blocks.into_iter().skip(k)),
            start: 0,
        },
        None => {
            tracing::debug!("No narration block at the anchor, reading the whole document");
            Resolution::Blocks {
                blocks: vec![whole_document(doc)],
                start: 0,
            }
        }
    }
}

/// The block containing `node` and the blocks strictly after it. Without a
/// containing block the whole document stands in and nothing follows.
fn containing_block(doc: &impl DocumentModel, node: NodeId) -> (Block, Vec<Block>) {
    let blocks = all_blocks(doc);
    let target = doc.narration_ancestor(node);
    match target.and_then(|t| blocks.iter().position(|b| b.node == t)) {
        Some(k) => {
            let block = blocks[k].clone();
            (block, reindex(blocks.into_iter().skip(k + 1)))
        }
        None => (whole_document(doc), Vec::new()),
    }
}

fn selection_passage(
    doc: &impl DocumentModel,
    range: &SelectionRange,
    block: &Block,
) -> Option<Passage> {
    let raw = doc.selected_text(range);
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let full = doc.text_of(block.node);
    let full_len = full.chars().count();
    let after_start = doc.text_after(block.node, range.start).chars().count();
    let offset = (full_len.saturating_sub(after_start) + leading_whitespace(&raw))
        .saturating_sub(leading_whitespace(&full));

    Some(Passage {
        text: text.to_string(),
        language: doc.language_of(range.start.node),
        source: Some(SourceSpan {
            node: block.node,
            offset,
            source_len: block.text.chars().count(),
        }),
    })
}

fn leading_whitespace(text: &str) -> usize {
    text.chars().take_while(|c| c.is_whitespace()).count()
}
