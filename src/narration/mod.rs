pub mod entry;
pub mod indexer;

use serde::Serialize;

use crate::document::NodeId;

pub use entry::{Anchor, EntryDescriptor, TriggerMessage, TriggerMode};
pub use indexer::{all_blocks, compute_remainder, resolve_entry, Resolution};

/// One structural narration unit, positioned in the current block list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    /// Position in the current list, not in the whole document.
    pub index: usize,
    pub node: NodeId,
    /// Trimmed text of the node.
    pub text: String,
    pub language: Option<String>,
}

impl Block {
    pub fn is_narrable(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Where a passage sits inside the block it was cut from. `offset` and
/// `source_len` count characters of the block's trimmed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub node: NodeId,
    pub offset: usize,
    pub source_len: usize,
}

/// Text submitted as one utterance: a whole block, a selection, or the rest
/// of a block after a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passage {
    pub text: String,
    pub language: Option<String>,
    pub source: Option<SourceSpan>,
}

impl Passage {
    pub fn from_block(block: &Block) -> Self {
        Self {
            text: block.text.clone(),
            language: block.language.clone(),
            source: Some(SourceSpan {
                node: block.node,
                offset: 0,
                source_len: block.text.chars().count(),
            }),
        }
    }
}
