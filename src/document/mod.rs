pub mod markdown;
pub mod tree;

use serde::{Deserialize, Serialize};

pub use tree::{ElementKind, Rect, TextTree};

/// Handle to a node of a [`DocumentModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Screen coordinate in the document's layout space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A caret position. On a text node `offset` counts characters; on an element
/// it is a child index, like a DOM range boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl TextPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A live user selection, `start` before `end` in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub start: TextPoint,
    pub end: TextPoint,
}

impl SelectionRange {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// The document a reading session narrates.
///
/// Implementations own the structure; the narration core only asks questions
/// through this trait and never mutates the document.
pub trait DocumentModel {
    fn root(&self) -> NodeId;

    fn parent_of(&self, node: NodeId) -> Option<NodeId>;

    /// Whether the node is a structural narration unit (heading, paragraph,
    /// sectioning container).
    fn is_narration_node(&self, node: NodeId) -> bool;

    /// All narration nodes in document order.
    fn ordered_narration_nodes(&self) -> Vec<NodeId>;

    /// Plain text of the node and all its descendants, untrimmed.
    fn text_of(&self, node: NodeId) -> String;

    /// Language tag of the nearest ancestor-or-self that declares one, then
    /// the document default, then unset.
    fn language_of(&self, node: NodeId) -> Option<String>;

    fn node_at_point(&self, point: Point) -> Option<NodeId>;

    fn focused_node(&self) -> Option<NodeId>;

    fn selection_range(&self) -> Option<SelectionRange>;

    fn selected_text(&self, range: &SelectionRange) -> String;

    /// Text of `node` following `point`, untrimmed. Text at `point` itself
    /// belongs to the result.
    fn text_after(&self, node: NodeId, point: TextPoint) -> String;

    /// Nearest narration node among `node` and its ancestors.
    fn narration_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if self.is_narration_node(candidate) {
                return Some(candidate);
            }
            current = self.parent_of(candidate);
        }
        None
    }
}
