use serde::{Deserialize, Serialize};

use crate::document::{DocumentModel, NodeId, Point, SelectionRange};

/// What a page-mode entry starts from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anchor {
    /// The focused node if any, else the node under the point.
    Point(Point),
    Node(NodeId),
}

/// Where and how a reading session begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryDescriptor {
    /// Read only the selected text.
    Selection(Option<SelectionRange>),
    /// Read the selection, the rest of its block, then the rest of the page.
    /// `point` is used when the selection is empty and no anchor node exists.
    FromSelection {
        selection: Option<SelectionRange>,
        point: Point,
    },
    /// Read from the block under the point to the end.
    FromPoint(Point),
    /// Read from the anchored block to the end.
    FromPage(Anchor),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    Selection,
    FromHere,
    #[default]
    Page,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Trigger delivered by the host (context menu, hotkey, message relay).
///
/// Every field is optional: a missing mode reads the page, missing
/// coordinates default to the origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerMessage {
    #[serde(default)]
    pub mode: Option<TriggerMode>,
    #[serde(default, alias = "clientX")]
    pub x: Option<f64>,
    #[serde(default, alias = "clientY")]
    pub y: Option<f64>,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
}

impl TriggerMessage {
    pub fn new(mode: TriggerMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn at(mut self, point: Point) -> Self {
        self.x = Some(point.x);
        self.y = Some(point.y);
        self
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode.unwrap_or_default()
    }

    pub fn point(&self) -> Point {
        match self.coordinate {
            Some(c) => Point::new(c.x, c.y),
            None => Point::new(self.x.unwrap_or(0.0), self.y.unwrap_or(0.0)),
        }
    }

    /// Reads the live selection from the document where the mode needs it.
    pub fn to_entry(&self, doc: &impl DocumentModel) -> EntryDescriptor {
        let point = self.point();
        match self.mode() {
            TriggerMode::Selection => EntryDescriptor::Selection(doc.selection_range()),
            TriggerMode::FromHere => EntryDescriptor::FromSelection {
                selection: doc.selection_range(),
                point,
            },
            TriggerMode::Page => EntryDescriptor::FromPage(Anchor::Point(point)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ElementKind, TextTree};

    #[test]
    fn parses_host_message() {
        let msg: TriggerMessage = serde_json::from_str(
            r#"{"type":"READ_FROM_HERE","mode":"from-here","clientX":10,"clientY":20.5}"#,
        )
        .unwrap();
        assert_eq!(msg.mode(), TriggerMode::FromHere);
        assert_eq!(msg.point(), Point::new(10.0, 20.5));
    }

    #[test]
    fn missing_fields_default_to_page_at_origin() {
        let msg: TriggerMessage = serde_json::from_str("{}").unwrap();
        assert_eq!(msg.mode(), TriggerMode::Page);
        assert_eq!(msg.point(), Point::default());

        let msg: TriggerMessage =
            serde_json::from_str(r#"{"mode":"selection","coordinate":{"x":3}}"#).unwrap();
        assert_eq!(msg.mode(), TriggerMode::Selection);
        assert_eq!(msg.point(), Point::new(3.0, 0.0));
    }

    #[test]
    fn maps_modes_to_entries() {
        let mut tree = TextTree::new();
        let root = tree.root();
        tree.append_block(root, ElementKind::Paragraph, "Hello world.");
        let range = tree.select_text("world");

        let point = Point::new(4.0, 2.0);
        assert_eq!(
            TriggerMessage::new(TriggerMode::Selection).to_entry(&tree),
            EntryDescriptor::Selection(range)
        );
        assert_eq!(
            TriggerMessage::new(TriggerMode::FromHere).at(point).to_entry(&tree),
            EntryDescriptor::FromSelection {
                selection: range,
                point
            }
        );
        assert_eq!(
            TriggerMessage::default().at(point).to_entry(&tree),
            EntryDescriptor::FromPage(Anchor::Point(point))
        );
    }
}
