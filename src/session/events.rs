use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::document::NodeId;
use crate::state::PlaybackState;

/// Text shown in the control bar's status slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusLine {
    Empty,
    /// `index` is 0-based; displayed 1-based.
    Block { index: usize, total: usize },
    SelectedText,
    SelectionContinuation,
    NothingSelected,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Block { index, total } => write!(f, "Block {} of {}", index + 1, total),
            Self::SelectedText => f.write_str("Selected text"),
            Self::SelectionContinuation => f.write_str("Selected text + block + page"),
            Self::NothingSelected => f.write_str("Nothing selected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseLabel {
    Pause,
    Play,
}

impl fmt::Display for PauseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => f.write_str("Pause"),
            Self::Play => f.write_str("Play"),
        }
    }
}

/// Character range inside a block's trimmed text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CharSpan {
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightTarget {
    pub node: NodeId,
    /// Position in the block list; `None` for selections and remainders.
    pub block_index: Option<usize>,
    pub span: Option<CharSpan>,
    pub high_contrast: bool,
}

/// Everything the control bar and page overlay need to render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum UiEvent {
    Status(StatusLine),
    PauseLabel(PauseLabel),
    /// `None` clears the highlight.
    Highlight(Option<HighlightTarget>),
    BarVisible(bool),
    BlockFailed {
        block_index: Option<usize>,
        message: String,
    },
    Contrast(bool),
    Playback(PlaybackState),
}

pub type UiReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Sending half of the UI event stream. A dropped receiver is not an error.
#[derive(Debug, Clone)]
pub struct UiSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiSink {
    pub fn channel() -> (Self, UiReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("UI listener is gone; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text() {
        assert_eq!(StatusLine::Block { index: 0, total: 3 }.to_string(), "Block 1 of 3");
        assert_eq!(StatusLine::SelectionContinuation.to_string(), "Selected text + block + page");
        assert_eq!(StatusLine::Empty.to_string(), "");
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(UiEvent::Status(StatusLine::Block { index: 1, total: 2 })).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type":"status","payload":{"kind":"block","index":1,"total":2}})
        );

        let json = serde_json::to_value(UiEvent::Highlight(None)).unwrap();
        assert_eq!(json, serde_json::json!({"type":"highlight","payload":null}));
    }
}
