use super::events::{CharSpan, HighlightTarget, UiEvent, UiSink};
use crate::narration::Passage;

/// Tracks what is emphasized on the page while a passage is spoken.
///
/// Block emphasis is set as soon as a passage starts. Word emphasis follows
/// engine boundaries when the engine reports them; offsets are shifted by the
/// passage's position inside its block and clamped to the block text.
pub struct HighlightCursor {
    ui: UiSink,
    current: Option<HighlightTarget>,
    span_base: usize,
    source_len: usize,
    high_contrast: bool,
}

impl HighlightCursor {
    pub fn new(ui: UiSink, high_contrast: bool) -> Self {
        Self {
            ui,
            current: None,
            span_base: 0,
            source_len: 0,
            high_contrast,
        }
    }

    pub fn current(&self) -> Option<&HighlightTarget> {
        self.current.as_ref()
    }

    pub fn high_contrast(&self) -> bool {
        self.high_contrast
    }

    pub fn emphasize(&mut self, passage: &Passage, block_index: Option<usize>) {
        let Some(source) = passage.source else {
            self.clear();
            return;
        };
        self.span_base = source.offset;
        self.source_len = source.source_len;
        let target = HighlightTarget {
            node: source.node,
            block_index,
            span: None,
            high_contrast: self.high_contrast,
        };
        self.current = Some(target.clone());
        self.ui.emit(UiEvent::Highlight(Some(target)));
    }

    /// `char_index` is relative to the spoken passage.
    pub fn boundary(&mut self, char_index: usize, len: usize) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        let start = (self.span_base + char_index).min(self.source_len);
        let len = len.min(self.source_len - start);
        current.span = Some(CharSpan { start, len });
        self.ui.emit(UiEvent::Highlight(Some(current.clone())));
    }

    pub fn clear(&mut self) {
        if self.current.take().is_some() {
            self.ui.emit(UiEvent::Highlight(None));
        }
    }

    pub fn set_high_contrast(&mut self, on: bool) {
        self.high_contrast = on;
        if let Some(current) = self.current.as_mut() {
            current.high_contrast = on;
            self.ui.emit(UiEvent::Highlight(Some(current.clone())));
        }
    }
}
