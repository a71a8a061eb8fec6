use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use pulldown_cmark::{Event, Options, Parser, Tag};

use super::tree::{ElementKind, Rect, TextTree};
use super::{DocumentModel, NodeId, Point};

/// Height of one source line in the synthetic layout
pub const LINE_HEIGHT: f64 = 20.0;
pub const PAGE_WIDTH: f64 = 800.0;

/// Loads a document from disk. `.md`/`.markdown` files are parsed as
/// Markdown, anything else as plain text with blank-line separated paragraphs.
pub fn load_document(path: &Path, default_language: Option<String>) -> Result<TextTree> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;

    let is_markdown = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"));

    let tree = if is_markdown {
        parse_markdown(&source, default_language)
    } else {
        parse_plain_text(&source, default_language)
    };
    tracing::info!(
        "Loaded {} ({} narration blocks)",
        path.display(),
        tree.ordered_narration_nodes().len()
    );
    Ok(tree)
}

/// Point inside the layout row of a 1-based source line.
pub fn point_for_line(line: usize) -> Point {
    let row = line.saturating_sub(1) as f64;
    Point::new(1.0, row * LINE_HEIGHT + 1.0)
}

pub fn parse_markdown(source: &str, default_language: Option<String>) -> TextTree {
    let mut tree = TextTree::new();
    tree.set_default_language(default_language);
    let lines = LineIndex::new(source);
    let root = tree.root();

    let mut stack: Vec<NodeId> = vec![root];
    // one entry per Start event: did it open a node?
    let mut opened: Vec<bool> = Vec::new();

    for (event, range) in Parser::new_ext(source, Options::empty()).into_offset_iter() {
        let parent = stack.last().copied().unwrap_or(root);
        match event {
            Event::Start(tag) => {
                let kind = match tag {
                    Tag::Heading { level, .. } => Some(ElementKind::Heading(level as u8)),
                    // loose list items wrap their text in paragraphs; keep the item as the block
                    Tag::Paragraph if tree.kind(parent) == Some(&ElementKind::ListItem) => {
                        if !tree.children(parent).is_empty() {
                            tree.append_text(parent, " ");
                        }
                        None
                    }
                    Tag::Paragraph => Some(ElementKind::Paragraph),
                    Tag::Item => Some(ElementKind::ListItem),
                    Tag::List(_) => Some(ElementKind::List),
                    Tag::BlockQuote(_) => Some(ElementKind::Quote),
                    Tag::CodeBlock(_) => Some(ElementKind::Code),
                    Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } => {
                        Some(ElementKind::Inline)
                    }
                    _ => None,
                };
                match kind {
                    Some(kind) => {
                        let node = tree.append_element(parent, kind);
                        tree.set_bounds(node, lines.rect(&range));
                        stack.push(node);
                        opened.push(true);
                    }
                    None => opened.push(false),
                }
            }
            Event::End(_) => {
                if opened.pop() == Some(true) {
                    stack.pop();
                }
            }
            Event::Text(text) | Event::Code(text) => {
                tree.append_text(parent, text.to_string());
            }
            Event::SoftBreak => {
                tree.append_text(parent, " ");
            }
            Event::HardBreak => {
                tree.append_text(parent, "\n");
            }
            _ => {}
        }
    }
    tree
}

pub fn parse_plain_text(source: &str, default_language: Option<String>) -> TextTree {
    let mut tree = TextTree::new();
    tree.set_default_language(default_language);
    let root = tree.root();

    let mut paragraph: Vec<&str> = Vec::new();
    let mut first_line = 0;
    for (index, line) in source.lines().chain(std::iter::once("")).enumerate() {
        if line.trim().is_empty() {
            if !paragraph.is_empty() {
                let node = tree.append_block(root, ElementKind::Paragraph, paragraph.join(" "));
                tree.set_bounds(node, row_rect(first_line, index - 1));
                paragraph.clear();
            }
            continue;
        }
        if paragraph.is_empty() {
            first_line = index;
        }
        paragraph.push(line.trim());
    }
    tree
}

fn row_rect(first: usize, last: usize) -> Rect {
    let rows = (last.max(first) - first + 1) as f64;
    Rect::new(0.0, first as f64 * LINE_HEIGHT, PAGE_WIDTH, rows * LINE_HEIGHT)
}

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn line_of(&self, byte: usize) -> usize {
        self.starts.partition_point(|&start| start <= byte).saturating_sub(1)
    }

    fn rect(&self, range: &Range<usize>) -> Rect {
        let first = self.line_of(range.start);
        let last = self.line_of(range.end.saturating_sub(1).max(range.start));
        row_rect(first, last)
    }
}
