use super::{DocumentModel, NodeId, Point, SelectionRange, TextPoint};

/// Element kinds of a [`TextTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Document,
    Heading(u8),
    Paragraph,
    Section,
    Article,
    ListItem,
    List,
    Quote,
    Code,
    Inline,
}

impl ElementKind {
    /// Headings, paragraphs, list items and sectioning containers are
    /// narration blocks; lists, quotes and code are not.
    pub fn is_narration_block(&self) -> bool {
        matches!(
            self,
            Self::Heading(_) | Self::Paragraph | Self::Section | Self::Article | Self::ListItem
        )
    }

    fn is_inline(&self) -> bool {
        matches!(self, Self::Inline)
    }
}

/// Layout rectangle, half-open on the right and bottom edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(ElementKind),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    lang: Option<String>,
    bounds: Option<Rect>,
}

impl Node {
    fn new(data: NodeData, parent: Option<NodeId>) -> Self {
        Self {
            data,
            parent,
            children: Vec::new(),
            lang: None,
            bounds: None,
        }
    }
}

/// A run of flattened text. Separators inserted between blocks have no leaf.
struct Piece<'a> {
    leaf: Option<NodeId>,
    text: &'a str,
}

const BLOCK_BREAK: &str = "\n";

/// In-memory structured-text document.
///
/// Node 0 is the document root. Text lives only in leaf text nodes; block
/// elements are separated by a line break when their text is flattened.
#[derive(Debug, Clone)]
pub struct TextTree {
    nodes: Vec<Node>,
    default_language: Option<String>,
    focused: Option<NodeId>,
    selection: Option<SelectionRange>,
}

impl Default for TextTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TextTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Element(ElementKind::Document), None)],
            default_language: None,
            focused: None,
            selection: None,
        }
    }

    pub fn append_element(&mut self, parent: NodeId, kind: ElementKind) -> NodeId {
        self.push(parent, NodeData::Element(kind))
    }

    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.push(parent, NodeData::Text(text.into()))
    }

    /// Element with a single text child.
    pub fn append_block(
        &mut self,
        parent: NodeId,
        kind: ElementKind,
        text: impl Into<String>,
    ) -> NodeId {
        let element = self.append_element(parent, kind);
        self.append_text(element, text);
        element
    }

    pub fn set_lang(&mut self, node: NodeId, lang: impl Into<String>) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.lang = Some(lang.into());
        }
    }

    pub fn set_bounds(&mut self, node: NodeId, bounds: Rect) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.bounds = Some(bounds);
        }
    }

    pub fn set_default_language(&mut self, lang: Option<String>) {
        self.default_language = lang;
    }

    pub fn set_focus(&mut self, node: Option<NodeId>) {
        self.focused = node;
    }

    pub fn set_selection(&mut self, selection: Option<SelectionRange>) {
        self.selection = selection;
    }

    pub fn kind(&self, node: NodeId) -> Option<&ElementKind> {
        match &self.node(node)?.data {
            NodeData::Element(kind) => Some(kind),
            NodeData::Text(_) => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Selects the first occurrence of `needle` inside a single text node.
    pub fn select_text(&mut self, needle: &str) -> Option<SelectionRange> {
        if needle.is_empty() {
            return None;
        }
        let mut leaves = Vec::new();
        self.collect_leaves(self.root(), &mut leaves);
        for leaf in leaves {
            let Some(NodeData::Text(text)) = self.node(leaf).map(|n| &n.data) else {
                continue;
            };
            if let Some(byte) = text.find(needle) {
                let start = text[..byte].chars().count();
                let end = start + needle.chars().count();
                let range = SelectionRange {
                    start: TextPoint::new(leaf, start),
                    end: TextPoint::new(leaf, end),
                };
                self.selection = Some(range);
                return Some(range);
            }
        }
        None
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(data, Some(parent)));
        if let Some(p) = self.nodes.get_mut(parent.0) {
            p.children.push(id);
        }
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn leaf_len(&self, leaf: NodeId) -> usize {
        match self.node(leaf).map(|n| &n.data) {
            Some(NodeData::Text(text)) => text.chars().count(),
            _ => 0,
        }
    }

    fn collect_leaves(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let Some(n) = self.node(node) else { return };
        match &n.data {
            NodeData::Text(_) => out.push(node),
            NodeData::Element(_) => {
                for child in &n.children {
                    self.collect_leaves(*child, out);
                }
            }
        }
    }

    fn collect_pieces<'a>(&'a self, node: NodeId, out: &mut Vec<Piece<'a>>) {
        let Some(n) = self.node(node) else { return };
        match &n.data {
            NodeData::Text(text) => out.push(Piece {
                leaf: Some(node),
                text,
            }),
            NodeData::Element(_) => {
                for child in &n.children {
                    let block = matches!(
                        self.node(*child).map(|c| &c.data),
                        Some(NodeData::Element(kind)) if !kind.is_inline()
                    );
                    if block {
                        push_break(out);
                    }
                    self.collect_pieces(*child, out);
                    if block {
                        push_break(out);
                    }
                }
            }
        }
    }

    fn collect_narration_nodes(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let Some(n) = self.node(node) else { return };
        if let NodeData::Element(kind) = &n.data {
            if kind.is_narration_block() {
                out.push(node);
            }
            for child in &n.children {
                self.collect_narration_nodes(*child, out);
            }
        }
    }

    /// Maps a point to a (text leaf, char offset) caret.
    fn caret(&self, point: TextPoint) -> Option<(NodeId, usize)> {
        let node = self.node(point.node)?;
        match &node.data {
            NodeData::Text(text) => Some((point.node, point.offset.min(text.chars().count()))),
            NodeData::Element(_) => {
                for child in node.children.iter().skip(point.offset) {
                    let mut leaves = Vec::new();
                    self.collect_leaves(*child, &mut leaves);
                    if let Some(first) = leaves.first() {
                        return Some((*first, 0));
                    }
                }
                // past the last child: end of the element's last leaf
                let mut inside = Vec::new();
                self.collect_leaves(point.node, &mut inside);
                let last = *inside.last()?;
                Some((last, self.leaf_len(last)))
            }
        }
    }

    /// Flattened text of `node` between two carets; `None` means unbounded.
    fn slice(
        &self,
        node: NodeId,
        from: Option<(NodeId, usize)>,
        to: Option<(NodeId, usize)>,
    ) -> String {
        let mut pieces = Vec::new();
        self.collect_pieces(node, &mut pieces);

        let mut started = from.is_none();
        let mut out = String::new();
        for piece in pieces {
            let mut skip = 0;
            if let (Some(leaf), Some((from_leaf, offset))) = (piece.leaf, from) {
                if !started && leaf == from_leaf {
                    started = true;
                    skip = offset;
                }
            }
            if !started {
                continue;
            }
            if let (Some(leaf), Some((to_leaf, offset))) = (piece.leaf, to) {
                if leaf == to_leaf {
                    out.extend(piece.text.chars().take(offset).skip(skip));
                    return out;
                }
            }
            out.extend(piece.text.chars().skip(skip));
        }
        out
    }

    fn hit(&self, node: NodeId, point: Point) -> Option<NodeId> {
        let n = self.node(node)?;
        if !matches!(n.data, NodeData::Element(_)) {
            return None;
        }
        // later siblings paint on top
        for child in n.children.iter().rev() {
            if let Some(found) = self.hit(*child, point) {
                return Some(found);
            }
        }
        n.bounds
            .filter(|bounds| bounds.contains(point))
            .map(|_| node)
    }
}

fn push_break(out: &mut Vec<Piece<'_>>) {
    if out
        .last()
        .is_some_and(|piece| !piece.text.ends_with(char::is_whitespace))
    {
        out.push(Piece {
            leaf: None,
            text: BLOCK_BREAK,
        });
    }
}

impl DocumentModel for TextTree {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn is_narration_node(&self, node: NodeId) -> bool {
        self.kind(node).is_some_and(ElementKind::is_narration_block)
    }

    fn ordered_narration_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_narration_nodes(self.root(), &mut out);
        out
    }

    fn text_of(&self, node: NodeId) -> String {
        self.slice(node, None, None)
    }

    fn language_of(&self, node: NodeId) -> Option<String> {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.node(id)?;
            if let Some(lang) = n.lang.as_ref().filter(|l| !l.is_empty()) {
                return Some(lang.clone());
            }
            current = n.parent;
        }
        self.default_language.clone()
    }

    fn node_at_point(&self, point: Point) -> Option<NodeId> {
        self.hit(self.root(), point)
    }

    fn focused_node(&self) -> Option<NodeId> {
        self.focused
    }

    fn selection_range(&self) -> Option<SelectionRange> {
        self.selection
    }

    fn selected_text(&self, range: &SelectionRange) -> String {
        match (self.caret(range.start), self.caret(range.end)) {
            (Some(from), Some(to)) => self.slice(self.root(), Some(from), Some(to)),
            _ => String::new(),
        }
    }

    fn text_after(&self, node: NodeId, point: TextPoint) -> String {
        let Some(caret) = self.caret(point) else {
            return String::new();
        };
        let mut inside = Vec::new();
        self.collect_leaves(node, &mut inside);
        if inside.contains(&caret.0) {
            return self.slice(node, Some(caret), None);
        }

        // caret outside the node: everything follows it, or nothing does
        let mut all = Vec::new();
        self.collect_leaves(self.root(), &mut all);
        let position = |leaf: NodeId| all.iter().position(|l| *l == leaf);
        match (position(caret.0), inside.first().and_then(|first| position(*first))) {
            (Some(at), Some(first)) if at < first => self.text_of(node),
            _ => String::new(),
        }
    }
}
