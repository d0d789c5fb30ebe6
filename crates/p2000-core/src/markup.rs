// ── Embedded markup flattening ──
//
// Alert text and unit descriptions arrive as small HTML fragments where
// span classes tag the meaning of each piece (`c` city, `s` street, `wb`
// readable text). Extraction only needs a flat, document-ordered list of
// nodes with their depth, classes, and text, not a DOM.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Node};

/// Class that marks an element's text as part of the readable message.
pub const WORD_BREAK_CLASS: &str = "wb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Element,
}

/// One text or element node, flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupNode {
    pub kind: NodeKind,
    /// 0 for nodes directly in the fragment.
    pub depth: usize,
    /// Class names in attribute order. Always empty for text nodes.
    pub classes: Vec<String>,
    /// Text content, including all descendant text for elements.
    pub text: String,
}

impl MarkupNode {
    /// The first class name, the one extraction keys on.
    pub fn class(&self) -> Option<&str> {
        self.classes.first().map(String::as_str)
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c == name)
    }

    /// Plain text, or an element marked as readable text.
    pub fn is_readable(&self) -> bool {
        self.kind == NodeKind::Text || self.has_class(WORD_BREAK_CLASS)
    }
}

/// A parsed markup fragment as a flat node list in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    nodes: Vec<MarkupNode>,
}

impl Markup {
    pub fn parse(fragment: &str) -> Self {
        let html = Html::parse_fragment(fragment);
        let root = html.root_element();
        let base_depth = root.ancestors().count() + 1;

        let nodes = root
            .descendants()
            .skip(1)
            .filter_map(|node| {
                let depth = node.ancestors().count().saturating_sub(base_depth);
                match node.value() {
                    Node::Text(text) => Some(MarkupNode {
                        kind: NodeKind::Text,
                        depth,
                        classes: Vec::new(),
                        text: (**text).to_owned(),
                    }),
                    Node::Element(element) => Some(MarkupNode {
                        kind: NodeKind::Element,
                        depth,
                        classes: element
                            .attr("class")
                            .map(|attr| attr.split_whitespace().map(str::to_owned).collect())
                            .unwrap_or_default(),
                        text: ElementRef::wrap(node)
                            .map(|el| el.text().collect())
                            .unwrap_or_default(),
                    }),
                    _ => None,
                }
            })
            .collect();

        Self { nodes }
    }

    pub fn nodes(&self) -> &[MarkupNode] {
        &self.nodes
    }

    /// Top-level nodes only.
    pub fn top_level(&self) -> impl Iterator<Item = &MarkupNode> {
        self.nodes.iter().filter(|n| n.depth == 0)
    }

    /// Text of the top-level readable nodes, joined with single spaces.
    pub fn readable_text(&self) -> String {
        self.top_level()
            .filter(|n| n.is_readable())
            .map(|n| n.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First class name → node text, over every node in document order.
    /// When a class repeats, the first node carrying it wins.
    pub fn class_map(&self) -> HashMap<&str, &str> {
        let mut map = HashMap::new();
        for node in &self.nodes {
            if let Some(class) = node.class() {
                map.entry(class).or_insert(node.text.as_str());
            }
        }
        map
    }
}
