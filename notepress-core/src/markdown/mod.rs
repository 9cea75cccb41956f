//! Markdown tree with block references as first-class nodes.
//!
//! The tree is source preserving: parsing and serializing without any
//! rewrite gives back the input byte for byte. Regions the parser must never
//! touch (code, HTML, math, existing links and images, metadata blocks) are
//! located with pulldown-cmark and kept as [`Node::Verbatim`]; everything in
//! between is prose, split into [`Node::Text`] and [`Node::Reference`].

pub mod references;
pub mod typography;

use notepress_types::NoteId;
use pulldown_cmark::{Event, Options, Parser, Tag};
use std::ops::Range;

pub use references::split_references;
pub use typography::Typography;

/// A node of the note tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Source text that is never rewritten
    Verbatim(String),

    /// Prose, still in markdown source form
    Text(String),

    /// Block reference `((id "anchor"))` as written in the source
    Reference {
        target: String,
        anchor: Option<String>,
        raw: String,
    },

    /// Hyperlink produced by resolving a reference
    Link {
        target: Option<NoteId>,
        url: String,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    /// Link with a single text child; brackets in the label are escaped
    pub fn link(target: Option<NoteId>, url: impl Into<String>, label: &str) -> Self {
        Node::Link {
            target,
            url: url.into(),
            children: vec![Node::Text(escape_link_label(label))],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Link { children, .. } => Some(children),
            _ => None,
        }
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Node::Verbatim(text) | Node::Text(text) => out.push_str(text),
            Node::Reference { raw, .. } => out.push_str(raw),
            Node::Link { url, children, .. } => {
                out.push('[');
                for child in children {
                    child.write_to(out);
                }
                out.push_str("](");
                out.push_str(url);
                out.push(')');
            }
        }
    }
}

/// What a visitor wants done with the node it was shown
#[derive(Debug)]
pub enum Visit {
    /// Keep the node and descend into its children
    Continue,
    /// Swap the node for these (possibly zero) nodes; they are not visited
    Replace(Vec<Node>),
}

pub trait Visitor {
    fn visit(&mut self, node: &mut Node) -> Visit;
}

impl<F> Visitor for F
where
    F: FnMut(&mut Node) -> Visit,
{
    fn visit(&mut self, node: &mut Node) -> Visit {
        self(node)
    }
}

/// Parsed note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    children: Vec<Node>,
}

impl Tree {
    #[cfg(test)]
    pub(crate) fn from_nodes(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Depth-first traversal that may replace nodes in place
    pub fn walk<V: Visitor + ?Sized>(&mut self, visitor: &mut V) {
        walk_nodes(&mut self.children, visitor);
    }

    /// Reference targets in depth-first order, duplicates included
    pub fn references(&self) -> Vec<&str> {
        fn collect<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    Node::Reference { target, .. } => out.push(target),
                    Node::Link { children, .. } => collect(children, out),
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.children, &mut out);
        out
    }

    /// Notes linked from this tree, first appearance order, no duplicates
    pub fn link_targets(&self) -> Vec<NoteId> {
        fn collect(nodes: &[Node], out: &mut Vec<NoteId>) {
            for node in nodes {
                if let Node::Link {
                    target, children, ..
                } = node
                {
                    if let Some(id) = target {
                        if !out.contains(id) {
                            out.push(id.clone());
                        }
                    }
                    collect(children, out);
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.children, &mut out);
        out
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            node.write_to(&mut out);
        }
        out
    }
}

fn walk_nodes<V: Visitor + ?Sized>(nodes: &mut Vec<Node>, visitor: &mut V) {
    let mut out = Vec::with_capacity(nodes.len());
    for mut node in nodes.drain(..) {
        match visitor.visit(&mut node) {
            Visit::Replace(replacement) => out.extend(replacement),
            Visit::Continue => {
                if let Some(children) = node.children_mut() {
                    walk_nodes(children, visitor);
                }
                out.push(node);
            }
        }
    }
    *nodes = out;
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    options.insert(Options::ENABLE_PLUSES_DELIMITED_METADATA_BLOCKS);
    options
}

/// Byte ranges of regions that must survive untouched, ascending and disjoint
fn verbatim_ranges(source: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut cursor = 0;

    for (event, range) in Parser::new_ext(source, parser_options()).into_offset_iter() {
        let protected = matches!(
            event,
            Event::Start(
                Tag::CodeBlock(_)
                    | Tag::HtmlBlock
                    | Tag::Link { .. }
                    | Tag::Image { .. }
                    | Tag::MetadataBlock(_)
            ) | Event::Code(_)
                | Event::Html(_)
                | Event::InlineHtml(_)
                | Event::InlineMath(_)
                | Event::DisplayMath(_)
        );

        // Nested regions are already covered by their parent
        if protected && range.start >= cursor && range.end > range.start {
            cursor = range.end;
            ranges.push(range);
        }
    }

    ranges
}

/// Parse note markdown into a tree; every input parses
pub fn parse(source: &str) -> Tree {
    let mut children = Vec::new();
    let mut offset = 0;

    for range in verbatim_ranges(source) {
        if range.start > offset {
            children.extend(split_references(&source[offset..range.start]));
        }
        children.push(Node::Verbatim(source[range.clone()].to_string()));
        offset = range.end;
    }
    if offset < source.len() {
        children.extend(split_references(&source[offset..]));
    }

    Tree { children }
}

/// Escape characters that would end a link label early
pub fn escape_link_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if matches!(c, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
