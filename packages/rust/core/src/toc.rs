//! Table-of-contents tree parsed from the server extension's HTML fragment.
//!
//! The fragment looks like:
//!
//! ```html
//! <div class="jbook-toc" data-toc-dir="/abs/book">
//!   <p id="toc-title">Title</p> <p id="toc-author">Author: Name</p>
//!   <ul>
//!     <p class="caption">...</p>
//!     <button class="toc-button tb-level1" data-file-path="intro.md">Intro</button>
//!     <div><button class="toc-button ...">Section</button><button class="toc-chevron">...</button></div>
//!     <div style="display: none;">...children...</div>
//!     <a class="toc-link tb-level1" href="...">External</a>
//!   </ul>
//! </div>
//! ```
//!
//! Instead of mutating DOM state, toggles and opens operate on [`TocTree`].

use std::sync::LazyLock;

use jbooknav_shared::{NavError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Identifier of an entry, assigned in document order.
pub type NodeId = usize;

// ---------------------------------------------------------------------------
// Selectors and patterns (compiled once)
// ---------------------------------------------------------------------------

static BOOK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".jbook-toc").expect("book selector"));

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#toc-title").expect("title selector"));

static AUTHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#toc-author").expect("author selector"));

/// Matches the `tb-level{n}` nesting class.
static LEVEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tb-level(\d+)$").expect("level regex"));

const AUTHOR_PREFIX: &str = "Author:";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the server sent back.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TocFragment {
    /// A Jupyter Book was found at or above the browser's directory.
    Book(TocTree),
    /// No `_toc.yml`/`_config.yml`; the server's explanation, flattened.
    NotABook { message: String },
}

/// The book's navigable table of contents.
#[derive(Debug, Clone, Serialize)]
pub struct TocTree {
    /// Book root as the server sees it (`data-toc-dir`).
    pub book_dir: String,
    /// Header title rendered by the server.
    pub title: Option<String>,
    /// Header author, without the `Author:` prefix.
    pub author: Option<String>,
    /// Top-level nodes in document order.
    pub nodes: Vec<TocNode>,
}

/// One node of the tree.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TocNode {
    /// Part caption.
    Caption { text: String },
    /// A file in the book, possibly with a subsection.
    Entry(TocEntry),
    /// External link.
    Link { title: String, url: String, level: u32 },
}

/// A file entry.
#[derive(Debug, Clone, Serialize)]
pub struct TocEntry {
    pub id: NodeId,
    pub title: String,
    /// Book-relative path (`data-file-path`); `None` if the server omitted it.
    pub file_path: Option<String>,
    pub level: u32,
    pub children: Vec<TocNode>,
    /// Whether the subsection is shown. Subsections start collapsed.
    pub expanded: bool,
}

/// Chevron glyph next to an entry with a subsection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Chevron {
    Down,
    Up,
}

impl Chevron {
    /// Font Awesome icon class.
    pub fn icon_class(&self) -> &'static str {
        match self {
            Self::Down => "fa-chevron-down",
            Self::Up => "fa-chevron-up",
        }
    }
}

impl TocEntry {
    /// Whether this entry has a collapsible subsection.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Current glyph, or `None` for leaves.
    pub fn chevron(&self) -> Option<Chevron> {
        if !self.has_children() {
            None
        } else if self.expanded {
            Some(Chevron::Up)
        } else {
            Some(Chevron::Down)
        }
    }
}

// ---------------------------------------------------------------------------
// Tree queries and toggling
// ---------------------------------------------------------------------------

impl TocTree {
    /// Find an entry by id.
    pub fn find(&self, id: NodeId) -> Option<&TocEntry> {
        find_in(&self.nodes, id)
    }

    /// Find an entry by id, mutably.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut TocEntry> {
        find_in_mut(&mut self.nodes, id)
    }

    /// All entries in document order, regardless of expansion.
    pub fn entries(&self) -> Vec<&TocEntry> {
        let mut out = Vec::new();
        collect_entries(&self.nodes, false, &mut out);
        out
    }

    /// Entries whose ancestors are all expanded.
    pub fn visible_entries(&self) -> Vec<&TocEntry> {
        let mut out = Vec::new();
        collect_entries(&self.nodes, true, &mut out);
        out
    }

    /// Flip an entry's subsection and return the new glyph.
    pub fn toggle(&mut self, id: NodeId) -> Result<Chevron> {
        let entry = self
            .find_mut(id)
            .ok_or_else(|| NavError::missing(format!("no TOC entry with id {id}")))?;

        if !entry.has_children() {
            return Err(NavError::missing(format!(
                "TOC entry {id} ({}) has no subsection to toggle",
                entry.title
            )));
        }

        entry.expanded = !entry.expanded;
        Ok(if entry.expanded {
            Chevron::Up
        } else {
            Chevron::Down
        })
    }
}

fn find_in(nodes: &[TocNode], id: NodeId) -> Option<&TocEntry> {
    nodes.iter().find_map(|node| match node {
        TocNode::Entry(entry) if entry.id == id => Some(entry),
        TocNode::Entry(entry) => find_in(&entry.children, id),
        _ => None,
    })
}

fn find_in_mut(nodes: &mut [TocNode], id: NodeId) -> Option<&mut TocEntry> {
    for node in nodes.iter_mut() {
        if let TocNode::Entry(entry) = node {
            if entry.id == id {
                return Some(entry);
            }
            if let Some(found) = find_in_mut(&mut entry.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn collect_entries<'a>(nodes: &'a [TocNode], visible_only: bool, out: &mut Vec<&'a TocEntry>) {
    for node in nodes {
        if let TocNode::Entry(entry) = node {
            out.push(entry);
            if !visible_only || entry.expanded {
                collect_entries(&entry.children, visible_only, out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the `data` field of a `get-toc` response.
#[instrument(skip_all, fields(len = html.len()))]
pub fn parse_toc_html(html: &str) -> Result<TocFragment> {
    let doc = Html::parse_fragment(html);

    let Some(container) = doc.select(&BOOK_SEL).next() else {
        let message = collapse_text(doc.root_element());
        debug!(%message, "fragment does not describe a book");
        return Ok(TocFragment::NotABook { message });
    };

    let book_dir = container
        .value()
        .attr("data-toc-dir")
        .ok_or_else(|| NavError::parse("jbook-toc container has no data-toc-dir attribute"))?
        .to_string();

    let title = container
        .select(&TITLE_SEL)
        .next()
        .map(collapse_text)
        .filter(|t| !t.is_empty());

    let author = container
        .select(&AUTHOR_SEL)
        .next()
        .map(collapse_text)
        .map(|a| a.strip_prefix(AUTHOR_PREFIX).unwrap_or(&a).trim().to_string())
        .filter(|a| !a.is_empty());

    let mut next_id: NodeId = 0;
    let mut nodes = Vec::new();
    walk(container, &mut next_id, &mut nodes);

    debug!(%book_dir, entries = next_id, "parsed table of contents");

    Ok(TocFragment::Book(TocTree {
        book_dir,
        title,
        author,
        nodes,
    }))
}

/// Convert the element children of `parent` into nodes.
///
/// A `div` holding a `toc-chevron` is a section header; the element right
/// after it holds the section's children. Unrecognised containers are
/// transparent.
fn walk(parent: ElementRef<'_>, next_id: &mut NodeId, out: &mut Vec<TocNode>) {
    let children: Vec<ElementRef<'_>> = parent.children().filter_map(ElementRef::wrap).collect();

    let mut i = 0;
    while i < children.len() {
        let el = children[i];
        i += 1;

        if matches!(el.value().id(), Some("toc-title" | "toc-author")) {
            continue;
        }

        if has_class(el, "caption") {
            out.push(TocNode::Caption {
                text: collapse_text(el),
            });
        } else if has_class(el, "toc-button") {
            out.push(TocNode::Entry(entry_from_button(el, next_id)));
        } else if has_class(el, "toc-link") {
            out.push(TocNode::Link {
                title: collapse_text(el),
                url: el.value().attr("href").unwrap_or_default().to_string(),
                level: level_of(el),
            });
        } else if el.value().name() == "div" && child_with_class(el, "toc-chevron").is_some() {
            let Some(button) = child_with_class(el, "toc-button") else {
                warn!("section header without a toc-button, skipping");
                continue;
            };
            let mut entry = entry_from_button(button, next_id);

            match children.get(i) {
                Some(list) if list.value().name() == "div" => {
                    walk(*list, next_id, &mut entry.children);
                    i += 1;
                }
                _ => warn!(title = %entry.title, "section header without a subsection list"),
            }

            out.push(TocNode::Entry(entry));
        } else {
            walk(el, next_id, out);
        }
    }
}

fn entry_from_button(button: ElementRef<'_>, next_id: &mut NodeId) -> TocEntry {
    let id = *next_id;
    *next_id += 1;

    let file_path = button.value().attr("data-file-path").map(str::to_string);
    if file_path.is_none() {
        warn!(id, "toc-button without data-file-path");
    }

    TocEntry {
        id,
        title: collapse_text(button),
        file_path,
        level: level_of(button),
        children: Vec::new(),
        expanded: false,
    }
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn child_with_class<'a>(el: ElementRef<'a>, class: &str) -> Option<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|c| has_class(*c, class))
}

/// Nesting level from `tb-level{n}`, 1 if absent.
fn level_of(el: ElementRef<'_>) -> u32 {
    el.value()
        .classes()
        .find_map(|c| LEVEL_RE.captures(c).and_then(|caps| caps[1].parse().ok()))
        .unwrap_or(1)
}

/// Element text with runs of whitespace collapsed to one space.
fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_tree() -> TocTree {
        let html = std::fs::read_to_string("../../../fixtures/html/toc.html")
            .expect("read fixture");
        match parse_toc_html(&html).expect("parse") {
            TocFragment::Book(tree) => tree,
            TocFragment::NotABook { message } => panic!("expected a book, got: {message}"),
        }
    }

    #[test]
    fn parses_header() {
        let tree = fixture_tree();
        assert_eq!(tree.book_dir, "/home/jovyan/work/demo-book");
        assert_eq!(tree.title.as_deref(), Some("Demo Book"));
        assert_eq!(tree.author.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn parses_structure_in_order() {
        let tree = fixture_tree();

        let kinds: Vec<&str> = tree
            .nodes
            .iter()
            .map(|n| match n {
                TocNode::Caption { .. } => "caption",
                TocNode::Entry(_) => "entry",
                TocNode::Link { .. } => "link",
            })
            .collect();
        assert_eq!(
            kinds,
            ["caption", "entry", "entry", "caption", "entry", "link"]
        );

        let TocNode::Caption { text } = &tree.nodes[0] else {
            panic!("expected caption");
        };
        assert_eq!(text, "Getting Started");

        let TocNode::Link { title, url, level } = &tree.nodes[5] else {
            panic!("expected link");
        };
        assert_eq!(title, "Jupyter Book docs");
        assert_eq!(url, "https://jupyterbook.org");
        assert_eq!(*level, 1);
    }

    #[test]
    fn sections_nest_children() {
        let tree = fixture_tree();

        let entries = tree.entries();
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Introduction", "The Basics", "Setup", "First Steps", "API"]
        );
        let ids: Vec<NodeId> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, [0, 1, 2, 3, 4]);

        let basics = tree.find(1).expect("basics");
        assert_eq!(basics.file_path.as_deref(), Some("chapters/basics.ipynb"));
        assert_eq!(basics.children.len(), 2);
        assert_eq!(basics.chevron(), Some(Chevron::Down));

        let setup = tree.find(2).expect("setup");
        assert_eq!(setup.level, 2);
        assert_eq!(setup.chevron(), None);
    }

    #[test]
    fn toggle_reveals_and_hides_subsection() {
        let mut tree = fixture_tree();
        assert_eq!(tree.visible_entries().len(), 3);

        assert_eq!(tree.toggle(1).unwrap(), Chevron::Up);
        assert_eq!(tree.visible_entries().len(), 5);
        assert_eq!(Chevron::Up.icon_class(), "fa-chevron-up");

        assert_eq!(tree.toggle(1).unwrap(), Chevron::Down);
        assert_eq!(tree.visible_entries().len(), 3);
    }

    #[test]
    fn toggle_rejects_leaves_and_unknown_ids() {
        let mut tree = fixture_tree();
        assert!(matches!(tree.toggle(0), Err(NavError::MissingContext(_))));
        assert!(matches!(tree.toggle(99), Err(NavError::MissingContext(_))));
    }

    #[test]
    fn not_a_book_fragment() {
        let html = std::fs::read_to_string("../../../fixtures/html/not-a-book.html")
            .expect("read fixture");
        let TocFragment::NotABook { message } = parse_toc_html(&html).unwrap() else {
            panic!("expected NotABook");
        };
        assert!(message.starts_with("Not a Jupyter-Book"));
        assert!(message.contains("/home/jovyan/work"));
    }

    #[test]
    fn missing_toc_dir_is_parse_error() {
        let err = parse_toc_html(r#"<div class="jbook-toc"><ul></ul></div>"#).unwrap_err();
        assert!(matches!(err, NavError::Parse { .. }));
    }

    #[test]
    fn button_without_file_path_is_kept() {
        let html = r#"<div class="jbook-toc" data-toc-dir="book"><button class="toc-button">Orphan</button></div>"#;
        let TocFragment::Book(tree) = parse_toc_html(html).unwrap() else {
            panic!("expected book");
        };
        let entry = tree.find(0).expect("entry");
        assert_eq!(entry.title, "Orphan");
        assert!(entry.file_path.is_none());
        assert_eq!(entry.level, 1);
    }
}
