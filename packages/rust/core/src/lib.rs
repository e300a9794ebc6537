//! Path reconciliation, metadata extraction and TOC navigation for jbook-nav.
//!
//! This crate ties the contents client to the book model:
//! - [`paths`] — reconcile the book root with the file browser's directory
//! - [`title`] — classify documents and extract their `# ` title
//! - [`book`] — validate `_config.yml` and read the book title/author
//! - [`toc`] — the TOC tree parsed from the server extension's HTML
//! - [`navigator`] — toggle and open handlers for the host UI

pub mod book;
pub mod navigator;
pub mod paths;
pub mod title;
pub mod toc;

pub use book::{BookConfig, ConfigValidation, extract_book_author, extract_book_title};
pub use navigator::{
    DocumentOpener, EntryMetadata, FileBrowser, FixedBrowser, Navigator, OpenOutcome, OpenTarget,
    RequestGeneration, RequestToken,
};
pub use paths::reconcile;
pub use title::{FileKind, extract_title};
pub use toc::{Chevron, NodeId, TocEntry, TocFragment, TocNode, TocTree, parse_toc_html};
