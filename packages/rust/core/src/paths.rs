//! Path reconciliation between the book root and the file browser.
//!
//! The server extension reports the book root as it sees it on disk
//! (usually absolute), while the contents API wants paths relative to the
//! server root, which is what the file browser shows. Reconciliation finds
//! the first browser segment that also occurs in the book root and keeps
//! the book root from that segment on.
//!
//! Matching is purely lexical. When a directory name occurs more than once
//! in the book root (`/srv/book/notes/book`), the first occurrence wins,
//! which can pick the wrong depth.

use std::path::Path;

use jbooknav_shared::{NavError, Result, ViewMode};

/// Path separator used by the contents API and the server extension.
const SEPARATOR: char = '/';

/// Reconcile `book_root` against `browser_path`.
///
/// Browser segments are tried in order; the first one found anywhere in
/// the book root pivots at its lowest index there. Empty segments (leading
/// `/`, doubled separators, the server root `""`) never match.
///
/// Fails with [`NavError::Resolution`] when no segment is shared.
pub fn reconcile(book_root: &str, browser_path: &str) -> Result<String> {
    let root_segments: Vec<&str> = book_root.split(SEPARATOR).collect();

    let pivot = browser_path
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .find_map(|segment| root_segments.iter().position(|s| s == &segment));

    match pivot {
        Some(index) => Ok(root_segments[index..].join("/")),
        None => Err(NavError::Resolution {
            book_root: book_root.to_string(),
            browser_path: browser_path.to_string(),
        }),
    }
}

/// Join a reconciled book root with a book-relative file path.
pub fn join_target(resolved_root: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        resolved_root.trim_end_matches(SEPARATOR),
        relative.trim_start_matches(SEPARATOR)
    )
}

/// Markdown files open rendered; everything else in the default view.
pub fn view_mode_for(file_path: &str) -> ViewMode {
    let is_markdown = Path::new(file_path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));

    if is_markdown {
        ViewMode::MarkdownPreview
    } else {
        ViewMode::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pivots_on_shared_segment() {
        assert_eq!(
            reconcile("book/chapters/intro", "site/book").unwrap(),
            "book/chapters/intro"
        );
    }

    #[test]
    fn absolute_book_root_is_trimmed_to_browser_view() {
        assert_eq!(
            reconcile("/home/jovyan/work/demo-book", "work/demo-book").unwrap(),
            "work/demo-book"
        );
    }

    #[test]
    fn no_shared_segment_fails() {
        let err = reconcile("book/x", "other/y").unwrap_err();
        assert!(matches!(err, NavError::Resolution { .. }));
    }

    #[test]
    fn server_root_browser_path_fails() {
        assert!(reconcile("/home/jovyan/book", "").is_err());
    }

    #[test]
    fn first_browser_segment_wins() {
        // "b" comes first in the browser path even though "a" is earlier in the root.
        assert_eq!(reconcile("x/a/b/c", "b/a").unwrap(), "b/c");
    }

    #[test]
    fn repeated_root_segment_uses_lowest_index() {
        assert_eq!(
            reconcile("srv/book/notes/book/ch1", "book").unwrap(),
            "book/notes/book/ch1"
        );
    }

    #[test]
    fn join_target_handles_slashes() {
        assert_eq!(join_target("work/book", "intro.md"), "work/book/intro.md");
        assert_eq!(join_target("work/book/", "/intro.md"), "work/book/intro.md");
    }

    #[test]
    fn markdown_opens_in_preview() {
        assert_eq!(view_mode_for("chapters/setup.md"), ViewMode::MarkdownPreview);
        assert_eq!(view_mode_for("README.MD"), ViewMode::MarkdownPreview);
        assert_eq!(view_mode_for("chapters/basics.ipynb"), ViewMode::Default);
        assert_eq!(view_mode_for("notes.md.bak"), ViewMode::Default);
    }
}
