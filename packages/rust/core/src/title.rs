//! Document classification and title extraction.
//!
//! A title is the text after a top-level `# ` heading:
//! - notebooks (`.ipynb`): first line of the first markdown cell only
//! - Markdown (`.md`): the first line anywhere in the file that starts with `# `
//!
//! Any other extension has no title.

use std::path::Path;

use jbooknav_contents::ContentsClient;
use jbooknav_shared::{ContentPayload, NavError, Result, StructuredDocument};
use tracing::{debug, error, info, instrument};

/// Returned by [`extract_title`] whenever no title could be produced.
pub const TITLE_SENTINEL: &str = "Error: Unable to parse title header from notebook or markdown";

/// Top-level heading marker.
const HEADING_PREFIX: &str = "# ";

/// File kind, decided by extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Notebook,
    Markdown,
    Other,
}

impl FileKind {
    /// Classify a path by its extension (case-sensitive).
    pub fn from_path(path: &str) -> Self {
        match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some("ipynb") => Self::Notebook,
            Some("md") => Self::Markdown,
            _ => Self::Other,
        }
    }
}

/// Heading text of a single line, if it is a top-level heading.
fn heading(line: &str) -> Option<String> {
    line.strip_prefix(HEADING_PREFIX)
        .map(|rest| rest.trim_end().to_string())
}

/// Title of a notebook: the first markdown cell must open with `# `.
pub fn notebook_title(doc: &StructuredDocument) -> Option<String> {
    let cell = doc.cells.iter().find(|cell| cell.is_markdown())?;
    let source = cell.source.text();
    heading(source.split('\n').next().unwrap_or_default())
}

/// Title of a Markdown document: first `# ` line wins.
pub fn markdown_title(text: &str) -> Option<String> {
    text.lines().find_map(heading)
}

/// Fetch `path` and extract its title.
///
/// `Ok(None)` means the document was read but carries no title, or the
/// extension is not one we classify.
pub async fn try_extract_title(client: &ContentsClient, path: &str) -> Result<Option<String>> {
    match FileKind::from_path(path) {
        FileKind::Notebook => match client.fetch_content(path).await? {
            ContentPayload::Notebook(doc) => Ok(notebook_title(&doc)),
            other => Err(NavError::validation(format!(
                "{path}: expected a notebook with a cells array, got {}",
                other.kind()
            ))),
        },
        FileKind::Markdown => match client.fetch_content(path).await? {
            ContentPayload::Text(text) => Ok(markdown_title(&text)),
            other => Err(NavError::validation(format!(
                "{path}: expected Markdown text, got {}",
                other.kind()
            ))),
        },
        FileKind::Other => Ok(None),
    }
}

/// Fetch `path` and extract its title, falling back to [`TITLE_SENTINEL`].
///
/// Never fails: errors are logged.
#[instrument(skip_all, fields(path = %path))]
pub async fn extract_title(client: &ContentsClient, path: &str) -> String {
    match try_extract_title(client, path).await {
        Ok(Some(title)) => {
            info!(%title, "extracted document title");
            title
        }
        Ok(None) => {
            debug!(kind = ?FileKind::from_path(path), "no title heading found");
            TITLE_SENTINEL.to_string()
        }
        Err(e) => {
            error!(error = %e, "error reading or parsing document");
            TITLE_SENTINEL.to_string()
        }
    }
}
