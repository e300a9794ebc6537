//! Core domain types shared by the contents client and the navigator.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// StructuredDocument
// ---------------------------------------------------------------------------

/// A notebook document: only the ordered cells are relevant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    /// Cells in document order.
    pub cells: Vec<Cell>,
}

/// A single notebook cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell kind: `markdown`, `code`, `raw`, ...
    #[serde(rename = "cell_type", default)]
    pub kind: String,
    /// Raw cell text.
    #[serde(default)]
    pub source: CellSource,
}

impl Cell {
    /// Whether this is a markdown cell.
    pub fn is_markdown(&self) -> bool {
        self.kind == "markdown"
    }
}

/// Cell source as served by the contents API (one string) or as stored on
/// disk by nbformat (list of lines, each keeping its newline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl CellSource {
    /// The full source text.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Lines(lines) => Cow::Owned(lines.concat()),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentPayload
// ---------------------------------------------------------------------------

/// The `content` field of a contents-API file model, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPayload {
    /// An object with an array-valued `cells` field.
    Notebook(StructuredDocument),
    /// Plain text (Markdown, YAML, ...).
    Text(String),
    /// Anything else: null, base64 blobs wrapped in objects, directory arrays.
    Other(Value),
}

impl ContentPayload {
    /// Classify a raw JSON value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(ref map) if map.get("cells").is_some_and(Value::is_array) => {
                match serde_json::from_value::<StructuredDocument>(value.clone()) {
                    Ok(doc) => Self::Notebook(doc),
                    Err(e) => {
                        tracing::debug!(error = %e, "cells array present but not decodable");
                        Self::Other(value)
                    }
                }
            }
            other => Self::Other(other),
        }
    }

    /// Short name of the payload kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Notebook(_) => "notebook",
            Self::Text(_) => "text",
            Self::Other(_) => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// DirectoryListing
// ---------------------------------------------------------------------------

/// A contents-API model fetched with `content=1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// Base name of the directory.
    #[serde(default)]
    pub name: String,
    /// Server-relative path.
    #[serde(default)]
    pub path: String,
    /// `directory`, `file` or `notebook`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Last modification timestamp as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Child models for directories; file content otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

/// One child of a [`DirectoryListing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DirectoryListing {
    /// Child entries; empty for files or malformed listings.
    pub fn entries(&self) -> Vec<DirectoryEntry> {
        match &self.content {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ViewMode
// ---------------------------------------------------------------------------

/// How the host should open a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    /// The host's default widget for the file type.
    Default,
    /// Rendered Markdown.
    MarkdownPreview,
}

impl ViewMode {
    /// The host widget name, if not the default.
    pub fn widget_name(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::MarkdownPreview => Some("Markdown Preview"),
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.widget_name().unwrap_or("default"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_content_is_text() {
        let payload = ContentPayload::from_value(json!("# Title\nbody"));
        assert_eq!(payload, ContentPayload::Text("# Title\nbody".into()));
    }

    #[test]
    fn object_with_cells_is_notebook() {
        let payload = ContentPayload::from_value(json!({
            "cells": [
                {"cell_type": "code", "source": "print(1)"},
                {"cell_type": "markdown", "source": ["# Chapter\n", "text"]}
            ],
            "nbformat": 4
        }));

        let ContentPayload::Notebook(doc) = payload else {
            panic!("expected notebook, got {payload:?}");
        };
        assert_eq!(doc.cells.len(), 2);
        assert!(!doc.cells[0].is_markdown());
        assert!(doc.cells[1].is_markdown());
        assert_eq!(doc.cells[1].source.text(), "# Chapter\ntext");
    }

    #[test]
    fn cells_not_an_array_is_other() {
        let payload = ContentPayload::from_value(json!({"cells": "nope"}));
        assert_eq!(payload.kind(), "other");

        let payload = ContentPayload::from_value(Value::Null);
        assert_eq!(payload.kind(), "other");
    }

    #[test]
    fn directory_entries_skip_malformed_children() {
        let listing: DirectoryListing = serde_json::from_value(json!({
            "name": "book",
            "path": "work/book",
            "type": "directory",
            "content": [
                {"name": "intro.md", "path": "work/book/intro.md", "type": "file"},
                {"bogus": true}
            ]
        }))
        .expect("listing");

        let entries = listing.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "intro.md");
    }

    #[test]
    fn view_mode_widget_names() {
        assert_eq!(ViewMode::MarkdownPreview.to_string(), "Markdown Preview");
        assert_eq!(ViewMode::Default.widget_name(), None);
    }
}
