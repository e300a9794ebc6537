//! Book metadata from the Jupyter Book `_config.yml`.
//!
//! Parsing and validation are one step that yields a [`ConfigValidation`]:
//! a config is either fully valid (non-empty string `title`, `author` and
//! `logo`) or rejected as a whole.

use jbooknav_contents::ContentsClient;
use jbooknav_shared::{NavError, Result};
use serde::Serialize;
use tracing::{error, info, instrument};

/// Returned by [`extract_book_title`] on any failure.
pub const BOOK_TITLE_SENTINEL: &str = "Error: Unable to retrieve book title from _config.yml";

/// Returned by [`extract_book_author`] on any failure.
pub const BOOK_AUTHOR_SENTINEL: &str = "Error: Unable to retrieve author from _config.yml";

/// Shown when the title is present but blank.
pub const DEFAULT_BOOK_TITLE: &str = "Untitled Jupyter Book";

/// Shown when the author is present but blank.
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// Fields a book config must carry.
const REQUIRED_FIELDS: [&str; 3] = ["title", "author", "logo"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Validated book metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookConfig {
    pub title: String,
    pub author: String,
    pub logo: String,
}

impl BookConfig {
    /// Title, or [`DEFAULT_BOOK_TITLE`] when it is only whitespace.
    pub fn display_title(&self) -> &str {
        non_blank(&self.title).unwrap_or(DEFAULT_BOOK_TITLE)
    }

    /// Author, or [`DEFAULT_AUTHOR`] when it is only whitespace.
    pub fn display_author(&self) -> &str {
        non_blank(&self.author).unwrap_or(DEFAULT_AUTHOR)
    }
}

fn non_blank(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Outcome of validating a parsed config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidation {
    Valid(BookConfig),
    /// Human-readable reason the whole config was rejected.
    Invalid(String),
}

/// Which field an extractor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookField {
    Title,
    Author,
}

impl BookField {
    fn sentinel(self) -> &'static str {
        match self {
            Self::Title => BOOK_TITLE_SENTINEL,
            Self::Author => BOOK_AUTHOR_SENTINEL,
        }
    }

    fn pick(self, config: &BookConfig) -> &str {
        match self {
            Self::Title => config.display_title(),
            Self::Author => config.display_author(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse YAML text and validate its shape.
///
/// Malformed YAML is an error; well-formed YAML of the wrong shape is
/// [`ConfigValidation::Invalid`].
pub fn parse_book_config(yaml: &str) -> Result<ConfigValidation> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)
        .map_err(|e| NavError::parse(format!("invalid YAML: {e}")))?;
    Ok(validate_book_config(&value))
}

/// Check that `value` is a mapping with non-empty string title, author and logo.
pub fn validate_book_config(value: &serde_yaml::Value) -> ConfigValidation {
    if !value.is_mapping() {
        return ConfigValidation::Invalid("config is not a mapping".into());
    }

    let field = |name: &str| {
        value
            .get(name)
            .and_then(serde_yaml::Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|name| field(*name).is_none())
        .collect();

    match (field("title"), field("author"), field("logo")) {
        (Some(title), Some(author), Some(logo)) => {
            ConfigValidation::Valid(BookConfig { title, author, logo })
        }
        _ => ConfigValidation::Invalid(format!(
            "missing or empty fields: {}",
            missing.join(", ")
        )),
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Fetch and validate the config at `config_path`.
pub async fn try_load_book_config(
    client: &ContentsClient,
    config_path: &str,
) -> Result<ConfigValidation> {
    let yaml = client.fetch_text(config_path).await?;
    parse_book_config(&yaml)
}

#[instrument(skip_all, fields(config_path = %config_path, ?field))]
async fn extract_book_field(client: &ContentsClient, config_path: &str, field: BookField) -> String {
    match try_load_book_config(client, config_path).await {
        Ok(ConfigValidation::Valid(config)) => {
            let value = field.pick(&config).to_string();
            info!(?field, %value, "read book config");
            value
        }
        Ok(ConfigValidation::Invalid(reason)) => {
            error!(%reason, "misconfigured Jupyter Book config");
            field.sentinel().to_string()
        }
        Err(e) => {
            error!(error = %e, "error reading or parsing config");
            field.sentinel().to_string()
        }
    }
}

/// Book title from the config, or [`BOOK_TITLE_SENTINEL`]. Never fails.
pub async fn extract_book_title(client: &ContentsClient, config_path: &str) -> String {
    extract_book_field(client, config_path, BookField::Title).await
}

/// Book author from the config, or [`BOOK_AUTHOR_SENTINEL`]. Never fails.
pub async fn extract_book_author(client: &ContentsClient, config_path: &str) -> String {
    extract_book_field(client, config_path, BookField::Author).await
}
