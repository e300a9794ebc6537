//! Shared types, error model, and configuration for jbook-nav.
//!
//! This crate is the foundation depended on by all other jbook-nav crates.
//! It provides:
//! - [`NavError`] — the unified error type
//! - Domain types ([`StructuredDocument`], [`ContentPayload`], [`DirectoryListing`], [`ViewMode`])
//! - Configuration ([`AppConfig`], [`ServerSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtensionConfig, ServerConfig, ServerSettings, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{NavError, Result};
pub use types::{
    Cell, CellSource, ContentPayload, DirectoryEntry, DirectoryListing, StructuredDocument,
    ViewMode,
};
