//! Shared types, error model, and configuration for BookForge.
//!
//! This crate is the foundation depended on by all other BookForge crates.
//! It provides:
//! - [`BookForgeError`] — the unified error type
//! - Domain types ([`ResearchRecord`], [`TableOfContents`], [`Chapter`], [`BookId`])
//! - Configuration ([`AppConfig`], config loading, credential validation)
//! - The filename [`sanitize`] helper

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, OpenAiConfig, SearchConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_api_keys,
};
pub use error::{BookForgeError, Result};
pub use sanitize::sanitize_filename;
pub use types::{
    BookId, BookManifest, CURRENT_SCHEMA_VERSION, Chapter, ResearchRecord, SearchResult,
    TableOfContents,
};
