//! Shared types, error model, and configuration for dailyvocab.
//!
//! This crate is the foundation depended on by all other dailyvocab crates.
//! It provides:
//! - [`VocabError`] — the unified error type
//! - Domain types ([`VocabularyItem`], [`StoreRow`], the canonical headers)
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LanguageConfig, OpenRouterConfig, RunConfig, RunSection, StoreConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, VocabError};
pub use types::{
    Batch, DATE_FORMAT, STORE_HEADERS, StoreRow, VocabularyItem, WORD_COLUMN, canonical_headers,
};
