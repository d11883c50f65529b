//! Shared types, error model, and configuration for Postforge.
//!
//! This crate is the foundation depended on by all other Postforge crates.
//! It provides:
//! - [`PostforgeError`] — the unified error type
//! - Domain types ([`Article`], [`Candidate`], [`Source`], [`slugify`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, OpenRouterConfig, SearchConfig, SiteConfig, StorageConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, read_env_credential,
};
pub use error::{PostforgeError, Result};
pub use types::{Article, Candidate, ENHANCED_MARKER, NewArticle, Source, slugify};
