//! Shared types, error model, and configuration for nbcatalog.
//!
//! This crate is the foundation depended on by all other nbcatalog crates.
//! It provides:
//! - [`CatalogError`] — the unified error type
//! - Domain types ([`Slug`], [`SplitMode`], [`ArtifactSet`], [`ArtifactFile`])
//! - Configuration ([`AppConfig`], [`ConvertConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConvertConfig, ConvertSection, PathsConfig, SlugConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_config,
};
pub use error::{CatalogError, Result};
pub use types::{
    ArtifactFile, ArtifactKind, ArtifactSet, Slug, SplitMode, artifact_path,
    relative_artifact_path, sha256_hex,
};
