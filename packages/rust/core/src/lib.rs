//! Core conversion pipeline and domain logic for nbcatalog.
//!
//! This crate ties together notebook discovery, slug generation, cell
//! splitting, artifact writing, and catalogue rebuilding into the `convert`
//! and `check` workflows.

pub mod catalogue;
pub mod discovery;
pub mod pipeline;
pub mod slug;
pub mod writer;
