//! Notebook loading and cell splitting.
//!
//! Reads nbformat 4 `.ipynb` JSON into an ordered, read-only list of
//! [`Cell`]s, then partitions those cells into output streams via [`split`].

mod split;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use nbcatalog_shared::{CatalogError, Result};

pub use split::{SplitOutput, split};

/// Oldest nbformat major version with a top-level `cells` array.
const MIN_NBFORMAT: u32 = 4;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single notebook cell, tagged by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Code(String),
    Markdown(String),
}

impl Cell {
    /// Cell source text with trailing line breaks removed.
    pub fn body(&self) -> &str {
        match self {
            Self::Code(body) | Self::Markdown(body) => body,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }
}

/// A loaded notebook. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Notebook {
    path: PathBuf,
    cells: Vec<Cell>,
}

impl Notebook {
    /// Build a notebook from already-parsed cells.
    pub fn from_cells(path: impl Into<PathBuf>, cells: Vec<Cell>) -> Self {
        Self {
            path: path.into(),
            cells,
        }
    }

    /// Cells in document order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// File stem of the source path, or an empty string.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// nbformat JSON shape
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawNotebook {
    #[serde(default)]
    nbformat: Option<u32>,
    cells: Vec<RawCell>,
}

#[derive(Deserialize)]
struct RawCell {
    cell_type: String,
    #[serde(default)]
    source: RawSource,
}

/// `source` is either one string or a list of line strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for RawSource {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl RawSource {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Lines(lines) => lines.concat(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Read and parse the notebook at `path`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load(path: &Path) -> Result<Notebook> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
    parse(path, &content)
}

/// Parse notebook JSON. `path` is recorded on the notebook and used in errors.
pub fn parse(path: &Path, json: &str) -> Result<Notebook> {
    let raw: RawNotebook = serde_json::from_str(json)
        .map_err(|e| CatalogError::parse(path, format!("invalid notebook JSON: {e}")))?;

    if let Some(version) = raw.nbformat {
        if version < MIN_NBFORMAT {
            return Err(CatalogError::parse(
                path,
                format!("unsupported nbformat {version} (need {MIN_NBFORMAT} or later)"),
            ));
        }
    }

    let mut cells = Vec::with_capacity(raw.cells.len());
    for (index, cell) in raw.cells.into_iter().enumerate() {
        let body = trim_trailing_newlines(cell.source.into_text());
        match cell.cell_type.as_str() {
            "code" => cells.push(Cell::Code(body)),
            "markdown" => cells.push(Cell::Markdown(body)),
            other => {
                debug!(index, cell_type = other, "dropping non code/markdown cell");
            }
        }
    }

    debug!(cells = cells.len(), "notebook parsed");

    Ok(Notebook {
        path: path.to_path_buf(),
        cells,
    })
}

fn trim_trailing_newlines(mut text: String) -> String {
    let trimmed_len = text.trim_end_matches(['\n', '\r']).len();
    text.truncate(trimmed_len);
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/notebooks")
            .join(name)
    }

    #[test]
    fn load_fixture_keeps_order_and_drops_raw_cells() {
        let nb = load(&fixture_path("intro.ipynb")).unwrap();
        assert_eq!(
            nb.cells(),
            &[
                Cell::Markdown("# Title".into()),
                Cell::Code("x = 1".into()),
                Cell::Markdown("Explanation".into()),
                Cell::Code("y = 2".into()),
            ]
        );
        assert_eq!(nb.stem(), "intro");
    }

    #[test]
    fn line_array_sources_are_concatenated() {
        let nb = load(&fixture_path("multiline.ipynb")).unwrap();
        assert_eq!(nb.cells()[0].body(), "## Setup\n\nInstall the dependencies first.");
        assert_eq!(nb.cells()[1].body(), "import os\n\nprint(os.getcwd())");
        assert!(nb.cells()[1].is_code());
    }

    #[test]
    fn missing_source_is_empty_body() {
        let json = r#"{"nbformat": 4, "cells": [{"cell_type": "code"}]}"#;
        let nb = parse(Path::new("a.ipynb"), json).unwrap();
        assert_eq!(nb.cells(), &[Cell::Code(String::new())]);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse(Path::new("broken.ipynb"), "{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
        assert!(err.to_string().contains("broken.ipynb"));
    }

    #[test]
    fn missing_cells_is_parse_error() {
        let err = parse(Path::new("x.ipynb"), r#"{"nbformat": 4}"#).unwrap_err();
        assert!(err.to_string().contains("cells"));
    }

    #[test]
    fn old_nbformat_is_rejected() {
        let json = r#"{"nbformat": 3, "cells": []}"#;
        let err = parse(Path::new("old.ipynb"), json).unwrap_err();
        assert!(err.to_string().contains("unsupported nbformat 3"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load(&tmp.path().join("nope.ipynb")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn crlf_trailing_newlines_are_trimmed() {
        let json = r#"{"cells": [{"cell_type": "markdown", "source": "hi\r\n\r\n"}]}"#;
        let nb = parse(Path::new("w.ipynb"), json).unwrap();
        assert_eq!(nb.cells()[0].body(), "hi");
    }
}
