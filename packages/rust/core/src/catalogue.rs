//! Catalogue (index document) rebuilder.
//!
//! The catalogue is derived entirely from the destination directory listing:
//! deleting it and rebuilding reproduces it byte for byte.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use nbcatalog_shared::{
    ArtifactKind, CatalogError, Result, Slug, SplitMode, artifact_path, relative_artifact_path,
};

use crate::slug::display_name;
use crate::writer::write_if_changed;

/// Heading written at the top of the catalogue.
const CATALOGUE_HEADING: &str = "# Notebook Catalogue";

/// One catalogue row, discovered from a slug directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub slug: Slug,
    /// Mode inferred from the artifacts present.
    pub mode: SplitMode,
    /// Link to the copied notebook, relative to the destination root.
    pub notebook: String,
    /// Link to the script file, if present.
    pub code: Option<String>,
    /// Link to the markdown file, if present.
    pub docs: Option<String>,
}

impl CatalogueEntry {
    /// The row a freshly written artifact set in `mode` produces.
    pub fn expected(slug: Slug, mode: SplitMode) -> Self {
        let [code_kind, docs_kind] = mode.artifact_kinds();
        Self {
            notebook: relative_artifact_path(&slug, ArtifactKind::Notebook),
            code: Some(relative_artifact_path(&slug, code_kind)),
            docs: Some(relative_artifact_path(&slug, docs_kind)),
            mode,
            slug,
        }
    }

    fn render(&self) -> String {
        let mut links = vec![format!("[Notebook]({})", self.notebook)];
        if let Some(code) = &self.code {
            links.push(format!("[Code]({code})"));
        }
        if let Some(docs) = &self.docs {
            links.push(format!("[Docs]({docs})"));
        }
        format!("- **{}** - {}\n", display_name(&self.slug), links.join(" / "))
    }
}

/// Result of a catalogue rebuild.
#[derive(Debug, Clone)]
pub struct Catalogue {
    /// Where the catalogue was written.
    pub path: PathBuf,
    pub entries: Vec<CatalogueEntry>,
    /// Whether the file was created or rewritten.
    pub changed: bool,
}

/// Enumerate slug directories under `dest_root`, sorted by slug.
///
/// A directory counts when it holds `<dir>/<dir>.ipynb`. A missing root is empty.
pub fn scan(dest_root: &Path) -> Result<Vec<CatalogueEntry>> {
    if !dest_root.exists() {
        return Ok(Vec::new());
    }

    let read_dir = std::fs::read_dir(dest_root).map_err(|e| CatalogError::io(dest_root, e))?;
    let mut entries = Vec::new();

    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(|e| CatalogError::io(dest_root, e))?;
        let path = dir_entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            debug!(path = %path.display(), "skipping non UTF-8 directory name");
            continue;
        };

        let slug = Slug::from_normalized(name);
        if !artifact_path(dest_root, &slug, ArtifactKind::Notebook).is_file() {
            debug!(slug = %slug, "directory has no notebook, not catalogued");
            continue;
        }

        entries.push(entry_for(dest_root, slug));
    }

    entries.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(entries)
}

/// Render catalogue text for `entries` (already sorted).
pub fn render(entries: &[CatalogueEntry]) -> String {
    let mut out = format!("{CATALOGUE_HEADING}\n\n");
    for entry in entries {
        out.push_str(&entry.render());
    }
    out
}

/// Rescan `dest_root` and rewrite `dest_root/<index_file>`.
#[instrument(skip_all, fields(dest = %dest_root.display()))]
pub fn rebuild_catalogue(dest_root: &Path, index_file: &str) -> Result<Catalogue> {
    std::fs::create_dir_all(dest_root).map_err(|e| CatalogError::io(dest_root, e))?;

    let entries = scan(dest_root)?;
    let path = dest_root.join(index_file);
    let changed = write_if_changed(&path, render(&entries).as_bytes())?;

    info!(entries = entries.len(), changed, "catalogue rebuilt");

    Ok(Catalogue {
        path,
        entries,
        changed,
    })
}

/// True when the catalogue on disk differs from what a rebuild would write
/// once `pending` entries (notebooks about to be converted) exist.
pub fn is_stale(dest_root: &Path, index_file: &str, pending: &[CatalogueEntry]) -> Result<bool> {
    let mut entries = scan(dest_root)?;
    for entry in pending {
        match entries.iter_mut().find(|e| e.slug == entry.slug) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }
    }
    entries.sort_by(|a, b| a.slug.cmp(&b.slug));

    let expected = render(&entries);
    let path = dest_root.join(index_file);
    Ok(std::fs::read(&path)
        .map(|b| b != expected.as_bytes())
        .unwrap_or(true))
}

fn entry_for(dest_root: &Path, slug: Slug) -> CatalogueEntry {
    let exists = |kind| artifact_path(dest_root, &slug, kind).is_file();

    let full = SplitMode::Full.artifact_kinds();
    let mode = if full.iter().any(|k| exists(*k)) {
        SplitMode::Full
    } else if SplitMode::Legacy.artifact_kinds().iter().any(|k| exists(*k)) {
        SplitMode::Legacy
    } else {
        SplitMode::Full
    };

    let [code_kind, docs_kind] = mode.artifact_kinds();
    let link = |kind| exists(kind).then(|| relative_artifact_path(&slug, kind));

    CatalogueEntry {
        notebook: relative_artifact_path(&slug, ArtifactKind::Notebook),
        code: link(code_kind),
        docs: link(docs_kind),
        mode,
        slug,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
