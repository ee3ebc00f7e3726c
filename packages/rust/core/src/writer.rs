//! Artifact writer.
//!
//! Lays out one slug directory per notebook:
//! ```text
//! <dest_root>/<slug>/
//! ├── <slug>.ipynb           (copy of the source notebook)
//! ├── <slug>-py-only.py      (full split: code cells)
//! ├── <slug>-md-only.md      (full split: markdown cells)
//! ├── <slug>.py              (legacy: interleaved script)
//! └── <slug>.md              (legacy: markdown companion)
//! ```
//! Only one mode's files exist at a time.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use nbcatalog_notebook::SplitOutput;
use nbcatalog_shared::{
    ArtifactFile, ArtifactKind, ArtifactSet, CatalogError, Result, Slug, artifact_path,
    sha256_hex,
};

/// Rendering switches for artifact contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Prefix scripts with a "generated" notice and markdown with a link to the script.
    pub provenance_header: bool,
}

/// Expected bytes for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    pub kind: ArtifactKind,
    pub contents: Vec<u8>,
}

/// Render the full artifact set for `slug` without touching the filesystem.
///
/// The notebook copy comes first, followed by the script and markdown files.
pub fn render_artifacts(
    slug: &Slug,
    notebook_bytes: &[u8],
    output: &SplitOutput,
    opts: WriteOptions,
) -> Vec<RenderedArtifact> {
    let [script_kind, markdown_kind] = output.mode().artifact_kinds();

    let mut script = String::new();
    let mut markdown = String::new();
    if opts.provenance_header {
        script.push_str(&format!(
            "# Generated from {}.\n\
             # Do not edit directly; edit the notebook instead and re-run conversion.\n\n",
            nbcatalog_shared::relative_artifact_path(slug, ArtifactKind::Notebook)
        ));
        markdown.push_str(&format!(
            "[View paired Python script]({})\n\n",
            script_kind.file_name(slug)
        ));
    }
    script.push_str(output.script());
    markdown.push_str(output.markdown());

    vec![
        RenderedArtifact {
            kind: ArtifactKind::Notebook,
            contents: notebook_bytes.to_vec(),
        },
        RenderedArtifact {
            kind: script_kind,
            contents: script.into_bytes(),
        },
        RenderedArtifact {
            kind: markdown_kind,
            contents: markdown.into_bytes(),
        },
    ]
}

/// Copy the notebook at `source` and write its split outputs under `dest_root/<slug>/`.
///
/// Files whose bytes already match are left untouched. Files belonging to the
/// other split mode are removed.
#[instrument(skip_all, fields(slug = %slug, mode = %output.mode()))]
pub fn write_artifacts(
    dest_root: &Path,
    slug: &Slug,
    source: &Path,
    output: &SplitOutput,
    opts: WriteOptions,
) -> Result<ArtifactSet> {
    let notebook_bytes = std::fs::read(source).map_err(|e| CatalogError::io(source, e))?;

    let dir = dest_root.join(slug.as_str());
    std::fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;

    let rendered = render_artifacts(slug, &notebook_bytes, output, opts);
    let mut files = Vec::with_capacity(rendered.len());

    for artifact in &rendered {
        let path = artifact_path(dest_root, slug, artifact.kind);
        let changed = write_if_changed(&path, &artifact.contents)?;

        files.push(ArtifactFile {
            kind: artifact.kind,
            path,
            sha256: sha256_hex(&artifact.contents),
            size_bytes: artifact.contents.len(),
            changed,
        });
    }

    let removed = remove_other_mode(dest_root, slug, output)?;

    Ok(ArtifactSet {
        slug: slug.clone(),
        dir,
        mode: output.mode(),
        files,
        removed,
    })
}

/// List files under `dest_root/<slug>/` that differ from `rendered`, are
/// missing, or belong to the other split mode.
pub fn stale_artifacts(
    dest_root: &Path,
    slug: &Slug,
    rendered: &[RenderedArtifact],
    output: &SplitOutput,
) -> Vec<PathBuf> {
    let mut stale = Vec::new();

    for artifact in rendered {
        let path = artifact_path(dest_root, slug, artifact.kind);
        let matches = std::fs::read(&path)
            .map(|existing| existing == artifact.contents)
            .unwrap_or(false);
        if !matches {
            stale.push(path);
        }
    }

    for kind in output.mode().other().artifact_kinds() {
        let path = artifact_path(dest_root, slug, kind);
        if path.exists() {
            stale.push(path);
        }
    }

    stale
}

/// Atomically write `contents` to `path` unless the file already holds them.
///
/// Returns whether the file was (re)written.
pub(crate) fn write_if_changed(path: &Path, contents: &[u8]) -> Result<bool> {
    if let Ok(existing) = std::fs::read(path) {
        if existing == contents {
            debug!(path = %path.display(), "unchanged");
            return Ok(false);
        }
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CatalogError::validation(format!("bad artifact path {}", path.display())))?;
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    // Write to temp file first
    std::fs::write(&temp, contents).map_err(|e| CatalogError::io(&temp, e))?;

    // Atomic rename
    std::fs::rename(&temp, path).map_err(|e| CatalogError::io(path, e))?;

    debug!(path = %path.display(), size = contents.len(), "wrote artifact");
    Ok(true)
}

fn remove_other_mode(dest_root: &Path, slug: &Slug, output: &SplitOutput) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for kind in output.mode().other().artifact_kinds() {
        let path = artifact_path(dest_root, slug, kind);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| CatalogError::io(&path, e))?;
            debug!(path = %path.display(), "removed artifact from other split mode");
            removed.push(path);
        }
    }
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const NOTEBOOK: &str = r#"{"nbformat": 4, "cells": []}"#;

    fn full_output() -> SplitOutput {
        SplitOutput::Full {
            code: "x = 1\n\ny = 2".into(),
            markdown: "# Title\n\nExplanation".into(),
        }
    }

    fn legacy_output() -> SplitOutput {
        SplitOutput::Legacy {
            combined: "# %%\nx = 1".into(),
            markdown: "# Title".into(),
        }
    }

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("raw").join("Demo.ipynb");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        std::fs::write(&source, NOTEBOOK).unwrap();
        let dest = tmp.path().join("interim");
        (tmp, source, dest)
    }

    #[test]
    fn write_full_split_layout() {
        let (_tmp, source, dest) = setup();
        let slug = Slug::from_normalized("demo");

        let set = write_artifacts(&dest, &slug, &source, &full_output(), WriteOptions::default())
            .unwrap();

        assert_eq!(set.dir, dest.join("demo"));
        assert_eq!(set.files.len(), 3);
        assert!(set.changed());

        let nb = std::fs::read_to_string(dest.join("demo/demo.ipynb")).unwrap();
        assert_eq!(nb, NOTEBOOK);
        let code = std::fs::read_to_string(dest.join("demo/demo-py-only.py")).unwrap();
        assert_eq!(code, "x = 1\n\ny = 2");
        let md = std::fs::read_to_string(dest.join("demo/demo-md-only.md")).unwrap();
        assert_eq!(md, "# Title\n\nExplanation");
    }

    #[test]
    fn rewrite_is_idempotent_and_unchanged() {
        let (_tmp, source, dest) = setup();
        let slug = Slug::from_normalized("demo");
        let opts = WriteOptions::default();

        let first = write_artifacts(&dest, &slug, &source, &full_output(), opts).unwrap();
        let before = std::fs::read(dest.join("demo/demo-py-only.py")).unwrap();
        let second = write_artifacts(&dest, &slug, &source, &full_output(), opts).unwrap();
        let after = std::fs::read(dest.join("demo/demo-py-only.py")).unwrap();

        assert!(first.changed());
        assert!(!second.changed());
        assert_eq!(before, after);
        for (a, b) in first.files.iter().zip(&second.files) {
            assert_eq!(a.sha256, b.sha256);
        }
    }

    #[test]
    fn switching_mode_removes_other_files() {
        let (_tmp, source, dest) = setup();
        let slug = Slug::from_normalized("demo");
        let opts = WriteOptions::default();

        write_artifacts(&dest, &slug, &source, &full_output(), opts).unwrap();
        let set = write_artifacts(&dest, &slug, &source, &legacy_output(), opts).unwrap();

        assert_eq!(set.removed.len(), 2);
        assert!(!dest.join("demo/demo-py-only.py").exists());
        assert!(!dest.join("demo/demo-md-only.md").exists());
        assert!(dest.join("demo/demo.py").exists());
        assert!(dest.join("demo/demo.md").exists());
    }

    #[test]
    fn provenance_headers_are_prepended() {
        let slug = Slug::from_normalized("demo");
        let rendered = render_artifacts(
            &slug,
            NOTEBOOK.as_bytes(),
            &full_output(),
            WriteOptions {
                provenance_header: true,
            },
        );

        let script = String::from_utf8(rendered[1].contents.clone()).unwrap();
        assert!(script.starts_with("# Generated from demo/demo.ipynb.\n"));
        assert!(script.ends_with("x = 1\n\ny = 2"));

        let md = String::from_utf8(rendered[2].contents.clone()).unwrap();
        assert!(md.starts_with("[View paired Python script](demo-py-only.py)\n\n"));
    }

    #[test]
    fn no_temp_files_left_behind() {
        let (_tmp, source, dest) = setup();
        let slug = Slug::from_normalized("demo");
        write_artifacts(&dest, &slug, &source, &full_output(), WriteOptions::default()).unwrap();

        for entry in std::fs::read_dir(dest.join("demo")).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }
    }

    #[test]
    fn missing_source_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let slug = Slug::from_normalized("demo");
        let err = write_artifacts(
            tmp.path(),
            &slug,
            &tmp.path().join("missing.ipynb"),
            &full_output(),
            WriteOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn stale_detection() {
        let (_tmp, source, dest) = setup();
        let slug = Slug::from_normalized("demo");
        let output = full_output();
        let rendered =
            render_artifacts(&slug, NOTEBOOK.as_bytes(), &output, WriteOptions::default());

        assert_eq!(stale_artifacts(&dest, &slug, &rendered, &output).len(), 3);

        write_artifacts(&dest, &slug, &source, &output, WriteOptions::default()).unwrap();
        assert!(stale_artifacts(&dest, &slug, &rendered, &output).is_empty());

        std::fs::write(dest.join("demo/demo-md-only.md"), "edited").unwrap();
        std::fs::write(dest.join("demo/demo.py"), "leftover").unwrap();
        let stale = stale_artifacts(&dest, &slug, &rendered, &output);
        assert_eq!(stale.len(), 2);
    }
}
