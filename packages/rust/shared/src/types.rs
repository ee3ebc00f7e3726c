//! Core domain types for nbcatalog artifact sets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CatalogError;

// ---------------------------------------------------------------------------
// Slug
// ---------------------------------------------------------------------------

/// A filesystem-safe notebook identifier, used as directory and file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Wrap an already-normalized slug string.
    ///
    /// Callers outside the slug generator should only use this for names read
    /// back from the destination tree.
    pub fn from_normalized(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SplitMode
// ---------------------------------------------------------------------------

/// How a notebook's cells are distributed across output files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Separate pure-code and pure-markdown files.
    #[default]
    Full,
    /// One percent-format script with markdown as comments, plus a markdown companion.
    Legacy,
}

impl SplitMode {
    /// Artifact kinds this mode produces besides the copied notebook.
    pub fn artifact_kinds(self) -> [ArtifactKind; 2] {
        match self {
            Self::Full => [ArtifactKind::Code, ArtifactKind::Docs],
            Self::Legacy => [ArtifactKind::Combined, ArtifactKind::Companion],
        }
    }

    /// The other mode.
    pub fn other(self) -> Self {
        match self {
            Self::Full => Self::Legacy,
            Self::Legacy => Self::Full,
        }
    }
}

impl std::fmt::Display for SplitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl std::str::FromStr for SplitMode {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "legacy" => Ok(Self::Legacy),
            other => Err(CatalogError::validation(format!(
                "unknown split mode '{other}': expected 'full' or 'legacy'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// One file inside a slug directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Copy of the source notebook.
    Notebook,
    /// Full split: code cells only.
    Code,
    /// Full split: markdown cells only.
    Docs,
    /// Legacy: interleaved script.
    Combined,
    /// Legacy: markdown-only companion.
    Companion,
}

impl ArtifactKind {
    /// File name of this artifact for `slug`.
    pub fn file_name(self, slug: &Slug) -> String {
        match self {
            Self::Notebook => format!("{slug}.ipynb"),
            Self::Code => format!("{slug}-py-only.py"),
            Self::Docs => format!("{slug}-md-only.md"),
            Self::Combined => format!("{slug}.py"),
            Self::Companion => format!("{slug}.md"),
        }
    }
}

/// A written artifact with its checksum.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactFile {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    /// Hex SHA-256 of the file contents.
    pub sha256: String,
    pub size_bytes: usize,
    /// Whether this run created or rewrote the file.
    pub changed: bool,
}

/// All outputs produced for one notebook.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSet {
    pub slug: Slug,
    /// `<dest_root>/<slug>`.
    pub dir: PathBuf,
    pub mode: SplitMode,
    pub files: Vec<ArtifactFile>,
    /// Files from the other mode removed during this write.
    pub removed: Vec<PathBuf>,
}

impl ArtifactSet {
    /// True if any file was created, rewritten, or removed.
    pub fn changed(&self) -> bool {
        !self.removed.is_empty() || self.files.iter().any(|f| f.changed)
    }
}

/// `<slug>/<file name>` with forward slashes, as used in catalogue links.
pub fn relative_artifact_path(slug: &Slug, kind: ArtifactKind) -> String {
    format!("{slug}/{}", kind.file_name(slug))
}

/// Absolute-or-root-relative path of `kind` under `dest_root`.
pub fn artifact_path(dest_root: &Path, slug: &Slug, kind: ArtifactKind) -> PathBuf {
    dest_root.join(slug.as_str()).join(kind.file_name(slug))
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_file_names() {
        let slug = Slug::from_normalized("rag-intro");
        assert_eq!(ArtifactKind::Notebook.file_name(&slug), "rag-intro.ipynb");
        assert_eq!(ArtifactKind::Code.file_name(&slug), "rag-intro-py-only.py");
        assert_eq!(ArtifactKind::Docs.file_name(&slug), "rag-intro-md-only.md");
        assert_eq!(ArtifactKind::Combined.file_name(&slug), "rag-intro.py");
        assert_eq!(ArtifactKind::Companion.file_name(&slug), "rag-intro.md");
        assert_eq!(
            relative_artifact_path(&slug, ArtifactKind::Code),
            "rag-intro/rag-intro-py-only.py"
        );
    }

    #[test]
    fn split_mode_parse_and_display() {
        assert_eq!("full".parse::<SplitMode>().unwrap(), SplitMode::Full);
        assert_eq!("legacy".parse::<SplitMode>().unwrap(), SplitMode::Legacy);
        assert!("mixed".parse::<SplitMode>().is_err());
        assert_eq!(SplitMode::Legacy.to_string(), "legacy");
        assert_eq!(SplitMode::Full.other(), SplitMode::Legacy);
    }

    #[test]
    fn split_mode_serde_lowercase() {
        let json = serde_json::to_string(&SplitMode::Legacy).unwrap();
        assert_eq!(json, "\"legacy\"");
    }

    #[test]
    fn sha256_hex_is_stable() {
        let a = sha256_hex(b"x = 1");
        assert_eq!(a.len(), 64);
        assert_eq!(a, sha256_hex(b"x = 1"));
        assert_ne!(a, sha256_hex(b"x = 2"));
    }

    #[test]
    fn artifact_set_change_tracking() {
        let mut set = ArtifactSet {
            slug: Slug::from_normalized("demo"),
            dir: PathBuf::from("interim/demo"),
            mode: SplitMode::Full,
            files: vec![ArtifactFile {
                kind: ArtifactKind::Code,
                path: PathBuf::from("interim/demo/demo-py-only.py"),
                sha256: sha256_hex(b""),
                size_bytes: 0,
                changed: false,
            }],
            removed: vec![],
        };
        assert!(!set.changed());

        set.removed.push(PathBuf::from("interim/demo/demo.py"));
        assert!(set.changed());
    }
}
