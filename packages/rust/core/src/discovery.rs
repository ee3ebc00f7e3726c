//! Notebook discovery under the raw root.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Jupyter autosave directory, never converted.
const CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

/// Find every `.ipynb` file under `root`, recursively, sorted by path.
///
/// Symlinks are followed. A missing root yields an empty list. Unreadable
/// entries and link loops are logged and skipped.
pub fn find_notebooks(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        debug!(root = %root.display(), "raw directory does not exist");
        return Vec::new();
    }

    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_checkpoint_dir(e))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_notebook(e.path()))
        .map(DirEntry::into_path)
        .collect();

    found.sort();
    debug!(root = %root.display(), count = found.len(), "notebooks discovered");
    found
}

/// True for paths with an `.ipynb` extension (case-insensitive).
pub fn is_notebook(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ipynb"))
}

fn is_checkpoint_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == CHECKPOINT_DIR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    #[test]
    fn finds_nested_notebooks_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("week2/b.ipynb"));
        touch(&root.join("a.ipynb"));
        touch(&root.join("week1/deep/C.IPYNB"));
        touch(&root.join("notes.md"));

        let found = find_notebooks(root);
        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            rel,
            vec![
                PathBuf::from("a.ipynb"),
                PathBuf::from("week1/deep/C.IPYNB"),
                PathBuf::from("week2/b.ipynb"),
            ]
        );
    }

    #[test]
    fn skips_checkpoint_directories() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a.ipynb"));
        touch(&tmp.path().join(".ipynb_checkpoints/a-checkpoint.ipynb"));

        let found = find_notebooks(tmp.path());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("a.ipynb"));
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinked_notebooks() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("elsewhere/real.ipynb");
        touch(&target);
        let raw = tmp.path().join("raw");
        std::fs::create_dir_all(&raw).unwrap();
        std::os::unix::fs::symlink(&target, raw.join("linked.ipynb")).unwrap();

        let found = find_notebooks(&raw);
        assert_eq!(found, vec![raw.join("linked.ipynb")]);
    }

    #[test]
    fn missing_root_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_notebooks(&tmp.path().join("raw")).is_empty());
    }
}
