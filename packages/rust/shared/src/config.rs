//! Application configuration for nbcatalog.
//!
//! Config is looked up in order: an explicit `--config` path, `./nbcatalog.toml`,
//! then `~/.nbcatalog/nbcatalog.toml`. CLI flags override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::types::SplitMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "nbcatalog.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".nbcatalog";

// ---------------------------------------------------------------------------
// Config structs (matching nbcatalog.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source and destination locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Slug generation settings.
    #[serde(default)]
    pub slug: SlugConfig,

    /// Conversion settings.
    #[serde(default)]
    pub convert: ConvertSection,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Folder scanned for raw notebooks.
    #[serde(default = "default_raw_dir")]
    pub raw_dir: String,

    /// Destination root for slug directories and the catalogue.
    #[serde(default = "default_interim_dir")]
    pub interim_dir: String,

    /// Catalogue file name, written inside `interim_dir`.
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            interim_dir: default_interim_dir(),
            index_file: default_index_file(),
        }
    }
}

fn default_raw_dir() -> String {
    "raw".into()
}
fn default_interim_dir() -> String {
    "interim".into()
}
fn default_index_file() -> String {
    "index.md".into()
}

/// `[slug]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlugConfig {
    /// Tokens dropped from generated slugs.
    ///
    /// Each entry matches one token after `_`, `-` and parentheses have been
    /// split into spaces, so an entry containing a separator never matches.
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            stopwords: default_stopwords(),
        }
    }
}

fn default_stopwords() -> Vec<String> {
    [
        "ai",
        "makerspace",
        "ai_makerspace",
        "assignment",
        "assignments",
        "task",
        "2025",
        "2024",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// `[convert]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertSection {
    /// Split policy: `full` or `legacy`.
    #[serde(default)]
    pub mode: SplitMode,

    /// Prefix generated files with a "do not edit" / back-link header.
    #[serde(default)]
    pub provenance_header: bool,
}

// ---------------------------------------------------------------------------
// Convert config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime conversion configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Folder scanned for raw notebooks.
    pub raw_dir: PathBuf,
    /// Destination root (slug directories + catalogue).
    pub dest_root: PathBuf,
    /// Catalogue file name inside `dest_root`.
    pub index_file: String,
    /// Stop words removed during slug generation.
    pub stopwords: Vec<String>,
    /// Split policy.
    pub mode: SplitMode,
    /// Whether generated files carry provenance headers.
    pub provenance_header: bool,
}

impl ConvertConfig {
    /// Full path of the catalogue document.
    pub fn index_path(&self) -> PathBuf {
        self.dest_root.join(&self.index_file)
    }
}

impl From<&AppConfig> for ConvertConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            raw_dir: PathBuf::from(&config.paths.raw_dir),
            dest_root: PathBuf::from(&config.paths.interim_dir),
            index_file: config.paths.index_file.clone(),
            stopwords: config.slug.stopwords.clone(),
            mode: config.convert.mode,
            provenance_header: config.convert.provenance_header,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.nbcatalog/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CatalogError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.nbcatalog/nbcatalog.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the user config from the home directory. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Resolve the effective config.
///
/// An explicit path must exist. Otherwise a `nbcatalog.toml` in `cwd` wins over
/// the home config, which wins over defaults.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<AppConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(CatalogError::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return load_config_from(path);
    }

    let local = cwd.join(CONFIG_FILE_NAME);
    if local.exists() {
        tracing::debug!(path = ?local, "using project config");
        return load_config_from(&local);
    }

    load_config()
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CatalogError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CatalogError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CatalogError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("raw_dir"));
        assert!(toml_str.contains("makerspace"));
        assert!(toml_str.contains("mode = \"full\""));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[paths]
interim_dir = "out"

[convert]
mode = "legacy"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.paths.interim_dir, "out");
        assert_eq!(config.paths.raw_dir, "raw");
        assert_eq!(config.convert.mode, SplitMode::Legacy);
        assert!(!config.convert.provenance_header);
        assert_eq!(config.slug.stopwords.len(), 8);
    }

    #[test]
    fn convert_config_from_app_config() {
        let app = AppConfig::default();
        let convert = ConvertConfig::from(&app);
        assert_eq!(convert.raw_dir, PathBuf::from("raw"));
        assert_eq!(convert.index_path(), PathBuf::from("interim").join("index.md"));
        assert_eq!(convert.mode, SplitMode::Full);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result: std::result::Result<AppConfig, _> =
            toml::from_str("[convert]\nmode = \"sideways\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn resolve_prefers_project_config() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[paths]\nraw_dir = \"notebooks\"\n",
        )
        .unwrap();

        let config = resolve_config(None, tmp.path()).unwrap();
        assert_eq!(config.paths.raw_dir, "notebooks");
    }

    #[test]
    fn resolve_explicit_missing_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.toml");
        let err = resolve_config(Some(&missing), tmp.path()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn load_config_from_reports_bad_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[paths\n").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
