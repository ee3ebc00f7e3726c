//! End-to-end conversion: discover → load → slug → split → write → catalogue.
//!
//! Each notebook is converted independently. A failure affects only that
//! notebook and is collected in the [`RunReport`]; the batch continues.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, instrument, warn};

use nbcatalog_notebook::{self as notebook, SplitOutput};
use nbcatalog_shared::{ArtifactSet, CatalogError, ConvertConfig, Result, Slug};

use crate::catalogue::{self, Catalogue, CatalogueEntry};
use crate::discovery;
use crate::slug::slugify;
use crate::writer::{self, WriteOptions};

/// Which notebooks a run should touch.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Every notebook under the configured raw directory.
    All,
    /// Only these notebook files.
    Paths(Vec<PathBuf>),
}

/// A notebook that converted successfully.
#[derive(Debug)]
pub struct ConvertedNotebook {
    pub source: PathBuf,
    pub artifacts: ArtifactSet,
}

/// A notebook that could not be converted.
#[derive(Debug)]
pub struct NotebookFailure {
    pub source: PathBuf,
    pub error: CatalogError,
}

/// Two or more sources in one run that mapped to the same slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugCollision {
    pub slug: Slug,
    /// Sources in processing order; the last one's artifacts win.
    pub sources: Vec<PathBuf>,
}

/// Result of a conversion run.
#[derive(Debug)]
pub struct RunReport {
    pub converted: Vec<ConvertedNotebook>,
    pub failures: Vec<NotebookFailure>,
    pub collisions: Vec<SlugCollision>,
    pub catalogue: Catalogue,
    pub elapsed: std::time::Duration,
}

impl RunReport {
    /// Number of notebooks whose artifacts changed on disk.
    pub fn changed_count(&self) -> usize {
        self.converted
            .iter()
            .filter(|c| c.artifacts.changed())
            .count()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// A notebook whose on-disk artifacts differ from a fresh conversion.
#[derive(Debug)]
pub struct StaleNotebook {
    pub source: PathBuf,
    pub slug: Slug,
    pub files: Vec<PathBuf>,
}

/// Result of a `--check` run. Nothing is written.
#[derive(Debug)]
pub struct CheckReport {
    /// Number of notebooks examined (including failures).
    pub checked: usize,
    pub stale: Vec<StaleNotebook>,
    pub failures: Vec<NotebookFailure>,
    /// Slugs shared by several sources; only the last source is compared.
    pub collisions: Vec<SlugCollision>,
    pub catalogue_stale: bool,
}

impl CheckReport {
    pub fn is_up_to_date(&self) -> bool {
        self.stale.is_empty() && self.failures.is_empty() && !self.catalogue_stale
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each notebook is processed.
    fn notebook(&self, path: &Path, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn finish(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn notebook(&self, _path: &Path, _current: usize, _total: usize) {}
    fn finish(&self) {}
}

/// Convert the selected notebooks and rebuild the catalogue.
///
/// Per-notebook failures are collected; only a catalogue write failure is
/// returned as an error. When several sources share a slug only the last one
/// is written.
#[instrument(skip_all, fields(raw = %config.raw_dir.display(), dest = %config.dest_root.display(), mode = %config.mode))]
pub fn run_convert(
    config: &ConvertConfig,
    selection: &Selection,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();

    progress.phase("Discovering notebooks");
    let sources = resolve_sources(config, selection);
    info!(count = sources.len(), "starting conversion");

    progress.phase("Loading notebooks");
    let (prepared, mut failures) = prepare_all(config, &sources, progress);
    let collisions = find_collisions(&prepared);
    let winners = last_per_slug(prepared);

    progress.phase("Writing artifacts");
    let mut converted = Vec::with_capacity(winners.len());
    let total = winners.len();

    for (i, item) in winners.into_iter().enumerate() {
        progress.notebook(&item.source, i + 1, total);

        match writer::write_artifacts(
            &config.dest_root,
            &item.slug,
            &item.source,
            &item.output,
            write_options(config),
        ) {
            Ok(artifacts) => {
                info!(
                    source = %item.source.display(),
                    slug = %artifacts.slug,
                    changed = artifacts.changed(),
                    "notebook converted"
                );
                converted.push(ConvertedNotebook {
                    source: item.source,
                    artifacts,
                });
            }
            Err(error) => {
                warn!(source = %item.source.display(), error = %error, "conversion failed, skipping notebook");
                failures.push(NotebookFailure {
                    source: item.source,
                    error,
                });
            }
        }
    }

    progress.phase("Rebuilding catalogue");
    let catalogue = catalogue::rebuild_catalogue(&config.dest_root, &config.index_file)?;

    progress.finish();

    let report = RunReport {
        converted,
        failures,
        collisions,
        catalogue,
        elapsed: start.elapsed(),
    };

    info!(
        converted = report.converted.len(),
        changed = report.changed_count(),
        failed = report.failures.len(),
        "conversion complete"
    );

    Ok(report)
}

/// Compare what a conversion would write against the destination tree.
///
/// Sources that lose a slug collision are not compared, matching what
/// [`run_convert`] writes.
#[instrument(skip_all, fields(raw = %config.raw_dir.display(), dest = %config.dest_root.display()))]
pub fn run_check(
    config: &ConvertConfig,
    selection: &Selection,
    progress: &dyn ProgressReporter,
) -> Result<CheckReport> {
    progress.phase("Discovering notebooks");
    let sources = resolve_sources(config, selection);

    progress.phase("Checking notebooks");
    let (prepared, mut failures) = prepare_all(config, &sources, progress);
    let collisions = find_collisions(&prepared);

    let mut stale = Vec::new();
    let mut pending = Vec::new();

    for item in last_per_slug(prepared) {
        match check_notebook(config, &item) {
            Ok(files) => {
                pending.push(CatalogueEntry::expected(item.slug.clone(), config.mode));
                if !files.is_empty() {
                    info!(source = %item.source.display(), stale_files = files.len(), "notebook is stale");
                    stale.push(StaleNotebook {
                        source: item.source,
                        slug: item.slug,
                        files,
                    });
                }
            }
            Err(error) => {
                warn!(source = %item.source.display(), error = %error, "check failed for notebook");
                failures.push(NotebookFailure {
                    source: item.source,
                    error,
                });
            }
        }
    }

    progress.phase("Checking catalogue");
    let catalogue_stale = catalogue::is_stale(&config.dest_root, &config.index_file, &pending)?;

    progress.finish();

    Ok(CheckReport {
        checked: sources.len(),
        stale,
        failures,
        collisions,
        catalogue_stale,
    })
}

/// A loaded notebook with its slug and split output, ready to write.
struct Prepared {
    source: PathBuf,
    slug: Slug,
    output: SplitOutput,
}

fn prepare_all(
    config: &ConvertConfig,
    sources: &[PathBuf],
    progress: &dyn ProgressReporter,
) -> (Vec<Prepared>, Vec<NotebookFailure>) {
    let mut prepared = Vec::with_capacity(sources.len());
    let mut failures = Vec::new();
    let total = sources.len();

    for (i, source) in sources.iter().enumerate() {
        progress.notebook(source, i + 1, total);

        match prepare(config, source) {
            Ok((slug, output)) => prepared.push(Prepared {
                source: source.clone(),
                slug,
                output,
            }),
            Err(error) => {
                warn!(source = %source.display(), error = %error, "cannot load notebook, skipping");
                failures.push(NotebookFailure {
                    source: source.clone(),
                    error,
                });
            }
        }
    }

    (prepared, failures)
}

/// Keep only the last source for each slug, preserving processing order.
fn last_per_slug(prepared: Vec<Prepared>) -> Vec<Prepared> {
    let last: HashMap<Slug, usize> = prepared
        .iter()
        .enumerate()
        .map(|(i, item)| (item.slug.clone(), i))
        .collect();

    prepared
        .into_iter()
        .enumerate()
        .filter(|(i, item)| last.get(&item.slug) == Some(i))
        .map(|(_, item)| item)
        .collect()
}

fn check_notebook(config: &ConvertConfig, item: &Prepared) -> Result<Vec<PathBuf>> {
    let notebook_bytes =
        std::fs::read(&item.source).map_err(|e| CatalogError::io(&item.source, e))?;
    let rendered =
        writer::render_artifacts(&item.slug, &notebook_bytes, &item.output, write_options(config));
    Ok(writer::stale_artifacts(
        &config.dest_root,
        &item.slug,
        &rendered,
        &item.output,
    ))
}

fn prepare(config: &ConvertConfig, source: &Path) -> Result<(Slug, SplitOutput)> {
    let nb = notebook::load(source)?;
    let slug = slugify(nb.stem(), &config.stopwords);
    let output = notebook::split(&nb, config.mode);
    Ok((slug, output))
}

fn write_options(config: &ConvertConfig) -> WriteOptions {
    WriteOptions {
        provenance_header: config.provenance_header,
    }
}

fn resolve_sources(config: &ConvertConfig, selection: &Selection) -> Vec<PathBuf> {
    match selection {
        Selection::All => discovery::find_notebooks(&config.raw_dir),
        Selection::Paths(paths) => paths.clone(),
    }
}

fn find_collisions(prepared: &[Prepared]) -> Vec<SlugCollision> {
    let mut by_slug: HashMap<&Slug, Vec<PathBuf>> = HashMap::new();
    let mut order: Vec<&Slug> = Vec::new();

    for item in prepared {
        let sources = by_slug.entry(&item.slug).or_default();
        if sources.is_empty() {
            order.push(&item.slug);
        }
        sources.push(item.source.clone());
    }

    order
        .into_iter()
        .filter_map(|slug| {
            let sources = by_slug.remove(slug)?;
            if sources.len() < 2 {
                return None;
            }
            warn!(
                slug = %slug,
                count = sources.len(),
                "multiple notebooks map to the same slug; last one wins"
            );
            Some(SlugCollision {
                slug: slug.clone(),
                sources,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
