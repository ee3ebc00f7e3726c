//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use nbcatalog_core::catalogue;
use nbcatalog_core::pipeline::{
    CheckReport, ProgressReporter, RunReport, Selection, run_check, run_convert,
};
use nbcatalog_shared::{AppConfig, ConvertConfig, SplitMode, init_config, resolve_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// nbcatalog — split Jupyter notebooks into code and docs, and index them.
#[derive(Parser)]
#[command(
    name = "nbcatalog",
    version,
    about = "Split Jupyter notebooks into code and markdown files and maintain a catalogue.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./nbcatalog.toml, then ~/.nbcatalog/nbcatalog.toml).
    #[arg(long, global = true, env = "NBCATALOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert notebooks and rebuild the catalogue.
    Convert {
        /// Notebook files to convert. Ignored with --all.
        paths: Vec<PathBuf>,

        /// Convert every notebook under the raw directory (default when no paths are given).
        #[arg(long)]
        all: bool,

        /// Write one interleaved script plus a markdown companion instead of a full split.
        #[arg(long)]
        legacy: bool,

        /// Prefix generated files with a provenance header.
        #[arg(long)]
        headers: bool,

        /// Only report stale artifacts; exit non-zero if anything is out of date.
        #[arg(long)]
        check: bool,

        /// Raw notebook directory (overrides config).
        #[arg(long)]
        raw: Option<PathBuf>,

        /// Destination root (overrides config).
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Rebuild the catalogue from the destination directory only.
    Index {
        /// Destination root (overrides config).
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize the home config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "nbcatalog=info",
        1 => "nbcatalog=debug",
        _ => "nbcatalog=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let load = || -> Result<AppConfig> {
        let cwd = std::env::current_dir()
            .map_err(|e| eyre!("cannot determine working directory: {e}"))?;
        Ok(resolve_config(cli.config.as_deref(), &cwd)?)
    };

    match cli.command {
        Command::Convert {
            paths,
            all,
            legacy,
            headers,
            check,
            raw,
            dest,
        } => {
            let mut config = ConvertConfig::from(&load()?);
            if let Some(raw) = raw {
                config.raw_dir = raw;
            }
            if let Some(dest) = dest {
                config.dest_root = dest;
            }
            if legacy {
                config.mode = SplitMode::Legacy;
            }
            if headers {
                config.provenance_header = true;
            }

            let selection = if all || paths.is_empty() {
                Selection::All
            } else {
                Selection::Paths(paths)
            };

            if check {
                cmd_check(&config, &selection)
            } else {
                cmd_convert(&config, &selection)
            }
        }
        Command::Index { dest } => {
            let mut config = ConvertConfig::from(&load()?);
            if let Some(dest) = dest {
                config.dest_root = dest;
            }
            cmd_index(&config)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&load()?),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_convert(config: &ConvertConfig, selection: &Selection) -> Result<()> {
    info!(
        raw = %config.raw_dir.display(),
        dest = %config.dest_root.display(),
        mode = %config.mode,
        "converting notebooks"
    );

    let reporter = CliProgress::new();
    let report = run_convert(config, selection, &reporter)?;
    print_run_summary(&report);

    if report.has_failures() {
        return Err(eyre!(
            "{} notebook(s) failed to convert",
            report.failures.len()
        ));
    }

    Ok(())
}

fn cmd_check(config: &ConvertConfig, selection: &Selection) -> Result<()> {
    let reporter = CliProgress::new();
    let report = run_check(config, selection, &reporter)?;
    print_check_summary(&report, &config.index_path());

    if !report.is_up_to_date() {
        return Err(eyre!("notebook artifacts are out of date; run `nbcatalog convert`"));
    }

    println!("All notebooks are up-to-date.");
    Ok(())
}

fn cmd_index(config: &ConvertConfig) -> Result<()> {
    let catalogue = catalogue::rebuild_catalogue(&config.dest_root, &config.index_file)?;
    println!(
        "Catalogue {} with {} notebook(s): {}",
        if catalogue.changed { "written" } else { "unchanged" },
        catalogue.entries.len(),
        catalogue.path.display()
    );
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_run_summary(report: &RunReport) {
    let converted = report.converted.len();
    let changed = report.changed_count();

    println!();
    println!("  Notebook conversion complete.");
    println!("  Converted: {converted}");
    println!("  Changed:   {changed}");
    println!("  Unchanged: {}", converted - changed);
    println!("  Failed:    {}", report.failures.len());
    println!("  Catalogue: {}", report.catalogue.path.display());
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());

    for collision in &report.collisions {
        println!();
        println!("  Slug '{}' produced by several notebooks (last wins):", collision.slug);
        for source in &collision.sources {
            println!("    - {}", source.display());
        }
    }

    if !report.failures.is_empty() {
        println!();
        println!("  Failed notebooks:");
        for failure in &report.failures {
            println!("    - {}: {}", failure.source.display(), failure.error);
        }
    }
    println!();
}

fn print_check_summary(report: &CheckReport, index_path: &Path) {
    if !report.stale.is_empty() {
        eprintln!("The following notebooks have outdated artifacts:");
        for notebook in &report.stale {
            eprintln!("  - {} ({})", notebook.source.display(), notebook.slug);
            for file in &notebook.files {
                eprintln!("      {}", file.display());
            }
        }
    }
    for collision in &report.collisions {
        eprintln!("Slug '{}' produced by several notebooks (last wins):", collision.slug);
        for source in &collision.sources {
            eprintln!("  - {}", source.display());
        }
    }
    if report.catalogue_stale {
        eprintln!("Catalogue is outdated: {}", index_path.display());
    }
    for failure in &report.failures {
        eprintln!("Could not check {}: {}", failure.source.display(), failure.error);
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn notebook(&self, path: &Path, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Notebook [{current}/{total}] {}", path.display()));
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
