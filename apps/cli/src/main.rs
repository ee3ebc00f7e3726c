//! nbcatalog CLI — notebook splitter and catalogue builder.
//!
//! Copies Jupyter notebooks from a raw folder into an interim folder, splits
//! each into code and markdown files, and regenerates a catalogue index.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
