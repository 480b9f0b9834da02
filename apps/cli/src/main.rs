//! Docweave CLI — assemble documents from files, globs, and bundles.
//!
//! Joins plain-text sources (with optional line ranges) into a single
//! document, expanding bundle manifests and live-bundle directives
//! along the way.

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
