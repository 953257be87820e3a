//! pageswap - trace resource reconciliation between two pages.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use pageswap::cli::{self, Cli, Commands};
use pageswap::config::PageswapConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = PageswapConfig::load(&cli)?;

    match &cli.command {
        Commands::Inspect { page } => cli::inspect::inspect_page(page, &config),
        Commands::Swap { old, new, json } => cli::swap::swap_pages(old, new, *json, &config),
    }
}
