//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Page swap resource reconciler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: pageswap.toml)
    #[arg(short = 'C', long, global = true, default_value = "pageswap.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Page origin, overrides `page.origin` (e.g., https://example.com)
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Directory serving script loads (relative to current directory)
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the scripts and stylesheets of a page
    #[command(visible_alias = "i")]
    Inspect {
        /// HTML page to inspect
        #[arg(value_hint = clap::ValueHint::FilePath)]
        page: PathBuf,
    },

    /// Swap one page for another and trace lifecycle signals
    #[command(visible_alias = "s")]
    Swap {
        /// Page currently shown
        #[arg(value_hint = clap::ValueHint::FilePath)]
        old: PathBuf,

        /// Page navigated to
        #[arg(value_hint = clap::ValueHint::FilePath)]
        new: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_args() {
        let cli = Cli::parse_from(["pageswap", "--origin", "https://a.com", "swap", "a.html", "b.html", "--json"]);
        assert_eq!(cli.origin.as_deref(), Some("https://a.com"));
        assert_eq!(cli.config, PathBuf::from("pageswap.toml"));
        match cli.command {
            Commands::Swap { old, new, json } => {
                assert_eq!(old, PathBuf::from("a.html"));
                assert_eq!(new, PathBuf::from("b.html"));
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["pageswap", "inspect", "page.html", "-v", "-C", "site.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
        assert!(matches!(cli.command, Commands::Inspect { .. }));
    }
}
