//! Configuration management for `pageswap.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs     # ConfigError, diagnostics
//! ├── section.rs   # [page], [scripts], [loader]
//! ├── util.rs      # Config file discovery
//! └── mod.rs       # PageswapConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                        |
//! |-------------|------------------------------------------------|
//! | `[page]`    | Page origin and swapped region selector        |
//! | `[scripts]` | Module support and dependency join policy      |
//! | `[loader]`  | Directory serving script loads                 |
//!
//! A missing config file is not an error: defaults apply, and CLI flags
//! override whatever the file says.

mod error;
mod section;
mod util;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use section::{LoaderConfig, PageConfig, ScriptsConfig};

use crate::cli::Cli;
use crate::core::Environment;
use crate::dom::Selector;
use crate::loader::{FsLoader, ImmediateLoader, ResourceLoader};
use crate::reconcile::ReconcileError;
use crate::{debug, log};
use util::find_config_file;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing pageswap.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageswapConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths resolve against (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub page: PageConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub loader: LoaderConfig,
}

impl PageswapConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file; CLI flags win.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    root: cwd.clone(),
                    ..Self::default()
                }
            }
        };

        config.apply_cli(cli, &cwd);
        config.normalize_paths();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_cli(&mut self, cli: &Cli, cwd: &Path) {
        crate::logger::set_verbose(cli.verbose);

        Self::update_option(&mut self.page.origin, cli.origin.as_ref());
        // CLI paths are relative to where the command runs
        if let Some(root) = &cli.root {
            self.loader.root = Some(cwd.join(root));
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve relative paths against the config directory.
    fn normalize_paths(&mut self) {
        if let Some(root) = self.loader.root.take() {
            self.loader.root = Some(self.root.join(root));
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Check every field, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        match Url::parse(&self.page.origin) {
            Ok(url) if url.cannot_be_a_base() => {
                diag.error("page.origin", format!("`{}` is not a base URL", self.page.origin));
            }
            Ok(_) => {}
            Err(err) => diag.error_with_hint(
                "page.origin",
                format!("`{}`: {err}", self.page.origin),
                "use an absolute URL such as \"https://example.com\"",
            ),
        }

        if let Err(err) = Selector::parse(&self.page.region) {
            diag.error_with_hint(
                "page.region",
                err.to_string(),
                "supported: tag, #id, .class, descendant and `>` combinators",
            );
        }

        diag.into_result()
    }

    // ========================================================================
    // runtime objects
    // ========================================================================

    /// The environment scripts are judged against.
    pub fn environment(&self) -> Result<Environment, ReconcileError> {
        Environment::parse(&self.page.origin, self.scripts.modules)
            .map_err(|err| ReconcileError::InvalidOrigin(self.page.origin.clone(), err))
    }

    pub fn region_selector(&self) -> Result<Selector, ReconcileError> {
        Ok(Selector::parse(&self.page.region)?)
    }

    /// Filesystem loader when a root is configured, immediate otherwise.
    pub fn resource_loader(&self) -> Arc<dyn ResourceLoader> {
        match &self.loader.root {
            Some(root) => Arc::new(FsLoader::new(root)),
            None => Arc::new(ImmediateLoader),
        }
    }
}

#[cfg(test)]
pub fn test_parse_config(content: &str) -> PageswapConfig {
    let (parsed, ignored) = PageswapConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
