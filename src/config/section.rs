//! `pageswap.toml` sections.
//!
//! # Example
//!
//! ```toml
//! [page]
//! origin = "http://localhost:5277"   # Base URL of the page
//! region = "main"                     # Selector of the swapped region
//!
//! [scripts]
//! modules = true                      # Environment runs type="module"
//! join = "fail-fast"                  # or "best-effort"
//!
//! [loader]
//! root = "public"                     # Serve loads from this directory
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::reconcile::JoinPolicy;

/// `[page]` - where the page lives and what gets swapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Base URL; scripts from other origins never join the lifecycle.
    pub origin: String,

    /// Selector of the content region replaced on navigation.
    pub region: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:5277".to_string(),
            region: "main".to_string(),
        }
    }
}

/// `[scripts]` - script reconciliation behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Whether the environment supports `type="module"`.
    pub modules: bool,

    /// What a dependent does when a dependency fails to load.
    pub join: JoinPolicy,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            modules: true,
            join: JoinPolicy::FailFast,
        }
    }
}

/// `[loader]` - where network steps are served from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory mapped onto URL paths. Without it every load succeeds.
    pub root: Option<PathBuf>,
}
