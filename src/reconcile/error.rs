//! Reconciliation error types.

use thiserror::Error;

use crate::core::Address;
use crate::dom::{DomError, SelectorError};

// ============================================================================
// ReconcileError
// ============================================================================

/// Failures that abort a whole pass.
///
/// Per-resource network failures never show up here; they settle the
/// resource's readiness signal instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("malformed `data-script-dependencies` on `{address}`")]
    MalformedDependencies {
        address: Address,
        #[source]
        source: serde_json::Error,
    },

    #[error("no element matches region selector `{0}`")]
    MissingRegion(String),

    #[error("navigation to `{0}` was superseded")]
    StaleNavigation(String),

    #[error("reconciliation needs a tokio runtime")]
    NoRuntime,

    #[error("invalid page origin `{0}`")]
    InvalidOrigin(String, #[source] url::ParseError),

    #[error(transparent)]
    Markup(#[from] DomError),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}
