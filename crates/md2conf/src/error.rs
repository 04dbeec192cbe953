//! CLI error types.

use md2conf_config::ConfigError;
use md2conf_confluence::ConfluenceError;
use md2conf_sync::SyncError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Confluence(#[from] ConfluenceError),

    #[error("{0}")]
    Sync(#[from] SyncError),

    /// The run finished but did not succeed.
    #[error("{failed} page(s) failed, {unresolved} unresolved reference(s)")]
    Incomplete { failed: usize, unresolved: usize },
}

impl CliError {
    /// Server response body, if the error came from Confluence.
    pub(crate) fn payload(&self) -> Option<&str> {
        match self {
            Self::Confluence(e) => e.payload(),
            Self::Sync(e) => e.payload(),
            Self::Config(_) | Self::Incomplete { .. } => None,
        }
    }
}
