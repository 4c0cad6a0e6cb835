//! Error kinds callers need to tell apart.
//!
//! Everything travels as `anyhow::Error`; use `downcast_ref::<InstallerError>()`
//! to recover the kind.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("Invalid server identifier \"{raw}\": {reason}")]
    InvalidIdentifier { raw: String, reason: String },

    #[error("Could not resolve \"{identifier}\": {reason}")]
    Resolution { identifier: String, reason: String },

    #[error("{failed}/{total} servers failed to install.")]
    BatchFailed { failed: usize, total: usize },

    #[error(
        "Timed out after {}s waiting for {outstanding}/{total} servers to finish installing.",
        .waited.as_secs()
    )]
    BarrierTimeout {
        outstanding: usize,
        total: usize,
        waited: Duration,
    },

    #[error("Failed to uninstall server \"{name}\": {reason}")]
    UninstallFailed { name: String, reason: String },

    #[error("Failed to remove install root {}: {reason}", .path.display())]
    RemoveRoot { path: PathBuf, reason: String },
}
