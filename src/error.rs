//! Error taxonomy for a synchronization run.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can halt a project (or a whole run) during synchronization.
///
/// `NoHostProjects` and `MissingMandatoryReference` halt the run before any
/// descriptor is touched. The remaining variants halt a single project; the
/// orchestrator records them and keeps going.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no Unity project descriptors (*.csproj) found in {}. Add a C# script to the Unity project, open it once so Unity regenerates its project files, and try again", root.display())]
    NoHostProjects { root: PathBuf },

    #[error("reference '{name}' was not declared by any Unity project descriptor")]
    MissingMandatoryReference { name: String },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("compilation of '{project}' failed:\n{output}")]
    Compile { project: String, output: String },

    #[error("failed to deploy artifact for '{project}': {message}")]
    Copy { project: String, message: String },

    #[error("cannot bootstrap '{}': {reason}", path.display())]
    Bootstrap { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

impl SyncError {
    /// Short phase name used in run reports and log fields.
    pub fn phase(&self) -> &'static str {
        match self {
            SyncError::NoHostProjects { .. } | SyncError::MissingMandatoryReference { .. } => {
                "extract"
            }
            SyncError::Parse { .. } => "parse",
            SyncError::Compile { .. } => "compile",
            SyncError::Copy { .. } => "deploy",
            SyncError::Bootstrap { .. } => "bootstrap",
            SyncError::Io(_) => "io",
        }
    }
}
