//! Rebuild/redeploy decisions from filesystem timestamps.

use crate::fs::FileSystem;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// What a project needs this run. Pure function of filesystem metadata;
/// recomputed fresh on every run because sources change between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub compile_required: bool,
    pub copy_required: bool,
}

impl Staleness {
    pub fn up_to_date(&self) -> bool {
        !self.compile_required && !self.copy_required
    }
}

/// Compare source timestamps against the build artifact and the deployed
/// artifact.
///
/// A missing build artifact counts as modified at the epoch, so any source
/// file forces a rebuild. A missing deployed artifact forces a rebuild
/// regardless of timestamps. Copying is needed whenever a compile is, or when
/// the build artifact is newer than its deployed copy.
pub fn assess(
    fs: &dyn FileSystem,
    source_files: &[PathBuf],
    build_artifact: &Path,
    deployed_artifact: &Path,
) -> Staleness {
    let build_modified = fs.modified(build_artifact).unwrap_or(UNIX_EPOCH);
    let deployed_modified = fs.modified(deployed_artifact);

    let sources_newer = source_files
        .iter()
        .any(|source| fs.modified(source).is_some_and(|m| m > build_modified));

    let compile_required = deployed_modified.is_none() || sources_newer;
    let copy_required =
        compile_required || deployed_modified.is_some_and(|d| build_modified > d);

    Staleness {
        compile_required,
        copy_required,
    }
}
