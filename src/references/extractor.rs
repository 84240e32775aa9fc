//! Reference extraction from Unity-generated C# project descriptors.

use super::{Reference, ReferenceContainer};
use crate::config::Configuration;
use crate::error::SyncError;
use crate::fs::FileSystem;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, warn};

pub const MANDATORY_ENGINE: &str = "UnityEngine";
pub const MANDATORY_EDITOR: &str = "UnityEditor";
pub const CSHARP_ASSEMBLY: &str = "Assembly-CSharp";

/// Our own outputs; referencing them back would make the F# project depend
/// on itself.
const IGNORED_ARTIFACTS: [&str; 2] = ["Assembly-FSharp.dll", "FSharp.Core.dll"];

/// What to pull out of the host descriptors besides the mandatory pair.
#[derive(Debug, Clone)]
pub struct ExtractPolicy {
    pub reference_csharp_dll: bool,
    pub configuration: Configuration,
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<Reference Include="([^"]+)">\s*<HintPath>([^<]+)</HintPath>\s*</Reference>"#)
            .expect("reference pattern is valid")
    })
}

/// Scan the host root's top-level `.csproj` files and classify every declared
/// library reference.
///
/// Deterministic for identical descriptor contents. The result is computed at
/// most once per orchestration run and shared read-only across all target
/// projects.
pub fn extract(
    fs: &dyn FileSystem,
    host_root: &Path,
    policy: &ExtractPolicy,
) -> Result<ReferenceContainer, SyncError> {
    let started = Instant::now();

    let host_descriptors = fs.find_files(host_root, "csproj", false)?;
    if host_descriptors.is_empty() {
        return Err(SyncError::NoHostProjects {
            root: host_root.to_path_buf(),
        });
    }

    let mut all_references: HashSet<Reference> = HashSet::new();
    for descriptor in &host_descriptors {
        let content = fs.read_to_string(descriptor)?;
        for capture in reference_pattern().captures_iter(&content) {
            let include = capture[1].to_string();
            let hint_path = capture[2].to_string();
            if IGNORED_ARTIFACTS.iter().any(|a| hint_path.ends_with(a)) {
                continue;
            }
            all_references.replace(Reference::new(include, hint_path));
        }
    }

    let unity_engine = take_mandatory(&mut all_references, MANDATORY_ENGINE)?;
    let unity_editor = take_mandatory(&mut all_references, MANDATORY_EDITOR)?;

    let csharp_dll = if policy.reference_csharp_dll {
        let found = find_csharp_dll(fs, host_root, policy.configuration)?;
        if found.is_none() {
            warn!("no Assembly-CSharp.dll was found to reference");
        }
        found
    } else {
        None
    };
    if csharp_dll.is_some() {
        all_references.remove(&Reference::named(CSHARP_ASSEMBLY));
    }

    let mut additional: Vec<Reference> = all_references.into_iter().collect();
    additional.sort_by(|a, b| a.include.cmp(&b.include));

    debug!(
        descriptors = host_descriptors.len(),
        additional = additional.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "extracted references from Unity project"
    );

    Ok(ReferenceContainer {
        unity_engine,
        unity_editor,
        csharp_dll,
        additional,
    })
}

fn take_mandatory(
    references: &mut HashSet<Reference>,
    name: &str,
) -> Result<Reference, SyncError> {
    references
        .take(&Reference::named(name))
        .ok_or_else(|| SyncError::MissingMandatoryReference {
            name: name.to_string(),
        })
}

/// Locate the host's compiled C# assembly, preferring the build that matches
/// the current configuration.
fn find_csharp_dll(
    fs: &dyn FileSystem,
    host_root: &Path,
    configuration: Configuration,
) -> Result<Option<Reference>, SyncError> {
    let dlls = fs.find_files(host_root, "dll", true)?;
    let candidates: Vec<_> = dlls
        .into_iter()
        .filter(|p| p.file_name().and_then(|n| n.to_str()) == Some("Assembly-CSharp.dll"))
        .collect();

    let preferred = candidates
        .iter()
        .find(|p| p.to_string_lossy().contains(configuration.as_str()))
        .or_else(|| candidates.first());

    Ok(preferred.map(|p| Reference::new(CSHARP_ASSEMBLY, p.to_string_lossy())))
}
