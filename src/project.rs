//! The secondary (F#) project being kept in sync.

use crate::config::Configuration;
use crate::error::SyncError;
use crate::fs::FileSystem;
use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Name used when bootstrapping a brand-new F# project.
pub const DEFAULT_PROJECT_NAME: &str = "Assembly-FSharp";

fn target_framework_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<TargetFramework>([^<]+)</TargetFramework>")
            .expect("target framework pattern is valid")
    })
}

/// One discovered `.fsproj` and the paths derived from it.
#[derive(Debug, Clone)]
pub struct FsProject {
    pub descriptor: PathBuf,
    pub name: String,
    pub dir: PathBuf,
}

impl FsProject {
    pub fn from_descriptor(descriptor: PathBuf) -> Option<Self> {
        let name = descriptor.file_stem()?.to_str()?.to_string();
        let dir = descriptor.parent()?.to_path_buf();
        Some(Self {
            descriptor,
            name,
            dir,
        })
    }

    /// All `.fsproj` descriptors under the host root, unbounded depth.
    pub fn discover(fs: &dyn FileSystem, host_root: &Path) -> Result<Vec<FsProject>> {
        let descriptors = fs.find_files(host_root, "fsproj", true)?;
        Ok(descriptors
            .into_iter()
            .filter_map(FsProject::from_descriptor)
            .collect())
    }

    /// Every F# source file belonging to this project.
    pub fn source_files(&self, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
        fs.find_files(&self.dir, "fs", true)
    }

    /// `<TargetFramework>` from the descriptor content; the build output
    /// directory cannot be derived without it.
    pub fn target_framework(&self, descriptor_content: &str) -> Result<String, SyncError> {
        target_framework_pattern()
            .captures(descriptor_content)
            .map(|c| c[1].to_string())
            .ok_or_else(|| SyncError::Parse {
                path: self.descriptor.clone(),
                message: "no <TargetFramework> element found".to_string(),
            })
    }

    pub fn build_dir(&self, configuration: Configuration, target_framework: &str) -> PathBuf {
        self.dir
            .join("bin")
            .join(configuration.as_str())
            .join(target_framework)
    }

    pub fn artifact_name(&self) -> String {
        format!("{}.dll", self.name)
    }

    pub fn build_artifact(&self, configuration: Configuration, target_framework: &str) -> PathBuf {
        self.build_dir(configuration, target_framework)
            .join(self.artifact_name())
    }

    /// Where the host loads the compiled assembly from.
    pub fn deployed_artifact(&self, host_root: &Path) -> PathBuf {
        host_root.join("Assets").join(self.artifact_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;

    #[test]
    fn test_from_descriptor() {
        let project =
            FsProject::from_descriptor(PathBuf::from("/unity/Assembly-FSharp/Assembly-FSharp.fsproj"))
                .unwrap();

        assert_eq!(project.name, "Assembly-FSharp");
        assert_eq!(project.dir, PathBuf::from("/unity/Assembly-FSharp"));
        assert_eq!(project.artifact_name(), "Assembly-FSharp.dll");
    }

    #[test]
    fn test_discover_recursive() {
        let fs = MockFileSystem::with_root(PathBuf::from("/unity"));
        fs.add_file("Assembly-FSharp/Assembly-FSharp.fsproj", "<Project/>");
        fs.add_file("Plugins/Deep/Other.fsproj", "<Project/>");
        fs.add_file("Assembly-CSharp.csproj", "<Project/>");

        let projects = FsProject::discover(&fs, Path::new("/unity")).unwrap();
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Assembly-FSharp", "Other"]);
    }

    #[test]
    fn test_target_framework() {
        let project =
            FsProject::from_descriptor(PathBuf::from("/unity/A/A.fsproj")).unwrap();

        let framework = project
            .target_framework("<Project><PropertyGroup><TargetFramework>netstandard2.1</TargetFramework></PropertyGroup></Project>")
            .unwrap();
        assert_eq!(framework, "netstandard2.1");

        let err = project.target_framework("<Project></Project>").unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
    }

    #[test]
    fn test_derived_paths() {
        let project =
            FsProject::from_descriptor(PathBuf::from("/unity/Assembly-FSharp/Assembly-FSharp.fsproj"))
                .unwrap();

        assert_eq!(
            project.build_artifact(Configuration::Release, "netstandard2.1"),
            PathBuf::from("/unity/Assembly-FSharp/bin/Release/netstandard2.1/Assembly-FSharp.dll")
        );
        assert_eq!(
            project.deployed_artifact(Path::new("/unity")),
            PathBuf::from("/unity/Assets/Assembly-FSharp.dll")
        );
    }

    #[test]
    fn test_source_files_scoped_to_project_dir() {
        let fs = MockFileSystem::with_root(PathBuf::from("/unity"));
        fs.add_file("Assembly-FSharp/Library.fs", "let x = 1");
        fs.add_file("Assembly-FSharp/Nested/Deep.fs", "let y = 2");
        fs.add_file("Elsewhere/Not.fs", "let z = 3");
        let project =
            FsProject::from_descriptor(PathBuf::from("/unity/Assembly-FSharp/Assembly-FSharp.fsproj"))
                .unwrap();

        let sources = project.source_files(&fs).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources.iter().all(|s| s.starts_with("/unity/Assembly-FSharp")));
    }
}
