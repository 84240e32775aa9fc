//! Composition of extraction, injection, staleness, and compilation.

use crate::config::BridgeConfig;
use crate::error::SyncError;
use crate::fs::FileSystem;
use crate::project::{FsProject, DEFAULT_PROJECT_NAME};
use crate::references::{
    extract, write_references, ExtractPolicy, ReferenceContainer, WritePolicy,
};
use crate::runner::CommandRunner;
use crate::staleness;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Fate of one project during a run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProjectStatus {
    Synced { compiled: bool, copied: bool },
    UpToDate,
    Failed { phase: String, detail: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectOutcome {
    pub project: String,
    #[serde(flatten)]
    pub status: ProjectStatus,
}

/// What a run did, project by project. A rejected re-entrant trigger yields
/// `already_running` with no project entries.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub already_running: bool,
    pub projects: Vec<ProjectOutcome>,
}

impl SyncReport {
    fn rejected() -> Self {
        Self {
            already_running: true,
            projects: Vec::new(),
        }
    }

    fn completed(projects: Vec<ProjectOutcome>) -> Self {
        Self {
            already_running: false,
            projects,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.projects
            .iter()
            .filter(|o| matches!(o.status, ProjectStatus::Failed { .. }))
            .count()
    }
}

/// Drives one synchronization pass over every F# project under the host root.
///
/// At most one pass runs at a time; a trigger arriving while one is in flight
/// is ignored, not queued.
pub struct Orchestrator {
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
    config: BridgeConfig,
    running: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn CommandRunner>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            fs,
            runner,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Synchronize every discovered project. Projects fail independently;
    /// the report carries one outcome per project.
    pub async fn run(&self, host_root: &Path) -> Result<SyncReport, SyncError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("a sync is already in progress, ignoring this trigger");
            return Ok(SyncReport::rejected());
        }

        let result = self.run_locked(host_root).await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_locked(&self, host_root: &Path) -> Result<SyncReport, SyncError> {
        info!(
            configuration = %self.config.configuration,
            "synchronizing F# projects in {}",
            host_root.display()
        );

        let projects = FsProject::discover(self.fs.as_ref(), host_root)?;
        if projects.is_empty() {
            info!("no F# projects found, nothing to do");
            return Ok(SyncReport::completed(Vec::new()));
        }

        // Expensive shared scan, computed once and threaded through the loop.
        let references = extract(
            self.fs.as_ref(),
            host_root,
            &ExtractPolicy {
                reference_csharp_dll: self.config.reference_csharp_dll,
                configuration: self.config.configuration,
            },
        )?;

        let mut outcomes = Vec::with_capacity(projects.len());
        for project in &projects {
            let status = match self.sync_project(host_root, project, &references).await {
                Ok(status) => status,
                Err(e) => {
                    error!(project = %project.name, phase = e.phase(), "{}", e);
                    ProjectStatus::Failed {
                        phase: e.phase().to_string(),
                        detail: e.to_string(),
                    }
                }
            };
            outcomes.push(ProjectOutcome {
                project: project.name.clone(),
                status,
            });
        }

        Ok(SyncReport::completed(outcomes))
    }

    async fn sync_project(
        &self,
        host_root: &Path,
        project: &FsProject,
        references: &ReferenceContainer,
    ) -> Result<ProjectStatus, SyncError> {
        write_references(
            self.fs.as_ref(),
            &project.descriptor,
            references,
            &WritePolicy {
                reference_csharp_dll: self.config.reference_csharp_dll,
                include_additional: self.config.include_additional_references,
            },
        )?;

        let descriptor_content = self.fs.read_to_string(&project.descriptor)?;
        let target_framework = project.target_framework(&descriptor_content)?;

        let configuration = self.config.configuration;
        let build_dir = project.build_dir(configuration, &target_framework);
        let build_artifact = project.build_artifact(configuration, &target_framework);
        let deployed_artifact = project.deployed_artifact(host_root);
        let sources = project.source_files(self.fs.as_ref())?;

        let staleness = staleness::assess(
            self.fs.as_ref(),
            &sources,
            &build_artifact,
            &deployed_artifact,
        );
        if staleness.up_to_date() {
            info!("'{}' is already up-to-date", project.name);
            return Ok(ProjectStatus::UpToDate);
        }

        if staleness.compile_required {
            self.compile(project, configuration, &build_dir).await?;
        }

        if staleness.copy_required {
            self.deploy(project, &build_artifact, &deployed_artifact)?;
        }

        info!("synchronization of '{}' completed", project.name);
        Ok(ProjectStatus::Synced {
            compiled: staleness.compile_required,
            copied: staleness.copy_required,
        })
    }

    async fn compile(
        &self,
        project: &FsProject,
        configuration: crate::config::Configuration,
        build_dir: &Path,
    ) -> Result<(), SyncError> {
        self.fs.create_dir_all(build_dir)?;

        let started = Instant::now();
        let args = vec![
            "build".to_string(),
            project.descriptor.to_string_lossy().into_owned(),
            "--no-dependencies".to_string(),
            "--configuration".to_string(),
            configuration.as_str().to_string(),
            "--verbosity".to_string(),
            "quiet".to_string(),
            "--output".to_string(),
            build_dir.to_string_lossy().into_owned(),
        ];

        let result = self
            .runner
            .run(&self.config.dotnet_path, &args)
            .await
            .map_err(|e| SyncError::Compile {
                project: project.name.clone(),
                output: e.to_string(),
            })?;

        if !result.success {
            return Err(SyncError::Compile {
                project: project.name.clone(),
                output: result.output,
            });
        }

        debug!(
            project = %project.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compilation finished"
        );
        Ok(())
    }

    fn deploy(
        &self,
        project: &FsProject,
        build_artifact: &Path,
        deployed_artifact: &Path,
    ) -> Result<(), SyncError> {
        if !self.fs.is_file(build_artifact) {
            return Err(SyncError::Copy {
                project: project.name.clone(),
                message: format!("build artifact {} is missing", build_artifact.display()),
            });
        }

        if let Some(assets_dir) = deployed_artifact.parent() {
            self.fs
                .create_dir_all(assets_dir)
                .map_err(|e| SyncError::Copy {
                    project: project.name.clone(),
                    message: e.to_string(),
                })?;
        }

        self.fs
            .copy(build_artifact, deployed_artifact)
            .map_err(|e| SyncError::Copy {
                project: project.name.clone(),
                message: e.to_string(),
            })?;

        debug!(project = %project.name, "artifact deployed to {}", deployed_artifact.display());
        Ok(())
    }

    /// Bootstrap a new F# class library under the host root and synchronize
    /// its references immediately.
    pub async fn create_project(
        &self,
        host_root: &Path,
        name: Option<&str>,
    ) -> Result<FsProject, SyncError> {
        let name = name.unwrap_or(DEFAULT_PROJECT_NAME);
        let project_dir = host_root.join(name);
        if self.fs.exists(&project_dir) {
            return Err(SyncError::Bootstrap {
                path: project_dir,
                reason: "directory already exists".to_string(),
            });
        }

        self.fs.create_dir_all(&project_dir)?;
        let args = vec![
            "new".to_string(),
            "classlib".to_string(),
            "--language".to_string(),
            "F#".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--output".to_string(),
            project_dir.to_string_lossy().into_owned(),
        ];
        let result = self
            .runner
            .run(&self.config.dotnet_path, &args)
            .await
            .map_err(|e| SyncError::Bootstrap {
                path: project_dir.clone(),
                reason: e.to_string(),
            })?;
        if !result.success {
            return Err(SyncError::Bootstrap {
                path: project_dir,
                reason: result.output,
            });
        }

        let descriptor = project_dir.join(format!("{}.fsproj", name));
        let project = FsProject::from_descriptor(descriptor.clone()).ok_or_else(|| {
            SyncError::Bootstrap {
                path: descriptor,
                reason: "generated descriptor path is not valid".to_string(),
            }
        })?;

        let references = extract(
            self.fs.as_ref(),
            host_root,
            &ExtractPolicy {
                reference_csharp_dll: self.config.reference_csharp_dll,
                configuration: self.config.configuration,
            },
        )?;
        write_references(
            self.fs.as_ref(),
            &project.descriptor,
            &references,
            &WritePolicy {
                reference_csharp_dll: self.config.reference_csharp_dll,
                include_additional: self.config.include_additional_references,
            },
        )?;

        info!("created F# project '{}'", project.name);
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::fs::MockFileSystem;
    use crate::runner::CommandOutput;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const HOST_CSPROJ: &str = r#"<Project>
  <ItemGroup>
    <Reference Include="UnityEngine">
      <HintPath>/unity/Managed/UnityEngine.dll</HintPath>
    </Reference>
    <Reference Include="UnityEditor">
      <HintPath>/unity/Managed/UnityEditor.dll</HintPath>
    </Reference>
    <Reference Include="Newtonsoft.Json">
      <HintPath>/unity/Packages/Newtonsoft.Json.dll</HintPath>
    </Reference>
  </ItemGroup>
</Project>"#;

    const FSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>netstandard2.1</TargetFramework>
  </PropertyGroup>
</Project>
"#;

    /// Pretends to be dotnet: on `build`, drops the expected artifact into
    /// the mock file system.
    struct ScriptedRunner {
        fs: Arc<MockFileSystem>,
        fail_on: Option<String>,
        calls: AtomicUsize,
    }

    impl ScriptedRunner {
        fn new(fs: Arc<MockFileSystem>) -> Self {
            Self {
                fs,
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_for(fs: Arc<MockFileSystem>, project: &str) -> Self {
            Self {
                fs,
                fail_on: Some(project.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, _program: &str, args: &[String]) -> anyhow::Result<CommandOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(args[0], "build");

            let descriptor = PathBuf::from(&args[1]);
            let name = descriptor.file_stem().unwrap().to_str().unwrap();
            if self.fail_on.as_deref() == Some(name) {
                return Ok(CommandOutput {
                    success: false,
                    output: "error FS0001: compile failed".to_string(),
                });
            }

            let output_dir = PathBuf::from(args.last().unwrap());
            self.fs.add_file(output_dir.join(format!("{}.dll", name)), "compiled");
            Ok(CommandOutput {
                success: true,
                output: String::new(),
            })
        }
    }

    fn unity_fs() -> Arc<MockFileSystem> {
        let fs = Arc::new(MockFileSystem::with_root(PathBuf::from("/unity")));
        fs.add_file("Assembly-CSharp.csproj", HOST_CSPROJ);
        fs.add_file("Assembly-FSharp/Assembly-FSharp.fsproj", FSPROJ);
        fs.add_file("Assembly-FSharp/Library.fs", "let answer = 42");
        fs
    }

    fn config() -> BridgeConfig {
        BridgeConfig {
            configuration: Configuration::Debug,
            reference_csharp_dll: false,
            include_additional_references: false,
            compile_timeout_secs: 300,
            dotnet_path: "dotnet".to_string(),
            watch_interval_secs: 2,
        }
    }

    fn orchestrator_with(
        fs: Arc<MockFileSystem>,
        runner: Arc<dyn CommandRunner>,
    ) -> Orchestrator {
        Orchestrator::new(fs, runner, config())
    }

    #[tokio::test]
    async fn test_full_sync_compiles_and_deploys() {
        let fs = unity_fs();
        let runner = Arc::new(ScriptedRunner::new(fs.clone()));
        let orchestrator = orchestrator_with(fs.clone(), runner.clone());

        let report = orchestrator.run(Path::new("/unity")).await.unwrap();

        assert!(!report.already_running);
        assert_eq!(report.projects.len(), 1);
        assert_eq!(
            report.projects[0].status,
            ProjectStatus::Synced {
                compiled: true,
                copied: true
            }
        );
        assert_eq!(runner.calls(), 1);
        assert!(fs.is_file(Path::new("/unity/Assets/Assembly-FSharp.dll")));

        let descriptor = fs
            .read_to_string(Path::new("/unity/Assembly-FSharp/Assembly-FSharp.fsproj"))
            .unwrap();
        assert!(descriptor.contains(r#"<ItemGroup Label="fsbridge">"#));
        assert!(descriptor.contains(r#"<Reference Include="UnityEngine">"#));
    }

    #[tokio::test]
    async fn test_fresh_project_reports_up_to_date() {
        let fs = unity_fs();
        let runner = Arc::new(ScriptedRunner::new(fs.clone()));
        let orchestrator = orchestrator_with(fs.clone(), runner.clone());

        orchestrator.run(Path::new("/unity")).await.unwrap();

        // Nothing changed since the first pass; source predates the artifact.
        fs.set_modified("Assembly-FSharp/Library.fs", MockFileSystem::time(1));
        let report = orchestrator.run(Path::new("/unity")).await.unwrap();

        assert_eq!(report.projects[0].status, ProjectStatus::UpToDate);
        assert_eq!(runner.calls(), 1);
    }

    #[tokio::test]
    async fn test_copy_without_compile_when_artifact_newer_than_deployed() {
        let fs = unity_fs();
        let runner = Arc::new(ScriptedRunner::new(fs.clone()));
        let orchestrator = orchestrator_with(fs.clone(), runner.clone());

        orchestrator.run(Path::new("/unity")).await.unwrap();

        fs.set_modified("Assembly-FSharp/Library.fs", MockFileSystem::time(1));
        fs.set_modified("Assets/Assembly-FSharp.dll", MockFileSystem::time(5));
        fs.set_modified(
            "Assembly-FSharp/bin/Debug/netstandard2.1/Assembly-FSharp.dll",
            MockFileSystem::time(10),
        );

        let report = orchestrator.run(Path::new("/unity")).await.unwrap();
        assert_eq!(
            report.projects[0].status,
            ProjectStatus::Synced {
                compiled: false,
                copied: true
            }
        );
        assert_eq!(runner.calls(), 1);
    }

    #[tokio::test]
    async fn test_continue_on_error_across_projects() {
        let fs = unity_fs();
        fs.add_file("Broken/Broken.fsproj", FSPROJ);
        fs.add_file("Broken/Bad.fs", "let oops =");
        let runner = Arc::new(ScriptedRunner::failing_for(fs.clone(), "Broken"));
        let orchestrator = orchestrator_with(fs.clone(), runner.clone());

        let report = orchestrator.run(Path::new("/unity")).await.unwrap();

        assert_eq!(report.projects.len(), 2);
        assert_eq!(report.failed_count(), 1);

        let broken = report
            .projects
            .iter()
            .find(|o| o.project == "Broken")
            .unwrap();
        assert!(matches!(
            &broken.status,
            ProjectStatus::Failed { phase, detail }
                if phase == "compile" && detail.contains("error FS0001")
        ));

        // The healthy project still compiled and deployed.
        assert!(fs.is_file(Path::new("/unity/Assets/Assembly-FSharp.dll")));
    }

    #[tokio::test]
    async fn test_no_host_descriptors_halts_run() {
        let fs = Arc::new(MockFileSystem::with_root(PathBuf::from("/unity")));
        fs.add_file("Assembly-FSharp/Assembly-FSharp.fsproj", FSPROJ);
        let runner = Arc::new(ScriptedRunner::new(fs.clone()));
        let orchestrator = orchestrator_with(fs, runner);

        let err = orchestrator.run(Path::new("/unity")).await.unwrap_err();
        assert!(matches!(err, SyncError::NoHostProjects { .. }));
    }

    #[tokio::test]
    async fn test_guard_released_after_failed_run() {
        let fs = Arc::new(MockFileSystem::with_root(PathBuf::from("/unity")));
        fs.add_file("Assembly-FSharp/Assembly-FSharp.fsproj", FSPROJ);
        let runner = Arc::new(ScriptedRunner::new(fs.clone()));
        let orchestrator = orchestrator_with(fs.clone(), runner);

        assert!(orchestrator.run(Path::new("/unity")).await.is_err());

        // A later trigger must not be treated as re-entrant.
        let report = orchestrator.run(Path::new("/unity")).await;
        assert!(matches!(report, Err(SyncError::NoHostProjects { .. })));
    }

    /// Runner that parks until released, holding the in-flight run open.
    struct ParkedRunner {
        release: Notify,
    }

    #[async_trait]
    impl CommandRunner for ParkedRunner {
        async fn run(&self, _program: &str, _args: &[String]) -> anyhow::Result<CommandOutput> {
            self.release.notified().await;
            Err(anyhow!("released without output"))
        }
    }

    #[tokio::test]
    async fn test_reentrant_trigger_is_rejected() {
        let fs = unity_fs();
        let runner = Arc::new(ParkedRunner {
            release: Notify::new(),
        });
        let orchestrator = Arc::new(Orchestrator::new(fs.clone(), runner.clone(), config()));

        let in_flight = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.run(Path::new("/unity")).await })
        };

        // Wait for the first run to reach the parked compiler call.
        tokio::task::yield_now().await;
        while !orchestrator.running.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        let second = orchestrator.run(Path::new("/unity")).await.unwrap();
        assert!(second.already_running);
        assert!(second.projects.is_empty());

        runner.release.notify_one();
        let first = in_flight.await.unwrap().unwrap();
        assert!(!first.already_running);
        assert_eq!(first.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_create_project_refuses_existing_directory() {
        let fs = unity_fs();
        let runner = Arc::new(ScriptedRunner::new(fs.clone()));
        let orchestrator = orchestrator_with(fs.clone(), runner);

        let err = orchestrator
            .create_project(Path::new("/unity"), Some("Assembly-FSharp"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Bootstrap { .. }));
    }
}
