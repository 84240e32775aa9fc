//! fsbridge - reference synchronization and incremental rebuilds for
//! Unity-hosted F# projects
//!
//! Unity regenerates C# project descriptors (`*.csproj`) that carry the full
//! set of library references the host compiles against. F# projects living in
//! the same tree need the same references to compile against the Unity
//! runtime, but nothing maintains them. fsbridge closes that gap:
//!
//! - **Extraction**: scans the host's `.csproj` descriptors and classifies
//!   every declared reference (mandatory `UnityEngine`/`UnityEditor` pair,
//!   optional `Assembly-CSharp`, everything else)
//! - **Injection**: rewrites each `.fsproj`'s generated reference groups
//!   idempotently, leaving hand-authored content untouched
//! - **Staleness**: compares source timestamps against build and deployed
//!   artifacts to decide whether to compile and/or redeploy
//! - **Orchestration**: runs `dotnet build` only when required and copies
//!   fresh assemblies into the host's `Assets/` directory
//!
//! # Example Usage
//!
//! ```ignore
//! use fsbridge::{BridgeConfig, Orchestrator, RealFileSystem, SystemCommandRunner};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! async fn sync(host_root: &Path) -> Result<(), fsbridge::SyncError> {
//!     let config = BridgeConfig::default();
//!     let runner = SystemCommandRunner::new(config.compile_timeout());
//!     let orchestrator =
//!         Orchestrator::new(Arc::new(RealFileSystem::new()), Arc::new(runner), config);
//!
//!     let report = orchestrator.run(host_root).await?;
//!     println!("{} project(s) failed", report.failed_count());
//!     Ok(())
//! }
//! ```

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod orchestrator;
pub mod project;
pub mod references;
pub mod runner;
pub mod staleness;
pub mod watch;

// Re-export key types for convenient access
pub use config::{BridgeConfig, ConfigError, Configuration};
pub use error::SyncError;
pub use fs::{FileSystem, MockFileSystem, RealFileSystem};
pub use orchestrator::{Orchestrator, ProjectOutcome, ProjectStatus, SyncReport};
pub use project::FsProject;
pub use references::{extract, write_references, Reference, ReferenceContainer};
pub use runner::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use staleness::{assess, Staleness};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
