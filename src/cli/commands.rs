use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Keeps Unity-generated F# projects referenced, rebuilt, and deployed
#[derive(Parser, Debug)]
#[command(
    name = "fsbridge",
    about = "Keeps Unity-generated F# projects referenced, rebuilt, and deployed",
    version,
    long_about = "fsbridge mirrors library references from the Unity-generated C# project \
                  descriptors into every F# project under the host root, rebuilds projects \
                  whose sources changed, and copies fresh assemblies into Assets/."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity (debug logging)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Synchronize references and rebuild stale F# projects",
        long_about = "Mirrors Unity references into every .fsproj under the host root, \
                      compiles projects whose sources are newer than their build artifact, \
                      and deploys fresh assemblies into Assets/.\n\n\
                      Examples:\n  \
                      fsbridge sync\n  \
                      fsbridge sync /path/to/unity-project --release\n  \
                      fsbridge sync --include-additional --format json"
    )]
    Sync(SyncArgs),

    #[command(
        about = "Create a new F# class library under the host root",
        long_about = "Bootstraps an F# project via 'dotnet new classlib --language F#' and \
                      synchronizes its references immediately.\n\n\
                      Examples:\n  \
                      fsbridge create\n  \
                      fsbridge create --name Gameplay-FSharp"
    )]
    Create(CreateArgs),

    #[command(
        about = "Watch for F# source changes and resynchronize automatically",
        long_about = "Polls the host root for .fs file changes and triggers a sync pass \
                      whenever the newest source timestamp advances.\n\n\
                      Examples:\n  \
                      fsbridge watch\n  \
                      fsbridge watch /path/to/unity-project --interval 5"
    )]
    Watch(WatchArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct SyncArgs {
    #[arg(
        value_name = "PATH",
        help = "Unity project root (defaults to the current directory)"
    )]
    pub host_root: Option<PathBuf>,

    #[arg(long, help = "Compile in Release configuration instead of Debug")]
    pub release: bool,

    #[arg(long, help = "Also reference the host's compiled Assembly-CSharp.dll")]
    pub reference_csharp_dll: bool,

    #[arg(
        long,
        help = "Also mirror every non-mandatory reference the host declares"
    )]
    pub include_additional: bool,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Bound on a single dotnet build invocation"
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the run report to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct CreateArgs {
    #[arg(
        value_name = "PATH",
        help = "Unity project root (defaults to the current directory)"
    )]
    pub host_root: Option<PathBuf>,

    #[arg(long, value_name = "NAME", help = "Project name (default: Assembly-FSharp)")]
    pub name: Option<String>,

    #[arg(long, help = "Also reference the host's compiled Assembly-CSharp.dll")]
    pub reference_csharp_dll: bool,

    #[arg(
        long,
        help = "Also mirror every non-mandatory reference the host declares"
    )]
    pub include_additional: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct WatchArgs {
    #[arg(
        value_name = "PATH",
        help = "Unity project root (defaults to the current directory)"
    )]
    pub host_root: Option<PathBuf>,

    #[arg(long, help = "Compile in Release configuration instead of Debug")]
    pub release: bool,

    #[arg(long, help = "Also reference the host's compiled Assembly-CSharp.dll")]
    pub reference_csharp_dll: bool,

    #[arg(
        long,
        help = "Also mirror every non-mandatory reference the host declares"
    )]
    pub include_additional: bool,

    #[arg(long, value_name = "SECONDS", help = "Poll interval")]
    pub interval: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Human,
    Json,
}
