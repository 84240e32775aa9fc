use fsbridge::cli::commands::{CliArgs, Commands, CreateArgs, SyncArgs, WatchArgs};
use fsbridge::cli::output::{OutputFormat, OutputFormatter};
use fsbridge::{
    BridgeConfig, Configuration, Orchestrator, RealFileSystem, SystemCommandRunner, VERSION,
};

use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("fsbridge v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Sync(sync_args) => handle_sync(sync_args).await,
        Commands::Create(create_args) => handle_create(create_args).await,
        Commands::Watch(watch_args) => handle_watch(watch_args).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = if let Some(level_str) = &args.log_level {
            parse_level(level_str)
        } else if args.verbose {
            Level::DEBUG
        } else if args.quiet {
            Level::ERROR
        } else {
            let level_str = env::var("FSBRIDGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            filter = filter.add_directive(format!("fsbridge={}", level).parse().unwrap());
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn resolve_host_root(host_root: &Option<PathBuf>) -> Option<PathBuf> {
    let path = host_root
        .clone()
        .unwrap_or_else(|| env::current_dir().expect("Failed to get current directory"));

    if !path.exists() {
        error!("Host root does not exist: {}", path.display());
        return None;
    }
    if !path.is_dir() {
        error!("Host root is not a directory: {}", path.display());
        return None;
    }

    match path.canonicalize() {
        Ok(path) => Some(path),
        Err(e) => {
            error!("Failed to canonicalize host root: {}", e);
            None
        }
    }
}

fn load_config(
    release: bool,
    reference_csharp_dll: bool,
    include_additional: bool,
    timeout: Option<u64>,
    interval: Option<u64>,
) -> Option<BridgeConfig> {
    let mut config = BridgeConfig::default();
    if release {
        config.configuration = Configuration::Release;
    }
    config.reference_csharp_dll |= reference_csharp_dll;
    config.include_additional_references |= include_additional;
    if let Some(timeout) = timeout {
        config.compile_timeout_secs = timeout;
    }
    if let Some(interval) = interval {
        config.watch_interval_secs = interval;
    }

    match config.validate() {
        Ok(()) => Some(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            None
        }
    }
}

async fn build_orchestrator(config: BridgeConfig) -> Option<Orchestrator> {
    let runner = Arc::new(SystemCommandRunner::new(config.compile_timeout()));

    if !fsbridge::runner::probe(runner.as_ref(), &config.dotnet_path).await {
        error!(
            "'{}' was not found. Please install the .NET SDK and ensure it is available from a terminal",
            config.dotnet_path
        );
        return None;
    }

    Some(Orchestrator::new(
        Arc::new(RealFileSystem::new()),
        runner,
        config,
    ))
}

async fn handle_sync(args: &SyncArgs) -> i32 {
    let Some(host_root) = resolve_host_root(&args.host_root) else {
        return 1;
    };
    let Some(config) = load_config(
        args.release,
        args.reference_csharp_dll,
        args.include_additional,
        args.timeout,
        None,
    ) else {
        return 1;
    };
    let Some(orchestrator) = build_orchestrator(config).await else {
        return 1;
    };

    let report = match orchestrator.run(&host_root).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let formatter = OutputFormatter::new(OutputFormat::from(args.format), args.output.clone());
    if let Err(e) = formatter.emit(&report) {
        error!("{}", e);
        return 1;
    }

    if report.failed_count() > 0 {
        1
    } else {
        0
    }
}

async fn handle_create(args: &CreateArgs) -> i32 {
    let Some(host_root) = resolve_host_root(&args.host_root) else {
        return 1;
    };
    let Some(config) = load_config(
        false,
        args.reference_csharp_dll,
        args.include_additional,
        None,
        None,
    ) else {
        return 1;
    };
    let Some(orchestrator) = build_orchestrator(config).await else {
        return 1;
    };

    match orchestrator
        .create_project(&host_root, args.name.as_deref())
        .await
    {
        Ok(project) => {
            println!("created {}", project.descriptor.display());
            0
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}

async fn handle_watch(args: &WatchArgs) -> i32 {
    let Some(host_root) = resolve_host_root(&args.host_root) else {
        return 1;
    };
    let Some(config) = load_config(
        args.release,
        args.reference_csharp_dll,
        args.include_additional,
        None,
        args.interval,
    ) else {
        return 1;
    };
    let interval = config.watch_interval();
    let Some(orchestrator) = build_orchestrator(config).await else {
        return 1;
    };

    let fs = RealFileSystem::new();
    match fsbridge::watch::watch(&orchestrator, &fs, &host_root, interval).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}
