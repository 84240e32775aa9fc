pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, CreateArgs, SyncArgs, WatchArgs};
pub use output::{OutputFormat, OutputFormatter};
