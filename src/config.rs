//! Runtime configuration for synchronization runs.
//!
//! All behavior toggles live in [`BridgeConfig`] and are passed explicitly
//! into the orchestrator; nothing reads process-wide state after startup.
//! Environment variables provide defaults, CLI flags override them.

use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 2;
const DEFAULT_DOTNET_PATH: &str = "dotnet";

/// Build configuration passed through to `dotnet build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Configuration {
    Debug,
    Release,
}

impl Configuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Configuration::Debug => "Debug",
            Configuration::Release => "Release",
        }
    }

    pub fn from_release_flag(release: bool) -> Self {
        if release {
            Configuration::Release
        } else {
            Configuration::Debug
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Policy for one synchronization run.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Build configuration (`Debug` unless release mode is requested).
    pub configuration: Configuration,
    /// Mirror a reference to the host's compiled `Assembly-CSharp.dll`.
    pub reference_csharp_dll: bool,
    /// Mirror every non-mandatory reference the host declares.
    pub include_additional_references: bool,
    /// Bound on a single `dotnet build` invocation.
    pub compile_timeout_secs: u64,
    /// Program name or full path of the dotnet CLI.
    pub dotnet_path: String,
    /// Poll interval for `fsbridge watch`.
    pub watch_interval_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let release = env_bool("FSBRIDGE_RELEASE").unwrap_or(false);

        let reference_csharp_dll = env_bool("FSBRIDGE_REFERENCE_CSHARP_DLL").unwrap_or(false);

        let include_additional_references =
            env_bool("FSBRIDGE_INCLUDE_ADDITIONAL_REFERENCES").unwrap_or(false);

        let compile_timeout_secs = env::var("FSBRIDGE_COMPILE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_COMPILE_TIMEOUT_SECS);

        let dotnet_path =
            env::var("FSBRIDGE_DOTNET_PATH").unwrap_or_else(|_| DEFAULT_DOTNET_PATH.to_string());

        let watch_interval_secs = env::var("FSBRIDGE_WATCH_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_WATCH_INTERVAL_SECS);

        Self {
            configuration: Configuration::from_release_flag(release),
            reference_csharp_dll,
            include_additional_references,
            compile_timeout_secs,
            dotnet_path,
            watch_interval_secs,
        }
    }
}

impl BridgeConfig {
    /// Environment-derived configuration, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compile_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "compile_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.watch_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "watch_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.dotnet_path.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "dotnet_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| v.parse::<bool>().ok())
}
