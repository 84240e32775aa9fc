//! External command collaborator.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    /// stdout followed by stderr, captured in full.
    pub output: String,
}

/// Blocking-from-the-caller's-view subprocess execution. The orchestrator
/// waits for the child to exit before moving on.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs real processes with a bounded wait; expiry surfaces as an error so a
/// hung compiler cannot stall a run forever.
pub struct SystemCommandRunner {
    timeout: Duration,
}

impl SystemCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!(program, ?args, "running external command");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                anyhow!(
                    "'{}' did not finish within {} seconds",
                    program,
                    self.timeout.as_secs()
                )
            })?
            .context(format!("Failed to run '{}'", program))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            output: combined,
        })
    }
}

/// Availability probe for the external toolchain (`dotnet --version`).
pub async fn probe(runner: &dyn CommandRunner, program: &str) -> bool {
    match runner.run(program, &["--version".to_string()]).await {
        Ok(output) => output.success,
        Err(_) => false,
    }
}
