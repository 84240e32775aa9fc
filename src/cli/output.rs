//! Rendering of run reports for humans and machines.

use super::commands::OutputFormatArg;
use crate::orchestrator::{ProjectStatus, SyncReport};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
    output_path: Option<PathBuf>,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, output_path: Option<PathBuf>) -> Self {
        Self {
            format,
            output_path,
        }
    }

    pub fn render(&self, report: &SyncReport) -> Result<String> {
        match self.format {
            OutputFormat::Human => Ok(render_human(report)),
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).context("Failed to serialize run report")
            }
        }
    }

    /// Write the rendered report to the configured file, or stdout.
    pub fn emit(&self, report: &SyncReport) -> Result<()> {
        let rendered = self.render(report)?;
        match &self.output_path {
            Some(path) => fs::write(path, rendered.as_bytes())
                .context(format!("Failed to write report to {:?}", path)),
            None => {
                println!("{}", rendered);
                Ok(())
            }
        }
    }
}

fn render_human(report: &SyncReport) -> String {
    if report.already_running {
        return "sync already in progress, nothing done".to_string();
    }
    if report.projects.is_empty() {
        return "no F# projects found".to_string();
    }

    let mut lines = Vec::with_capacity(report.projects.len() + 1);
    for outcome in &report.projects {
        let line = match &outcome.status {
            ProjectStatus::Synced { compiled, copied } => {
                let action = match (compiled, copied) {
                    (true, _) => "compiled and deployed",
                    (false, true) => "deployed",
                    (false, false) => "synchronized",
                };
                format!("  {}: {}", outcome.project, action)
            }
            ProjectStatus::UpToDate => format!("  {}: up-to-date", outcome.project),
            ProjectStatus::Failed { phase, detail } => {
                format!("  {}: FAILED ({})\n{}", outcome.project, phase, indent(detail))
            }
        };
        lines.push(line);
    }

    let failed = report.failed_count();
    let summary = if failed == 0 {
        format!("{} project(s) synchronized", report.projects.len())
    } else {
        format!(
            "{} project(s) synchronized, {} failed",
            report.projects.len() - failed,
            failed
        )
    };
    lines.push(summary);

    lines.join("\n")
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}
