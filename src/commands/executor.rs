//! Command Executor
//!
//! Runs a command queue one invocation at a time. The first fatal exit aborts
//! the rest of the queue; commands already run are not rolled back.

use super::Command;
use crate::domain::ports::{RingBuilderToolRef, ToolOutcome};
use crate::error::{Error, Result};
use tracing::{debug, error, info, warn};

/// Executor configuration
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Only report what would run
    pub dry_run: bool,
}

/// What happened to a command queue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// Rendered command lines, in queue order
    pub planned: Vec<String>,
    /// Commands that ran, successfully or with a warning
    pub executed: usize,
    /// Commands that exited with a warning
    pub warnings: Vec<String>,
}

/// Runs ring builder commands through the tool port
pub struct CommandExecutor {
    tool: RingBuilderToolRef,
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(tool: RingBuilderToolRef, config: ExecutorConfig) -> Self {
        Self { tool, config }
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    pub async fn execute(&self, commands: &[Command]) -> Result<ExecutionReport> {
        let mut report = ExecutionReport {
            planned: commands.iter().map(|c| c.render(self.tool.tool_name())).collect(),
            ..Default::default()
        };

        if self.config.dry_run {
            info!("Dry run: {} commands not executed", commands.len());
            return Ok(report);
        }

        for (index, command) in commands.iter().enumerate() {
            if command.name() == "create" {
                if let Some(dir) = command.builder.parent() {
                    tokio::fs::create_dir_all(dir).await?;
                }
            }

            debug!("Running {}", report.planned[index]);
            let output = self.tool.run(&command.builder, &command.args).await?;

            match output.outcome() {
                Some(ToolOutcome::Success) => {}
                Some(ToolOutcome::Warning) => {
                    warn!("{} finished with a warning: {}", report.planned[index], output.stderr.trim());
                    report.warnings.push(report.planned[index].clone());
                }
                None => {
                    error!(
                        "{} failed with exit code {}; aborting {} remaining commands",
                        report.planned[index],
                        output.exit_code,
                        commands.len() - index - 1
                    );
                    return Err(Error::RingBuilderExit {
                        builder: command.builder.display().to_string(),
                        command: command.name().to_string(),
                        code: output.exit_code,
                    });
                }
            }
            report.executed += 1;
        }

        info!(
            "Executed {} commands ({} warnings)",
            report.executed,
            report.warnings.len()
        );
        Ok(report)
    }
}
