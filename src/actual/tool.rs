//! swift-ring-builder process adapter

use crate::domain::ports::{RingBuilderTool, ToolOutput};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Default ring builder executable
pub const DEFAULT_RING_BUILDER: &str = "swift-ring-builder";

/// Configuration for the ring builder adapter
#[derive(Debug, Clone)]
pub struct RingBuilderConfig {
    /// Executable to run
    pub binary: PathBuf,
}

impl Default for RingBuilderConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_RING_BUILDER),
        }
    }
}

/// Runs the real `swift-ring-builder`
pub struct SwiftRingBuilder {
    config: RingBuilderConfig,
}

impl SwiftRingBuilder {
    pub fn new(config: RingBuilderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RingBuilderTool for SwiftRingBuilder {
    async fn run(&self, builder: &Path, args: &[String]) -> Result<ToolOutput> {
        debug!("Running {:?} {:?} {:?}", self.config.binary, builder, args);

        let output = Command::new(&self.config.binary)
            .arg(builder)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::RingBuilder {
                builder: builder.display().to_string(),
                command: args.first().cloned().unwrap_or_else(|| "list".into()),
                reason: e.to_string(),
            })?;

        Ok(ToolOutput {
            // killed by a signal: no code, treat as fatal
            exit_code: output.status.code().unwrap_or(i32::MAX),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn tool_name(&self) -> &str {
        DEFAULT_RING_BUILDER
    }
}
