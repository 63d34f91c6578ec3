//! Domain Ports - boundaries between reconciliation and the outside world
//!
//! The ring builder binary and the source of actual ring state sit behind
//! these traits so the reconciliation algorithm never touches a process or
//! a text format directly.

use crate::error::Result;
use crate::model::{Device, RingKey, RingSpec};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Exit code the ring builder uses for warnings
pub const TOOL_WARNING_EXIT: i32 = 1;

/// Internal code a warning exit is mapped to
pub const TOOL_WARNING_CODE: i32 = -1;

// =============================================================================
// Ring Builder Tool Output
// =============================================================================

/// Captured result of one ring builder invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Raw process exit code
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Exit code with warnings mapped to [`TOOL_WARNING_CODE`]
    pub fn code(&self) -> i32 {
        if self.exit_code == TOOL_WARNING_EXIT {
            TOOL_WARNING_CODE
        } else {
            self.exit_code
        }
    }

    /// Classify the exit; `None` for a fatal failure
    pub fn outcome(&self) -> Option<ToolOutcome> {
        match self.code() {
            0 => Some(ToolOutcome::Success),
            TOOL_WARNING_CODE => Some(ToolOutcome::Warning),
            _ => None,
        }
    }
}

/// Non-fatal outcome of a ring builder invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    Success,
    Warning,
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolOutcome::Success => write!(f, "ok"),
            ToolOutcome::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Ring Builder Tool Port
// =============================================================================

/// Port for invoking the external ring builder
#[async_trait]
pub trait RingBuilderTool: Send + Sync {
    /// Run the tool against a builder file with the given arguments
    ///
    /// Errors only when the process cannot be run at all; exit codes are
    /// reported in the output.
    async fn run(&self, builder: &Path, args: &[String]) -> Result<ToolOutput>;

    /// Name used in logs
    fn tool_name(&self) -> &str;
}

// =============================================================================
// Actual State Port
// =============================================================================

/// Rings and devices as currently recorded in the builder files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActualState {
    pub rings: BTreeMap<RingKey, RingSpec>,
    pub devices: Vec<Device>,
}

impl ActualState {
    pub fn ring(&self, key: &RingKey) -> Option<&RingSpec> {
        self.rings.get(key)
    }
}

/// Port for reading the actual ring state
#[async_trait]
pub trait ActualStateReader: Send + Sync {
    /// Read every ring; any failure invalidates the whole read
    async fn read(&self) -> Result<ActualState>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type RingBuilderToolRef = Arc<dyn RingBuilderTool>;
