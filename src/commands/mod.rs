//! Ring builder commands
//!
//! Translates a delta into ordered `swift-ring-builder` invocations and runs
//! them, either for real or as a dry run.

pub mod emitter;
pub mod executor;

pub use emitter::*;
pub use executor::*;

use std::fmt;
use std::path::PathBuf;

/// One ring builder invocation against one builder file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub builder: PathBuf,
    pub args: Vec<String>,
}

impl Command {
    pub fn new<I, S>(builder: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            builder: builder.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Subcommand name (`create`, `add`, `rebalance`, ...)
    pub fn name(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("list")
    }

    /// Full command line as it would be typed
    pub fn render(&self, tool: &str) -> String {
        format!("{} {}", tool, self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.builder.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
