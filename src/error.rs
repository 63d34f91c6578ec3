//! Error types for the Swift ring reconciler
//!
//! Provides structured error types for model loading, actual-state reading,
//! reconciliation, command execution and delta persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the reconciler
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Model Errors
    // =========================================================================
    /// One or more validation failures, reported together
    #[error("Model error(s):\n  {}", .0.join("\n  "))]
    Model(Vec<String>),

    #[error("Conflicting ring actions for {ring} in region {region}: {reason}")]
    RingActionConflict {
        region: String,
        ring: String,
        reason: String,
    },

    // =========================================================================
    // Ring Builder Errors
    // =========================================================================
    #[error("swift-ring-builder {command} failed on {builder}: {reason}")]
    RingBuilder {
        builder: String,
        command: String,
        reason: String,
    },

    #[error("swift-ring-builder {command} exited with code {code} on {builder}")]
    RingBuilderExit {
        builder: String,
        command: String,
        code: i32,
    },

    #[error("Unable to parse ring builder output for {builder}: {reason}")]
    RingBuilderParse { builder: String, reason: String },

    // =========================================================================
    // File Errors
    // =========================================================================
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a model error from a single message
    pub fn model(message: impl Into<String>) -> Self {
        Error::Model(vec![message.into()])
    }

    /// Attach a path to an IO error raised while reading a file
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is a model validation failure
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            Error::Model(_) | Error::RingActionConflict { .. }
        )
    }

    /// Check if this error came from the external ring tool
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Error::RingBuilder { .. } | Error::RingBuilderExit { .. } | Error::RingBuilderParse { .. }
        )
    }

    /// Messages carried by this error, one per validation failure
    pub fn messages(&self) -> Vec<String> {
        match self {
            Error::Model(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Result type alias for the reconciler
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_lists_every_message() {
        let err = Error::Model(vec![
            "ring object-0 missing in region r1".into(),
            "rack 7 not in any zone".into(),
        ]);
        let text = err.to_string();
        assert!(text.contains("ring object-0 missing in region r1"));
        assert!(text.contains("rack 7 not in any zone"));
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn test_error_classification() {
        let model = Error::model("bad");
        assert!(model.is_model_error());
        assert!(!model.is_tool_failure());

        let tool = Error::RingBuilderExit {
            builder: "object-0.builder".into(),
            command: "rebalance".into(),
            code: 2,
        };
        assert!(tool.is_tool_failure());
        assert!(!tool.is_model_error());

        let conflict = Error::RingActionConflict {
            region: "r1".into(),
            ring: "object-0".into(),
            reason: "add with remove".into(),
        };
        assert!(conflict.is_model_error());
        assert!(!Error::Configuration("x".into()).is_model_error());
        assert_eq!(tool.messages().len(), 1);
    }
}
