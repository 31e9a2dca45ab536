//! Error types for sheetpack
//!
//! All modules use `PackResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sheetpack operations
pub type PackResult<T> = Result<T, PackError>;

/// All errors that can occur in sheetpack
#[derive(Error, Debug)]
pub enum PackError {
    // Option tree / job errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid parameter sequence: {0}")]
    InvalidParameterSequence(String),

    // Configuration file errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Packer tool errors
    #[error("Packer tool not found: {program}")]
    ToolNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Packer tool failed for {sheet} (exit code {code:?}): {stderr}")]
    ToolInvocation {
        sheet: String,
        code: Option<i32>,
        stderr: String,
    },

    // Remote dispatch errors
    #[error("Transport error talking to {address}: {reason}")]
    Transport { address: String, reason: String },

    #[error("Execution service reported failure: {0}")]
    Remote(String),

    #[error("Malformed archive: {0}")]
    Archive(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    // Batch errors
    #[error("{failed} of {total} job(s) failed")]
    BatchFailed { failed: usize, total: usize },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error for the given service address
    pub fn transport(address: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if error is retryable
    ///
    /// Informational only: failed jobs are surfaced once and never retried
    /// automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ToolNotFound { .. } => {
                Some("Install TexturePacker or set packer.program in the config file")
            }
            Self::Transport { .. } => Some("Check that `sheetpack serve` is running at the address"),
            Self::BatchFailed { .. } => Some("Re-run with -v to see per-job errors"),
            Self::InvalidParameterSequence(_) => {
                Some("Every flag except known switches must be followed by a value")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PackError::BatchFailed {
            failed: 2,
            total: 5,
        };
        assert_eq!(err.to_string(), "2 of 5 job(s) failed");
    }

    #[test]
    fn error_hint() {
        let err = PackError::transport("http://localhost:3456/", "connection refused");
        assert!(err.hint().is_some());
        assert!(PackError::Internal("x".to_string()).hint().is_none());
    }

    #[test]
    fn error_retryable() {
        assert!(PackError::transport("http://a", "timeout").is_retryable());
        assert!(!PackError::Remote("tool crashed".to_string()).is_retryable());
    }
}
