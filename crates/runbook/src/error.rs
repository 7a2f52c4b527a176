//! Error types for stack operations.
//!
//! Errors are categorized so the runner can decide what to retry, what to
//! report as a distinct outcome, and what aborts a batch before it starts.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Categories of stack errors.
///
/// The category travels into [`crate::StackOutcome::Failed`] so the summary
/// can label a failure without keeping the full error around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Pattern matched no stacks
    Selection,
    /// Bad option combination or precondition (checked before any mutation)
    Validation,
    /// Remote API failure (network, throttling, service error)
    RemoteCall,
    /// Stack does not exist remotely
    NotFound,
    /// Remote API reports the update would change nothing
    NoUpdates,
    /// Remote API or tooling lacks a required capability
    CapabilityUnsupported,
    /// Client gave up waiting for a terminal state
    Timeout,
    /// Template packaging/upload failed
    Packaging,
    /// Operator interrupted the run
    Cancelled,
    /// Stack reached a failed or rolled back terminal state
    StackFailed,
    /// Local IO or parse failures
    Other,
}

impl ErrorCategory {
    /// Short label used in summary tables.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Selection => "SelectionError",
            Self::Validation => "ValidationError",
            Self::RemoteCall => "RemoteCallError",
            Self::NotFound => "NotFound",
            Self::NoUpdates => "NoUpdates",
            Self::CapabilityUnsupported => "CapabilityUnsupportedError",
            Self::Timeout => "TimeoutError",
            Self::Packaging => "PackagingError",
            Self::Cancelled => "Cancelled",
            Self::StackFailed => "StackFailed",
            Self::Other => "Error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Selection => "Check the --stage/--stack patterns against the config file",
            Self::Validation => "Fix the stack configuration or command options",
            Self::RemoteCall => "Check credentials, network access and the remote error message",
            Self::NotFound => "Deploy the stack first or check its name and region",
            Self::NoUpdates => "Nothing to do - the stack already matches",
            Self::CapabilityUnsupported => "Upgrade the AWS CLI to a version that supports this call",
            Self::Timeout => "The operation may still be running; check status later",
            Self::Packaging => "Check the template path and the ArtifactStore bucket",
            Self::Cancelled => "Re-run the command to resume remaining stacks",
            Self::StackFailed => "Inspect the stack events for the failing resource",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors that can occur while selecting or operating on stacks.
#[derive(Debug, Error)]
pub enum Error {
    /// Selection patterns matched nothing
    #[error("no stack matches stage pattern '{stage}' and stack pattern '{stack}'")]
    Selection {
        /// Stage pattern given by the operator
        stage: String,
        /// Stack pattern given by the operator
        stack: String,
    },

    /// Invalid option combination or failed precondition
    #[error("validation error: {0}")]
    Validation(String),

    /// Remote API call failed
    #[error("remote call failed: {message}")]
    RemoteCall {
        /// Error text returned by the remote API
        message: String,
        /// Whether the failure is transient (throttling, connectivity)
        retryable: bool,
    },

    /// Stack does not exist
    #[error("stack {0} does not exist")]
    NotFound(String),

    /// Update submitted but nothing would change
    #[error("no updates are to be performed on {0}")]
    NoUpdates(String),

    /// Remote API or local tooling does not support a call
    #[error("{capability} is not supported: {detail}")]
    CapabilityUnsupported {
        /// Name of the missing capability
        capability: String,
        /// Remote or tooling message
        detail: String,
    },

    /// Wait for a terminal state exceeded its timeout
    #[error("gave up waiting for {stack} after {}s", .waited.as_secs())]
    Timeout {
        /// Stack being waited on
        stack: String,
        /// How long the client waited
        waited: Duration,
    },

    /// Template packaging failed
    #[error("packaging {path} failed: {message}")]
    Packaging {
        /// Local template path
        path: PathBuf,
        /// Packager message
        message: String,
    },

    /// Operator interrupted the run
    #[error("cancelled by operator")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a non-retryable remote failure.
    pub fn remote(message: impl Into<String>) -> Self {
        Error::RemoteCall {
            message: message.into(),
            retryable: false,
        }
    }

    /// Shorthand for a transient remote failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Error::RemoteCall {
            message: message.into(),
            retryable: true,
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Selection { .. } => ErrorCategory::Selection,
            Error::Validation(_) => ErrorCategory::Validation,
            Error::RemoteCall { .. } => ErrorCategory::RemoteCall,
            Error::NotFound(_) => ErrorCategory::NotFound,
            Error::NoUpdates(_) => ErrorCategory::NoUpdates,
            Error::CapabilityUnsupported { .. } => ErrorCategory::CapabilityUnsupported,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::Packaging { .. } => ErrorCategory::Packaging,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RemoteCall { retryable: true, .. })
    }
}

/// Result type for stack operations.
pub type Result<T> = std::result::Result<T, Error>;
