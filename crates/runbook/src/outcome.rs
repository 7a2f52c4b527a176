//! Per-stack outcomes and batch summaries

use crate::error::{Error, ErrorCategory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Final result of running a command against one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackOutcome {
    /// Command completed (or was submitted, with `--no-wait`)
    Succeeded,
    /// Command failed
    Failed {
        category: ErrorCategory,
        reason: String,
    },
    /// Stack was never processed
    Skipped { reason: String },
    /// Client stopped waiting; the remote operation may still be running
    TimedOut { waited: Duration },
}

impl StackOutcome {
    pub fn failed(category: ErrorCategory, reason: impl Into<String>) -> Self {
        StackOutcome::Failed {
            category,
            reason: reason.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        StackOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StackOutcome::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StackOutcome::Failed { .. })
    }

    /// Short label for summary tables.
    pub fn label(&self) -> &'static str {
        match self {
            StackOutcome::Succeeded => "Succeeded",
            StackOutcome::Failed { .. } => "Failed",
            StackOutcome::Skipped { .. } => "Skipped",
            StackOutcome::TimedOut { .. } => "TimedOut",
        }
    }

    /// Extra detail for summary tables.
    pub fn detail(&self) -> Option<String> {
        match self {
            StackOutcome::Succeeded => None,
            StackOutcome::Failed { category, reason } => Some(format!("{category}: {reason}")),
            StackOutcome::Skipped { reason } => Some(reason.clone()),
            StackOutcome::TimedOut { waited } => {
                Some(format!("gave up after {}s, still running remotely", waited.as_secs()))
            }
        }
    }
}

impl From<&Error> for StackOutcome {
    fn from(error: &Error) -> Self {
        match error {
            Error::Timeout { waited, .. } => StackOutcome::TimedOut { waited: *waited },
            other => StackOutcome::failed(other.category(), other.to_string()),
        }
    }
}

impl fmt::Display for StackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{} ({detail})", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

/// Counts of outcomes across a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub timed_out: usize,
}

impl BatchSummary {
    /// Add an outcome to the summary
    pub fn add(&mut self, outcome: &StackOutcome) {
        match outcome {
            StackOutcome::Succeeded => self.succeeded += 1,
            StackOutcome::Failed { .. } => self.failed += 1,
            StackOutcome::Skipped { .. } => self.skipped += 1,
            StackOutcome::TimedOut { .. } => self.timed_out += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped + self.timed_out
    }

    /// Whether every processed stack succeeded
    pub fn is_success(&self) -> bool {
        self.succeeded == self.total()
    }

    /// Process exit code: 0 iff every stack succeeded.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}
