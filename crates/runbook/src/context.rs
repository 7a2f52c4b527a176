//! Per-stack execution state

use crate::client::{RemoteStatus, StackHandle, StatusClass};
use crate::descriptor::StackDescriptor;
use crate::error::ErrorCategory;
use crate::outcome::StackOutcome;
use crate::payload::TemplateSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local lifecycle state of one stack within one command invocation.
///
/// ```text
/// Pending -> Submitting -> InProgress -> Succeeded | Failed | RolledBack | TimedOut
///                      \-> Detached (no-wait)
/// ```
/// `Cancelled` is reachable from any non-terminal state on operator
/// interrupt; `Skipped` only from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackState {
    Pending,
    Submitting,
    InProgress,
    Succeeded,
    Failed,
    RolledBack,
    TimedOut,
    Detached,
    Cancelled,
    Skipped,
    /// Stack does not exist remotely (status only)
    Absent,
}

impl StackState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            StackState::Pending | StackState::Submitting | StackState::InProgress
        )
    }

    /// Map a remote status onto the local state machine.
    pub fn from_remote(status: &RemoteStatus) -> Self {
        match status.class() {
            StatusClass::InProgress => StackState::InProgress,
            StatusClass::Complete => StackState::Succeeded,
            StatusClass::RolledBack => StackState::RolledBack,
            StatusClass::Failed => StackState::Failed,
            StatusClass::Deleted => StackState::Absent,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StackState::Pending => "pending",
            StackState::Submitting => "submitting",
            StackState::InProgress => "in progress",
            StackState::Succeeded => "succeeded",
            StackState::Failed => "failed",
            StackState::RolledBack => "rolled back",
            StackState::TimedOut => "timed out",
            StackState::Detached => "detached",
            StackState::Cancelled => "cancelled",
            StackState::Skipped => "skipped",
            StackState::Absent => "not deployed",
        }
    }
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Mutable execution state for one selected stack.
///
/// Owned by the [`RunBook`](crate::RunBook) for one command invocation and
/// mutated only by the command running against it.
#[derive(Debug, Clone)]
pub struct StackDeploymentContext {
    descriptor: StackDescriptor,
    state: StackState,
    /// Remote id, once created or looked up
    pub remote_stack_id: Option<String>,
    /// Last remote status observed
    pub remote_status: Option<RemoteStatus>,
    /// Remote update time seen alongside `remote_status`
    pub remote_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Template actually submitted (after packaging or reading from disk)
    pub resolved_template: Option<TemplateSource>,
}

impl StackDeploymentContext {
    pub fn new(descriptor: StackDescriptor) -> Self {
        Self {
            descriptor,
            state: StackState::Pending,
            remote_stack_id: None,
            remote_status: None,
            remote_updated: None,
            last_error: None,
            started_at: None,
            finished_at: None,
            resolved_template: None,
        }
    }

    pub fn descriptor(&self) -> &StackDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> StackState {
        self.state
    }

    /// `Stage.Stack` name.
    pub fn name(&self) -> String {
        self.descriptor.qualified_name()
    }

    /// Handle addressing this stack, by remote id when known.
    pub fn handle(&self) -> StackHandle {
        let mut handle = StackHandle::for_descriptor(&self.descriptor);
        if let Some(id) = &self.remote_stack_id {
            handle.id = id.clone();
        }
        handle
    }

    /// Move to a new state.
    pub fn transition(&mut self, next: StackState) {
        if self.state != next {
            log::debug!("{}: {} -> {}", self.name(), self.state, next);
            self.state = next;
        }
    }

    /// Mark the start of processing.
    pub fn begin(&mut self) {
        self.started_at = Some(Utc::now());
    }

    /// Record the final outcome.
    ///
    /// Commands usually leave the context in a terminal state already; this
    /// fills in the state for early exits and stamps `finished_at`.
    pub fn finish(&mut self, outcome: &StackOutcome) {
        let next = match outcome {
            StackOutcome::Succeeded => match self.state {
                StackState::Pending | StackState::Submitting => StackState::Succeeded,
                // Status reports remote in-progress stacks as-is
                current => current,
            },
            StackOutcome::Failed {
                category: ErrorCategory::Cancelled,
                ..
            } => StackState::Cancelled,
            StackOutcome::Failed { .. } => match self.state {
                StackState::RolledBack => StackState::RolledBack,
                _ => StackState::Failed,
            },
            StackOutcome::Skipped { .. } => StackState::Skipped,
            StackOutcome::TimedOut { .. } => StackState::TimedOut,
        };
        self.transition(next);

        if let Some(detail) = outcome.detail().filter(|_| outcome.is_failure()) {
            self.last_error = Some(detail);
        }
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration of processing, if finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}
