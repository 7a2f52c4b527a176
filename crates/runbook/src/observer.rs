//! Progress and confirmation callbacks
//!
//! These traits keep the runner free of terminal output; the binary plugs in
//! colored lines and spinners, tests plug in recorders.

use crate::client::{RemoteStack, StackEvent};
use crate::context::{StackDeploymentContext, StackState};
use crate::diff::StackDiff;
use crate::error::Result;
use crate::outcome::StackOutcome;

/// Receives progress notifications during a batch.
///
/// Called from worker threads when `jobs > 1` and from the event tailer
/// thread, hence `&self` and `Sync`. Every method defaults to a no-op.
pub trait RunObserver: Send + Sync {
    /// Called once before the first stack is processed
    fn on_batch_start(&self, _command: &str, _count: usize) {}

    /// Called when a stack starts processing
    fn on_stack_start(&self, _ctx: &StackDeploymentContext) {}

    /// Called on every local state transition
    fn on_state_change(&self, _stack: &str, _state: StackState) {}

    /// Free-form progress note (packaging, skipped steps)
    fn on_message(&self, _stack: &str, _message: &str) {}

    /// Called for each remote lifecycle event seen by the tailer
    fn on_event(&self, _stack: &str, _event: &StackEvent) {}

    /// Called by sync when it detects drift
    fn on_diff(&self, _stack: &str, _diff: &StackDiff) {}

    /// Called by status with the described stack
    fn on_remote_stack(&self, _stack: &str, _remote: &RemoteStack) {}

    /// Called when a stack finishes, skipped stacks included
    fn on_stack_complete(&self, _ctx: &StackDeploymentContext, _outcome: &StackOutcome) {}
}

/// Confirmation callback for operator interaction
pub trait ConfirmCallback: Send + Sync {
    /// Ask the operator to confirm an action
    ///
    /// # Returns
    /// `true` if confirmed, `false` otherwise
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// No-op observer
pub struct NoObserver;

impl RunObserver for NoObserver {}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
