//! Report the remote status of a stack

use super::{CommandEnv, StackCommand, describe_existing, set_state};
use crate::context::{StackDeploymentContext, StackState};
use crate::error::Result;
use crate::outcome::StackOutcome;
use crate::runbook::RunOptions;

/// One describe call per stack, no polling.
///
/// A missing stack is reported as not deployed rather than as a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCommand {
    /// Hand stack outputs to the observer as well
    pub show_outputs: bool,
}

impl StatusCommand {
    pub fn new(show_outputs: bool) -> Self {
        Self { show_outputs }
    }
}

impl StackCommand for StatusCommand {
    fn name(&self) -> &'static str {
        "status"
    }

    fn run(
        &self,
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> Result<StackOutcome> {
        match describe_existing(ctx, env, options)? {
            Some(mut remote) => {
                set_state(ctx, env, StackState::from_remote(&remote.status));
                if !self.show_outputs {
                    remote.outputs.clear();
                }
                env.observer.on_remote_stack(&ctx.name(), &remote);
            }
            None => set_state(ctx, env, StackState::Absent),
        }
        Ok(StackOutcome::Succeeded)
    }
}
