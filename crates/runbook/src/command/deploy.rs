//! Create a stack, or update it if it already exists

use super::{CommandEnv, StackCommand, UpdateCommand, await_terminal, describe_existing, resolve_template, set_state};
use crate::client::WaitKind;
use crate::context::{StackDeploymentContext, StackState};
use crate::error::{Error, Result};
use crate::outcome::StackOutcome;
use crate::payload::StackPayload;
use crate::runbook::RunOptions;

/// Deploy a stack: create when absent, update in place when present.
///
/// On the update path "no updates" counts as success.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployCommand;

impl DeployCommand {
    pub fn new() -> Self {
        Self
    }

    /// Create a stack known to be absent, then wait.
    pub(crate) fn create(
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> Result<StackOutcome> {
        let template = resolve_template(ctx, env)?;
        let payload = StackPayload::for_create(ctx.descriptor(), &template);

        set_state(ctx, env, StackState::Submitting);
        let handle = ctx.handle();
        log::debug!("create {handle}");
        let stack_id = env.client.create(&handle, &payload)?;
        log::info!("{}: created {stack_id}", ctx.name());
        ctx.remote_stack_id = Some(stack_id);

        await_terminal(ctx, env, options, WaitKind::Created)
    }
}

impl StackCommand for DeployCommand {
    fn name(&self) -> &'static str {
        "deploy"
    }

    fn run(
        &self,
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> Result<StackOutcome> {
        ctx.descriptor().validate()?;
        match describe_existing(ctx, env, options)? {
            None => Self::create(ctx, env, options),
            Some(remote) if remote.status.as_str() == "ROLLBACK_COMPLETE" => {
                Err(Error::Validation(format!(
                    "stack {} is in ROLLBACK_COMPLETE and cannot be updated; delete it first",
                    ctx.name()
                )))
            }
            Some(_) => UpdateCommand::default()
                .ignore_no_update(true)
                .apply(ctx, env, options),
        }
    }
}
