//! Update an existing stack

use super::{CommandEnv, StackCommand, await_terminal, describe_existing, resolve_template, set_state};
use crate::client::WaitKind;
use crate::context::{StackDeploymentContext, StackState};
use crate::error::{Error, Result};
use crate::outcome::StackOutcome;
use crate::payload::{StackPayload, TemplateSource, UpdateFlags};
use crate::policy::CannedPolicy;
use crate::runbook::RunOptions;

/// Update a stack that must already exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateCommand {
    pub flags: UpdateFlags,
    /// Treat "no updates are to be performed" as success
    pub ignore_no_update: bool,
}

impl UpdateCommand {
    pub fn new(flags: UpdateFlags) -> Self {
        Self {
            flags,
            ignore_no_update: false,
        }
    }

    pub fn use_previous_template(mut self, yes: bool) -> Self {
        self.flags.use_previous_template = yes;
        self
    }

    pub fn override_policy(mut self, policy: Option<CannedPolicy>) -> Self {
        self.flags.override_policy = policy;
        self
    }

    pub fn ignore_no_update(mut self, yes: bool) -> Self {
        self.ignore_no_update = yes;
        self
    }

    /// Submit the update for a stack known to exist, then wait.
    pub(crate) fn apply(
        &self,
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> Result<StackOutcome> {
        let template = if self.flags.use_previous_template {
            TemplateSource::UsePrevious
        } else if let Some(resolved) = ctx.resolved_template.clone() {
            resolved
        } else {
            resolve_template(ctx, env)?
        };
        let payload = StackPayload::for_update(ctx.descriptor(), &template, self.flags);
        if let Some(policy) = self.flags.override_policy {
            env.observer.on_message(
                &ctx.name(),
                &format!("overriding stack policy with {policy} during this update"),
            );
        }

        set_state(ctx, env, StackState::Submitting);
        let handle = ctx.handle();
        log::debug!("update {handle}");
        let submitted = match env.client.update(&handle, &payload) {
            Ok(()) => true,
            Err(Error::NoUpdates(_)) if self.ignore_no_update => {
                env.observer.on_message(&ctx.name(), "no updates to perform");
                false
            }
            Err(e) => return Err(e),
        };

        // Applied after the update call; a failure here does not undo it
        if let Some(enabled) = ctx.descriptor().termination_protection {
            env.observer.on_message(
                &ctx.name(),
                &format!("setting termination protection to {enabled}"),
            );
            env.client.set_termination_protection(&handle, enabled)?;
        }

        if !submitted {
            set_state(ctx, env, StackState::Succeeded);
            return Ok(StackOutcome::Succeeded);
        }
        await_terminal(ctx, env, options, WaitKind::Updated)
    }
}

impl StackCommand for UpdateCommand {
    fn name(&self) -> &'static str {
        "update"
    }

    fn run(
        &self,
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> Result<StackOutcome> {
        ctx.descriptor().validate()?;
        if describe_existing(ctx, env, options)?.is_none() {
            return Err(Error::Validation(format!(
                "stack {} does not exist; deploy it first",
                ctx.name()
            )));
        }
        self.apply(ctx, env, options)
    }
}
