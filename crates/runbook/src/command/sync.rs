//! Bring a stack in line with its descriptor, only when it drifted

use super::{CommandEnv, DeployCommand, StackCommand, UpdateCommand, describe_existing, resolve_template, set_state};
use crate::context::{StackDeploymentContext, StackState};
use crate::diff::StackDiff;
use crate::error::{Error, Result};
use crate::outcome::StackOutcome;
use crate::payload::{TemplateSource, UpdateFlags};
use crate::retry::with_retry;
use crate::runbook::RunOptions;

/// Create a missing stack; otherwise diff, confirm and update.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncCommand {
    /// Keep the deployed template; only parameters are compared
    pub use_previous_template: bool,
}

impl SyncCommand {
    pub fn new(use_previous_template: bool) -> Self {
        Self {
            use_previous_template,
        }
    }
}

impl StackCommand for SyncCommand {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn run(
        &self,
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> Result<StackOutcome> {
        ctx.descriptor().validate()?;
        let Some(remote) = describe_existing(ctx, env, options)? else {
            env.observer
                .on_message(&ctx.name(), "stack does not exist, creating");
            return DeployCommand::create(ctx, env, options);
        };
        if remote.status.as_str() == "ROLLBACK_COMPLETE" {
            return Err(Error::Validation(format!(
                "stack {} is in ROLLBACK_COMPLETE and cannot be updated; delete it first",
                ctx.name()
            )));
        }

        let handle = ctx.handle();
        let deployed = with_retry(&options.wait.retry, env.cancel, "get-template", || {
            env.client.fetch_template(&handle)
        })?;
        let desired = if self.use_previous_template {
            None
        } else {
            match resolve_template(ctx, env)? {
                TemplateSource::Body(body) => Some(body),
                TemplateSource::Url(_) | TemplateSource::UsePrevious => None,
            }
        };

        let diff = StackDiff::compute(
            &deployed,
            desired.as_deref(),
            self.use_previous_template,
            &remote.parameters,
            &ctx.descriptor().parameters,
        );
        if diff.is_empty() {
            env.observer.on_message(&ctx.name(), "no changes");
            set_state(ctx, env, StackState::Succeeded);
            return Ok(StackOutcome::Succeeded);
        }

        env.observer.on_diff(&ctx.name(), &diff);
        if !env.confirm.confirm(&format!("Apply changes to {}?", ctx.name()))? {
            return Ok(StackOutcome::skipped("changes not confirmed"));
        }

        UpdateCommand::new(UpdateFlags {
            use_previous_template: self.use_previous_template,
            override_policy: None,
        })
        .ignore_no_update(true)
        .apply(ctx, env, options)
    }
}
