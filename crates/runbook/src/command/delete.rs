//! Delete a stack

use super::{CommandEnv, StackCommand, await_terminal, describe_existing, set_state};
use crate::client::WaitKind;
use crate::context::{StackDeploymentContext, StackState};
use crate::error::{Error, Result};
use crate::outcome::StackOutcome;
use crate::runbook::RunOptions;

/// Delete a stack and wait until it is gone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteCommand {
    /// Treat an already-missing stack as deleted
    pub ignore_missing: bool,
}

impl DeleteCommand {
    pub fn new(ignore_missing: bool) -> Self {
        Self { ignore_missing }
    }
}

impl StackCommand for DeleteCommand {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn run(
        &self,
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> Result<StackOutcome> {
        if describe_existing(ctx, env, options)?.is_none() {
            if self.ignore_missing {
                env.observer.on_message(&ctx.name(), "already deleted");
                set_state(ctx, env, StackState::Absent);
                return Ok(StackOutcome::Succeeded);
            }
            return Err(Error::Validation(format!(
                "stack {} does not exist",
                ctx.name()
            )));
        }

        set_state(ctx, env, StackState::Submitting);
        let handle = ctx.handle();
        log::debug!("delete {handle}");
        env.client.delete(&handle)?;

        await_terminal(ctx, env, options, WaitKind::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::testing::{Call, FakeClient, descriptor, run_one};

    #[test]
    fn test_delete_existing_stack() {
        let client = FakeClient::new().with_stack("Network", "CREATE_COMPLETE");
        let (ctx, outcome) = run_one(&client, &DeleteCommand::default(), descriptor("Network"));

        assert_eq!(outcome, StackOutcome::Succeeded);
        assert_eq!(ctx.state(), StackState::Succeeded);
        assert!(client.calls().contains(&Call::Delete("Network".into())));
    }

    #[test]
    fn test_delete_missing_stack() {
        let client = FakeClient::new();
        let (_, outcome) = run_one(&client, &DeleteCommand::default(), descriptor("Network"));
        assert!(matches!(
            outcome,
            StackOutcome::Failed {
                category: ErrorCategory::Validation,
                ..
            }
        ));

        let (ctx, outcome) = run_one(&client, &DeleteCommand::new(true), descriptor("Network"));
        assert_eq!(outcome, StackOutcome::Succeeded);
        assert_eq!(ctx.state(), StackState::Absent);
        assert_eq!(client.mutation_count(), 0);
    }

    #[test]
    fn test_delete_failed_state() {
        let client = FakeClient::new().with_stack("Network", "CREATE_COMPLETE");
        client.finish_with("Network", "DELETE_FAILED");
        let (ctx, outcome) = run_one(&client, &DeleteCommand::default(), descriptor("Network"));

        assert_eq!(ctx.state(), StackState::Failed);
        assert!(outcome.is_failure());
    }

    #[test]
    fn test_delete_wait_ignores_create_statuses() {
        let client = FakeClient::new().with_stack("Network", "CREATE_COMPLETE");
        client.finish_with("Network", "DELETE_COMPLETE");
        client.script_statuses(
            "Network",
            &["CREATE_COMPLETE", "CREATE_COMPLETE", "DELETE_IN_PROGRESS"],
        );

        let (ctx, outcome) = run_one(&client, &DeleteCommand::default(), descriptor("Network"));

        assert_eq!(outcome, StackOutcome::Succeeded);
        assert_eq!(ctx.state(), StackState::Succeeded);
    }

    #[test]
    fn test_delete_never_reaching_a_delete_status_times_out() {
        let client = FakeClient::new().with_stack("Network", "UPDATE_COMPLETE");
        client.finish_with("Network", "ROLLBACK_COMPLETE");

        let (ctx, outcome) = run_one(&client, &DeleteCommand::default(), descriptor("Network"));

        assert!(matches!(outcome, StackOutcome::TimedOut { .. }));
        assert_eq!(ctx.state(), StackState::TimedOut);
    }
}
