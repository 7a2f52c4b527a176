//! [`RemoteStackClient`] backed by `aws cloudformation` commands.

use crate::classify::{classify, classify_capability};
use crate::cli::{AwsCli, stderr, stdout};
use crate::parse;
use chrono::{DateTime, Utc};
use runbook::{RemoteStack, RemoteStackClient, Result, StackEvent, StackHandle, StackPayload};

/// How many events one `describe-stack-events` call asks for.
const EVENT_PAGE: &str = "100";

/// Client that shells out to the AWS CLI.
///
/// Credentials and sessions are entirely the CLI's business; each call gets
/// `--region` and, when set, `--profile` from the stack handle.
#[derive(Debug, Clone, Default)]
pub struct AwsCliClient {
    cli: AwsCli,
}

impl AwsCliClient {
    pub fn new(cli: AwsCli) -> Self {
        Self { cli }
    }

    /// Run a call and return stdout, classifying failures.
    fn call(&self, stack: &StackHandle, args: &[&str]) -> Result<String> {
        let output = self.cli.run(args, &stack.region, &stack.account)?;
        if !output.status.success() {
            return Err(classify(&stderr(&output), &stack.id));
        }
        Ok(stdout(&output))
    }
}

impl RemoteStackClient for AwsCliClient {
    fn describe(&self, stack: &StackHandle) -> Result<RemoteStack> {
        let json = self.call(stack, &["describe-stacks", "--stack-name", &stack.id])?;
        parse::describe_stacks(&json, &stack.id)
    }

    fn create(&self, stack: &StackHandle, payload: &StackPayload) -> Result<String> {
        let input = payload.to_json()?;
        let json = self.call(stack, &["create-stack", "--cli-input-json", &input])?;
        parse::created_stack_id(&json)
    }

    fn update(&self, stack: &StackHandle, payload: &StackPayload) -> Result<()> {
        let mut payload = payload.clone();
        // StackName accepts the stack id as well
        payload.stack_name.clone_from(&stack.id);
        let input = payload.to_json()?;
        self.call(stack, &["update-stack", "--cli-input-json", &input])?;
        Ok(())
    }

    fn delete(&self, stack: &StackHandle) -> Result<()> {
        self.call(stack, &["delete-stack", "--stack-name", &stack.id])?;
        Ok(())
    }

    fn set_termination_protection(&self, stack: &StackHandle, enabled: bool) -> Result<()> {
        let flag = if enabled {
            "--enable-termination-protection"
        } else {
            "--no-enable-termination-protection"
        };
        let output = self.cli.run(
            &["update-termination-protection", "--stack-name", &stack.id, flag],
            &stack.region,
            &stack.account,
        )?;
        if !output.status.success() {
            return Err(classify_capability(
                &stderr(&output),
                &stack.id,
                "termination protection",
            ));
        }
        Ok(())
    }

    fn fetch_recent_events(
        &self,
        stack: &StackHandle,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StackEvent>> {
        let json = self.call(
            stack,
            &[
                "describe-stack-events",
                "--stack-name",
                &stack.id,
                "--max-items",
                EVENT_PAGE,
            ],
        )?;
        let mut events = parse::stack_events(&json)?;
        if let Some(since) = since {
            events.retain(|e| e.timestamp >= since);
        }
        Ok(events)
    }

    fn fetch_template(&self, stack: &StackHandle) -> Result<String> {
        let json = self.call(
            stack,
            &[
                "get-template",
                "--stack-name",
                &stack.id,
                "--template-stage",
                "Original",
            ],
        )?;
        parse::template_body(&json)
    }
}
