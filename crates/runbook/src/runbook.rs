//! Batch execution - runs a command over every selected stack

use crate::client::WaitSettings;
use crate::command::{CommandEnv, StackCommand};
use crate::context::StackDeploymentContext;
use crate::descriptor::StackDescriptor;
use crate::outcome::{BatchSummary, StackOutcome};
use rayon::prelude::*;
use std::time::Duration;

/// Options for one batch
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Stacks processed concurrently (1 = sequential)
    pub jobs: usize,
    /// Return right after each submission instead of waiting
    pub no_wait: bool,
    /// Skip every remaining stack after the first failure
    pub stop_on_first_failure: bool,
    /// Timeout, poll interval and retry policy for waits
    pub wait: WaitSettings,
    /// Stream remote events while waiting
    pub tail_events: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            no_wait: false,
            stop_on_first_failure: false,
            wait: WaitSettings::default(),
            tail_events: true,
        }
    }
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.wait.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.wait.poll_interval = interval;
        self
    }
}

/// Ordered (context, outcome) pairs for one batch.
///
/// Every context handed to [`RunBook::execute`] appears exactly once, in
/// input order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    command: String,
    entries: Vec<(StackDeploymentContext, StackOutcome)>,
}

impl BatchResult {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn entries(&self) -> &[(StackDeploymentContext, StackOutcome)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &StackOutcome> {
        self.entries.iter().map(|(_, outcome)| outcome)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for outcome in self.outcomes() {
            summary.add(outcome);
        }
        summary
    }

    /// Whether every stack succeeded
    pub fn is_success(&self) -> bool {
        self.summary().is_success()
    }

    pub fn exit_code(&self) -> i32 {
        self.summary().exit_code()
    }
}

/// Owns the contexts of one command invocation and runs a command over them.
#[derive(Debug)]
pub struct RunBook {
    contexts: Vec<StackDeploymentContext>,
}

impl RunBook {
    /// Create a run book with one pending context per descriptor.
    pub fn new(descriptors: Vec<StackDescriptor>) -> Self {
        Self {
            contexts: descriptors
                .into_iter()
                .map(StackDeploymentContext::new)
                .collect(),
        }
    }

    pub fn contexts(&self) -> &[StackDeploymentContext] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Run `command` over every context.
    ///
    /// Contexts run in consecutive groups of `options.jobs`, groups in order.
    /// After a `Failed` outcome with `stop_on_first_failure`, or after
    /// cancellation, every remaining context is skipped. Skipped and timed
    /// out stacks do not halt the batch. Stacks already running in the same
    /// group are not interrupted.
    pub fn execute(
        self,
        command: &dyn StackCommand,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> BatchResult {
        let total = self.contexts.len();
        env.observer.on_batch_start(command.name(), total);

        let jobs = options.jobs.max(1);
        let pool = if jobs > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => Some(pool),
                Err(e) => {
                    log::warn!("Failed to create thread pool ({e}), running sequentially");
                    None
                }
            }
        } else {
            None
        };
        let group_size = if pool.is_some() { jobs } else { 1 };

        let mut entries = Vec::with_capacity(total);
        let mut halted: Option<String> = None;
        let mut remaining = self.contexts.into_iter();

        loop {
            let group: Vec<StackDeploymentContext> = remaining.by_ref().take(group_size).collect();
            if group.is_empty() {
                break;
            }

            if let Some(reason) = &halted {
                entries.extend(group.into_iter().map(|ctx| skip(env, ctx, reason)));
                continue;
            }

            let results: Vec<(StackDeploymentContext, StackOutcome)> = match &pool {
                Some(pool) if group.len() > 1 => pool.install(|| {
                    group
                        .into_par_iter()
                        .map(|ctx| run_stack(command, env, options, ctx))
                        .collect()
                }),
                _ => group
                    .into_iter()
                    .map(|ctx| run_stack(command, env, options, ctx))
                    .collect(),
            };

            if env.cancel.is_cancelled() {
                halted = Some("run cancelled".to_string());
            } else if options.stop_on_first_failure
                && let Some((ctx, _)) = results.iter().find(|(_, o)| o.is_failure())
            {
                halted = Some(format!("stopped after {} failed", ctx.name()));
            }
            entries.extend(results);
        }

        BatchResult {
            command: command.name().to_string(),
            entries,
        }
    }
}

/// Drive one context to its outcome.
fn run_stack(
    command: &dyn StackCommand,
    env: &CommandEnv<'_>,
    options: &RunOptions,
    mut ctx: StackDeploymentContext,
) -> (StackDeploymentContext, StackOutcome) {
    if env.cancel.is_cancelled() {
        return skip(env, ctx, "run cancelled");
    }

    ctx.begin();
    env.observer.on_stack_start(&ctx);
    let outcome = command.execute(&mut ctx, env, options);
    ctx.finish(&outcome);
    env.observer.on_stack_complete(&ctx, &outcome);
    (ctx, outcome)
}

fn skip(
    env: &CommandEnv<'_>,
    mut ctx: StackDeploymentContext,
    reason: &str,
) -> (StackDeploymentContext, StackOutcome) {
    let outcome = StackOutcome::skipped(reason);
    ctx.finish(&outcome);
    env.observer.on_stack_complete(&ctx, &outcome);
    (ctx, outcome)
}
