use anyhow::Result;
use runbook::{RunOptions, StatusCommand};

use crate::Context;
use crate::cli::StatusArgs;
use crate::commands::{load_selection, run_batch};

/// Describe the selected stacks; stacks that do not exist are reported as
/// not deployed rather than failing.
pub fn run(ctx: &Context, args: &StatusArgs) -> Result<i32> {
    let (_, stacks) = load_selection(ctx)?;
    let options = RunOptions {
        jobs: ctx.settings.jobs.unwrap_or(1).max(1),
        tail_events: false,
        ..RunOptions::default()
    };
    run_batch(ctx, stacks, &StatusCommand::new(args.outputs), &options, false)
}
