use anyhow::Result;
use runbook::SyncCommand;

use crate::Context;
use crate::cli::SyncArgs;
use crate::commands::{load_selection, run_batch, run_options};

/// Diff each stack against its config and apply confirmed changes.
pub fn run(ctx: &Context, args: &SyncArgs) -> Result<i32> {
    let (_, stacks) = load_selection(ctx)?;
    let command = SyncCommand::new(args.use_previous_template);
    run_batch(ctx, stacks, &command, &run_options(ctx, &args.wait), args.yes)
}
