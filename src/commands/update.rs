use anyhow::Result;
use runbook::UpdateCommand;

use crate::Context;
use crate::cli::UpdateArgs;
use crate::commands::{load_selection, run_batch, run_options};

/// Update existing stacks; a missing stack fails with a validation error.
pub fn run(ctx: &Context, args: &UpdateArgs) -> Result<i32> {
    let (_, stacks) = load_selection(ctx)?;
    let command = UpdateCommand::default()
        .use_previous_template(args.use_previous_template)
        .override_policy(args.override_policy)
        .ignore_no_update(args.ignore_no_update);
    run_batch(ctx, stacks, &command, &run_options(ctx, &args.wait), false)
}
