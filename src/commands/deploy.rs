use anyhow::Result;
use runbook::DeployCommand;

use crate::Context;
use crate::cli::WaitArgs;
use crate::commands::{load_selection, run_batch, run_options};

/// Create missing stacks and update existing ones.
pub fn run(ctx: &Context, args: &WaitArgs) -> Result<i32> {
    let (_, stacks) = load_selection(ctx)?;
    run_batch(ctx, stacks, &DeployCommand, &run_options(ctx, args), false)
}
