use anyhow::{Context as _, Result};
use colored::Colorize;
use runbook::{DeleteCommand, StackDescriptor};

use crate::Context;
use crate::cli::DeleteArgs;
use crate::commands::{load_selection, run_batch, run_options};
use crate::ui;

/// Delete the selected stacks after a single confirmation.
pub fn run(ctx: &Context, args: &DeleteArgs) -> Result<i32> {
    let (_, stacks) = load_selection(ctx)?;

    if !args.yes && !confirm_delete(&stacks)? {
        ui::warn("Delete declined; no stacks were touched");
        return Ok(1);
    }

    let command = DeleteCommand::new(args.ignore_missing);
    run_batch(ctx, stacks, &command, &run_options(ctx, &args.wait), true)
}

fn confirm_delete(stacks: &[StackDescriptor]) -> Result<bool> {
    ui::header(&format!("About to delete {} stack(s)", stacks.len()));
    for stack in stacks {
        println!(
            "  {} {} {}",
            "•".red(),
            stack.qualified_name().bold(),
            format!("({})", stack.region).dimmed()
        );
    }
    println!();

    dialoguer::Confirm::new()
        .with_prompt("Delete these stacks?")
        .default(false)
        .interact()
        .context("Failed to read confirmation (pass --yes to skip it)")
}
