use anyhow::Result;
use colored::Colorize;
use runbook::{StackDescriptor, TemplateRef};

use crate::Context;
use crate::commands::load_selection;
use crate::ui;

/// Load and validate the config and print the selection. No remote calls.
pub fn run(ctx: &Context) -> Result<i32> {
    let (config, stacks) = load_selection(ctx)?;

    ui::header(&format!("Config {}", config.path().display()));
    ui::kv("stages", &config.stages().len().to_string());
    ui::kv("stacks", &config.stack_count().to_string());

    let mut missing_templates = 0;
    let mut current_stage = "";
    for stack in &stacks {
        if stack.stage_name != current_stage {
            current_stage = &stack.stage_name;
            println!();
            println!("{}", current_stage.cyan().bold());
        }
        println!("  {} {}", stack.name.bold(), summary(stack).dimmed());
        if ctx.verbose > 0 {
            print_details(stack);
        }
        if let TemplateRef::Path(path) = &stack.template
            && !path.is_file()
        {
            missing_templates += 1;
            ui::warn(&format!("  template not found: {}", path.display()));
        }
    }

    println!();
    if missing_templates > 0 {
        ui::error(&format!(
            "{} stack(s) selected, {missing_templates} with a missing template",
            stacks.len()
        ));
        return Ok(1);
    }
    ui::success(&format!("{} stack(s) selected", stacks.len()));
    Ok(0)
}

/// One-line description: region, profile and template
fn summary(stack: &StackDescriptor) -> String {
    let mut parts = vec![stack.region.clone()];
    if let Some(profile) = &stack.account.profile {
        parts.push(format!("profile {profile}"));
    }
    parts.push(stack.template.to_string());
    if stack.package {
        parts.push("packaged".to_string());
    }
    format!("({})", parts.join(", "))
}

fn print_details(stack: &StackDescriptor) {
    for (key, value) in &stack.parameters {
        ui::kv(&format!("  {key}"), value);
    }
    if !stack.capabilities.is_empty() {
        ui::kv("  capabilities", &stack.capabilities.join(", "));
    }
    if let Some(protected) = stack.termination_protection {
        ui::kv("  termination protection", &protected.to_string());
    }
    if let Some(store) = &stack.artifact_store {
        ui::kv("  artifact store", store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbook::AccountSelector;

    #[test]
    fn test_summary_line() {
        let mut stack = StackDescriptor::new(
            "Dev",
            "Network",
            "eu-west-1",
            TemplateRef::Url("https://e.com/network.yaml".into()),
        );
        assert_eq!(summary(&stack), "(eu-west-1, https://e.com/network.yaml)");

        stack.account = AccountSelector::profile("dev");
        stack.package = true;
        assert_eq!(
            summary(&stack),
            "(eu-west-1, profile dev, https://e.com/network.yaml, packaged)"
        );
    }
}
