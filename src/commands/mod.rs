//! Command implementations
//!
//! Each command loads the config, selects stacks and hands a
//! [`StackCommand`] to the [`RunBook`]. Errors returned from here are
//! config/selection/setup errors; per-stack failures only show up in the
//! batch exit code.

pub mod delete;
pub mod deploy;
pub mod status;
pub mod sync;
pub mod update;
pub mod validate;

use crate::Context;
use crate::cli::WaitArgs;
use crate::config::{DEFAULT_CONFIG_FILE, LoadOptions, RunConfig};
use crate::interrupt;
use crate::observer::CliObserver;
use crate::ui;
use anyhow::{Context as _, Result, bail};
use cfnkit::{AwsCli, AwsCliClient, AwsCliPackager};
use runbook::{CommandEnv, RunBook, RunOptions, StackCommand, StackDescriptor, StackSelector};
use std::path::PathBuf;
use std::time::Duration;

/// Config file to load: `--file`, then settings, then `cfn-cli.yaml`
pub(crate) fn config_path(ctx: &Context) -> PathBuf {
    ctx.file
        .clone()
        .or_else(|| ctx.settings.config_file())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Build the selector from `--stage` and `--stack`.
///
/// A dotted `--stack` without `--stage` is read as `Stage.Stack`.
pub(crate) fn selector(stage: Option<&str>, stack: Option<&str>) -> runbook::Result<StackSelector> {
    match (stage, stack) {
        (None, Some(stack)) if stack.contains('.') => StackSelector::from_qualified(stack),
        (stage, stack) => StackSelector::new(stage.unwrap_or(""), stack.unwrap_or("")),
    }
}

/// Load the config and select the stacks for this invocation.
pub(crate) fn load_selection(ctx: &Context) -> Result<(RunConfig, Vec<StackDescriptor>)> {
    let path = config_path(ctx);
    let options = LoadOptions {
        default_region: ctx
            .region
            .clone()
            .or_else(|| ctx.settings.default_region.clone()),
        profile: ctx.profile.clone(),
    };
    let config = RunConfig::load(&path, &options)
        .with_context(|| format!("Failed to load config {}", path.display()))?;

    let stacks = selector(ctx.stage.as_deref(), ctx.stack.as_deref())?.select(config.stages())?;
    Ok((config, stacks))
}

/// Batch options from command flags, falling back to user settings.
pub(crate) fn run_options(ctx: &Context, args: &WaitArgs) -> RunOptions {
    let settings = &ctx.settings;
    let mut options = RunOptions {
        jobs: args.jobs.or(settings.jobs).unwrap_or(1).max(1),
        no_wait: args.no_wait,
        stop_on_first_failure: args.stop_on_failure,
        tail_events: !args.no_tail && settings.tail_events.unwrap_or(true),
        ..RunOptions::default()
    };
    if let Some(timeout) = args.timeout.map(Duration::from_secs).or(settings.timeout()) {
        options = options.with_timeout(timeout);
    }
    if let Some(interval) = settings.poll_interval() {
        options = options.with_poll_interval(interval);
    }
    options
}

fn aws_cli(ctx: &Context) -> Result<AwsCli> {
    let cli = AwsCli::new(ctx.settings.aws_cli.as_deref().unwrap_or("aws"));
    if !cli.is_available() {
        bail!(
            "AWS CLI '{}' not found or not runnable (set aws_cli in settings.toml)",
            cli.program()
        );
    }
    Ok(cli)
}

/// Run `command` over `stacks`, print the summary and return the exit code.
pub(crate) fn run_batch(
    ctx: &Context,
    stacks: Vec<StackDescriptor>,
    command: &dyn StackCommand,
    options: &RunOptions,
    assume_yes: bool,
) -> Result<i32> {
    let cli = aws_cli(ctx)?;
    let client = AwsCliClient::new(cli.clone());
    let packager = AwsCliPackager::new(cli);
    let cancel = interrupt::install();
    let observer = CliObserver::new(ctx.quiet).assume_yes(assume_yes);

    let env = CommandEnv::new(&client, &cancel)
        .with_packager(&packager)
        .with_observer(&observer)
        .with_confirm(&observer);

    log::info!(
        "{} {} stack(s), jobs={}, no_wait={}",
        command.name(),
        stacks.len(),
        options.jobs,
        options.no_wait
    );
    let result = RunBook::new(stacks).execute(command, &env, options);

    ui::print_summary(&result);
    if interrupt::was_interrupted() {
        ui::warn("Interrupted; remaining stacks were skipped");
    }
    Ok(result.exit_code())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use runbook::{StageGroup, TemplateRef};

    fn context(settings: Settings) -> Context {
        Context {
            verbose: 0,
            quiet: true,
            file: None,
            stage: None,
            stack: None,
            profile: None,
            region: None,
            settings,
        }
    }

    fn stages() -> Vec<StageGroup> {
        let stack = |stage: &str, name: &str| {
            StackDescriptor::new(stage, name, "us-east-1", TemplateRef::Url("https://e.com/t".into()))
        };
        vec![
            StageGroup::new("Dev", vec![stack("Dev", "Network"), stack("Dev", "App")]),
            StageGroup::new("Prod", vec![stack("Prod", "Network")]),
        ]
    }

    fn selected(stage: Option<&str>, stack: Option<&str>) -> Vec<String> {
        selector(stage, stack)
            .unwrap()
            .select(&stages())
            .unwrap()
            .iter()
            .map(StackDescriptor::qualified_name)
            .collect()
    }

    #[test]
    fn test_dotted_stack_selects_stage_and_stack() {
        assert_eq!(selected(None, Some("Prod.Network")), vec!["Prod.Network"]);
        assert_eq!(selected(None, Some("Network")), vec!["Dev.Network", "Prod.Network"]);
        assert_eq!(selected(Some("Dev"), None), vec!["Dev.Network", "Dev.App"]);
    }

    #[test]
    fn test_run_options_flags_override_settings() {
        let settings = Settings {
            jobs: Some(4),
            timeout_secs: Some(600),
            poll_interval_secs: Some(2),
            tail_events: Some(false),
            ..Settings::default()
        };
        let ctx = context(settings);

        let defaults = run_options(&ctx, &WaitArgs::default());
        assert_eq!(defaults.jobs, 4);
        assert_eq!(defaults.wait.timeout, Duration::from_secs(600));
        assert_eq!(defaults.wait.poll_interval, Duration::from_secs(2));
        assert!(!defaults.tail_events);

        let args = WaitArgs {
            jobs: Some(1),
            timeout: Some(30),
            stop_on_failure: true,
            ..WaitArgs::default()
        };
        let flagged = run_options(&ctx, &args);
        assert_eq!(flagged.jobs, 1);
        assert_eq!(flagged.wait.timeout, Duration::from_secs(30));
        assert!(flagged.stop_on_first_failure);
    }

    #[test]
    fn test_zero_jobs_means_sequential() {
        let args = WaitArgs {
            jobs: Some(0),
            ..WaitArgs::default()
        };
        assert_eq!(run_options(&context(Settings::default()), &args).jobs, 1);
    }

    #[test]
    fn test_config_path_precedence() {
        let mut ctx = context(Settings {
            config_file: Some("/srv/infra/stacks.yaml".to_string()),
            ..Settings::default()
        });
        assert_eq!(config_path(&ctx), PathBuf::from("/srv/infra/stacks.yaml"));

        ctx.file = Some(PathBuf::from("local.yaml"));
        assert_eq!(config_path(&ctx), PathBuf::from("local.yaml"));

        assert_eq!(
            config_path(&context(Settings::default())),
            PathBuf::from(DEFAULT_CONFIG_FILE)
        );
    }
}
