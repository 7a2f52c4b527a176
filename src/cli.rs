use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use runbook::CannedPolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stackrun")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Deploy and manage groups of CloudFormation stacks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Stack configuration file [default: cfn-cli.yaml]
    #[arg(short = 'f', long, global = true, env = "STACKRUN_FILE")]
    pub file: Option<PathBuf>,

    /// Stage name pattern (glob, e.g. "Dev" or "Prod*")
    #[arg(short, long, global = true)]
    pub stage: Option<String>,

    /// Stack name pattern (glob); "Stage.Stack" selects both at once
    #[arg(short = 'k', long, global = true)]
    pub stack: Option<String>,

    /// AWS profile, overriding the profile of every stack
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// AWS region for stacks that do not set one
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create stacks that do not exist, update the ones that do
    Deploy(WaitArgs),

    /// Update existing stacks
    Update(UpdateArgs),

    /// Delete stacks
    Delete(DeleteArgs),

    /// Show remote status of stacks
    Status(StatusArgs),

    /// Show differences with deployed stacks and apply them after confirmation
    Sync(SyncArgs),

    /// Load and validate the config file, print the selected stacks
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Wait Options
// ============================================================================

#[derive(Args, Clone, Debug, Default)]
pub struct WaitArgs {
    /// Return right after submitting instead of waiting for completion
    #[arg(long)]
    pub no_wait: bool,

    /// Seconds to wait for each stack before giving up
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of stacks to process concurrently
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Skip remaining stacks after the first failure
    #[arg(long)]
    pub stop_on_failure: bool,

    /// Do not stream stack events while waiting
    #[arg(long)]
    pub no_tail: bool,
}

// ============================================================================
// Command Arguments
// ============================================================================

#[derive(Args, Clone, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub wait: WaitArgs,

    /// Reuse the deployed template instead of submitting the configured one
    #[arg(long)]
    pub use_previous_template: bool,

    /// Temporary stack policy for this update only
    #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
    pub override_policy: Option<CannedPolicy>,

    /// Treat "no updates are to be performed" as success
    #[arg(long)]
    pub ignore_no_update: bool,
}

#[derive(Args, Clone, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub wait: WaitArgs,

    /// Treat stacks that do not exist as deleted
    #[arg(long)]
    pub ignore_missing: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Clone, Debug)]
pub struct StatusArgs {
    /// Also print stack outputs
    #[arg(long)]
    pub outputs: bool,
}

#[derive(Args, Clone, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub wait: WaitArgs,

    /// Compare and update parameters only, keeping the deployed template
    #[arg(long)]
    pub use_previous_template: bool,

    /// Apply detected changes without asking
    #[arg(short, long)]
    pub yes: bool,
}

fn parse_policy(value: &str) -> Result<CannedPolicy, String> {
    value.parse()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_flags() {
        let cli = Cli::parse_from([
            "stackrun",
            "-s",
            "Dev",
            "update",
            "--override-policy",
            "DENY_DELETE",
            "--use-previous-template",
            "--jobs",
            "4",
        ]);
        assert_eq!(cli.stage.as_deref(), Some("Dev"));
        match cli.command {
            Command::Update(args) => {
                assert_eq!(args.override_policy, Some(CannedPolicy::DenyDelete));
                assert!(args.use_previous_template);
                assert_eq!(args.wait.jobs, Some(4));
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = Cli::try_parse_from(["stackrun", "update", "--override-policy", "DENY_ALL"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["stackrun", "delete", "-y", "-k", "Dev.Network", "-vv"]);
        assert_eq!(cli.stack.as_deref(), Some("Dev.Network"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Delete(DeleteArgs { yes: true, .. })));
    }
}
