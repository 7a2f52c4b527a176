//! Runs the `aws` executable.

use runbook::{AccountSelector, Error, Result};
use std::process::{Command, Output};

/// A configured `aws` executable.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: String,
}

impl Default for AwsCli {
    fn default() -> Self {
        Self::new("aws")
    }
}

impl AwsCli {
    /// Use `program` (a name on `PATH` or a full path).
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check that the executable runs at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    /// Run `aws cloudformation <args>` in `region` with `account`'s profile.
    pub(crate) fn run(
        &self,
        args: &[&str],
        region: &str,
        account: &AccountSelector,
    ) -> Result<Output> {
        let full = cloudformation_args(args, region, account);
        log::debug!("{} {}", self.program, redact(&full).join(" "));

        Command::new(&self.program)
            .args(&full)
            .env("AWS_PAGER", "")
            .output()
            .map_err(|e| Error::remote(format!("failed to execute {}: {e}", self.program)))
    }
}

/// Full argument list for a CloudFormation call.
pub(crate) fn cloudformation_args(
    args: &[&str],
    region: &str,
    account: &AccountSelector,
) -> Vec<String> {
    let mut full = vec!["cloudformation".to_string()];
    full.extend(args.iter().map(|a| a.to_string()));
    full.extend(["--output".to_string(), "json".to_string()]);
    if !region.is_empty() {
        full.extend(["--region".to_string(), region.to_string()]);
    }
    if let Some(profile) = &account.profile {
        full.extend(["--profile".to_string(), profile.clone()]);
    }
    full
}

/// Hide `--cli-input-json` payloads (they carry parameter values) from logs.
fn redact(args: &[String]) -> Vec<&str> {
    let mut out = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            out.push("<payload>");
            hide_next = false;
        } else {
            hide_next = arg == "--cli-input-json";
            out.push(arg.as_str());
        }
    }
    out
}

pub(crate) fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub(crate) fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
