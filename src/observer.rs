//! Terminal rendering of batch progress
//!
//! [`CliObserver`] turns runner callbacks into colored lines and per-stack
//! spinners. It is shared by worker threads and event tailers, so all
//! mutable state sits behind a mutex and every line goes through the
//! [`MultiProgress`] to keep spinners from tearing output.

use crate::progress;
use crate::ui;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar};
use runbook::{
    ConfirmCallback, Error, RemoteStack, RunObserver, StackDeploymentContext, StackDiff,
    StackEvent, StackOutcome, StackState, TemplateChange,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Diff lines shown per stack before eliding the rest
const MAX_DIFF_LINES: usize = 200;

pub struct CliObserver {
    multi: MultiProgress,
    spinners: Mutex<HashMap<String, ProgressBar>>,
    /// Serializes prompts when stacks run concurrently
    prompt_lock: Mutex<()>,
    quiet: bool,
    assume_yes: bool,
}

impl CliObserver {
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: progress::multi(quiet),
            spinners: Mutex::new(HashMap::new()),
            prompt_lock: Mutex::new(()),
            quiet,
            assume_yes: false,
        }
    }

    /// Answer every confirmation with yes (`--yes`).
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Print a line above the spinners.
    fn line(&self, text: &str) {
        if self.multi.is_hidden() || self.multi.println(text).is_err() {
            println!("{text}");
        }
    }

    fn take_spinner(&self, stack: &str) -> Option<ProgressBar> {
        self.spinners
            .lock()
            .ok()
            .and_then(|mut spinners| spinners.remove(stack))
    }

    fn print_diff(&self, stack: &str, diff: &StackDiff) {
        self.line(&format!("{} {}", "~".yellow().bold(), format!("{stack} differs").bold()));
        match &diff.template {
            TemplateChange::Unchanged => {}
            TemplateChange::Unknown => {
                self.line(&format!(
                    "    {}",
                    "template is a remote URL; it cannot be compared and will be submitted".dimmed()
                ));
            }
            TemplateChange::Changed { lines } => {
                self.line(&format!("    {}", "template:".dimmed()));
                for line in lines.iter().take(MAX_DIFF_LINES) {
                    let text = line.text.trim_end_matches('\n');
                    if line.added {
                        self.line(&format!("    {}", format!("+ {text}").green()));
                    } else {
                        self.line(&format!("    {}", format!("- {text}").red()));
                    }
                }
                if lines.len() > MAX_DIFF_LINES {
                    self.line(&format!(
                        "    {}",
                        format!("... {} more line(s)", lines.len() - MAX_DIFF_LINES).dimmed()
                    ));
                }
            }
        }
        if !diff.parameters.is_empty() {
            self.line(&format!("    {}", "parameters:".dimmed()));
            for change in &diff.parameters {
                let current = change.current.as_deref().unwrap_or("<unset>");
                self.line(&format!(
                    "    {} {}: {} → {}",
                    "~".yellow(),
                    change.key,
                    current.red(),
                    change.desired.green()
                ));
            }
        }
    }
}

impl RunObserver for CliObserver {
    fn on_batch_start(&self, command: &str, count: usize) {
        if !self.quiet {
            ui::header(&format!("{command}: {count} stack(s)"));
        }
    }

    fn on_stack_start(&self, ctx: &StackDeploymentContext) {
        if self.quiet {
            return;
        }
        let descriptor = ctx.descriptor();
        let account = descriptor
            .account
            .profile
            .as_deref()
            .map(|p| format!(", profile {p}"))
            .unwrap_or_default();
        self.line(&format!(
            "{} {} {}",
            "▶".cyan(),
            ctx.name().bold(),
            format!("({}{account})", descriptor.region).dimmed()
        ));
    }

    fn on_state_change(&self, stack: &str, state: StackState) {
        log::debug!("{stack}: {state}");
        if state != StackState::InProgress || self.quiet {
            return;
        }
        let spinner = self.multi.add(progress::spinner(&format!("{stack} in progress")));
        if let Ok(mut spinners) = self.spinners.lock()
            && let Some(previous) = spinners.insert(stack.to_string(), spinner)
        {
            previous.finish_and_clear();
        }
    }

    fn on_message(&self, stack: &str, message: &str) {
        if !self.quiet {
            self.line(&format!("  {} {}", stack.dimmed(), message));
        }
    }

    fn on_event(&self, stack: &str, event: &StackEvent) {
        if self.quiet {
            return;
        }
        let reason = event
            .reason
            .as_deref()
            .map(|r| format!(" {}", r.dimmed()))
            .unwrap_or_default();
        self.line(&format!(
            "  {} {} {} {} {}{reason}",
            event.timestamp.format("%H:%M:%S").to_string().dimmed(),
            stack.dimmed(),
            event.logical_id,
            event.resource_type.dimmed(),
            ui::remote_status(&event.status),
        ));
    }

    fn on_diff(&self, stack: &str, diff: &StackDiff) {
        self.print_diff(stack, diff);
    }

    fn on_remote_stack(&self, stack: &str, remote: &RemoteStack) {
        self.line(&format!("{} {}", stack.bold(), ui::remote_status(&remote.status)));
        if let Some(reason) = &remote.status_reason {
            self.line(&format!("    {}: {}", "reason".dimmed(), reason));
        }
        if let Some(updated) = remote.last_updated {
            self.line(&format!(
                "    {}: {}",
                "last updated".dimmed(),
                updated.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        if let Some(protected) = remote.termination_protection {
            self.line(&format!(
                "    {}: {}",
                "termination protection".dimmed(),
                if protected { "enabled" } else { "disabled" }
            ));
        }
        for output in &remote.outputs {
            let export = output
                .export_name
                .as_deref()
                .map(|e| format!(" {}", format!("(export {e})").dimmed()))
                .unwrap_or_default();
            self.line(&format!(
                "    {} = {}{export}",
                output.key.cyan(),
                output.value
            ));
        }
    }

    fn on_stack_complete(&self, ctx: &StackDeploymentContext, outcome: &StackOutcome) {
        let name = ctx.name();
        let elapsed = ctx
            .elapsed()
            .and_then(|d| d.to_std().ok())
            .map(|d| format!(" in {}", ui::format_duration(d)))
            .unwrap_or_default();
        let message = match outcome.detail() {
            Some(detail) => format!("{name} {}: {detail}", ctx.state()),
            None => format!("{name} {}{elapsed}", ctx.state()),
        };

        if let Some(spinner) = self.take_spinner(&name) {
            match outcome {
                StackOutcome::Succeeded => progress::finish_success(&spinner, &message),
                StackOutcome::Failed { .. } => progress::finish_error(&spinner, &message),
                StackOutcome::Skipped { .. } | StackOutcome::TimedOut { .. } => {
                    progress::finish_warn(&spinner, &message);
                }
            }
            return;
        }

        // Skipped stacks never printed a start line; keep them out of quiet output
        if self.quiet && !outcome.is_failure() {
            return;
        }
        let marker = match outcome {
            StackOutcome::Succeeded => "✓".green(),
            StackOutcome::Failed { .. } => "✗".red(),
            StackOutcome::Skipped { .. } => "-".dimmed(),
            StackOutcome::TimedOut { .. } => "⚠".yellow(),
        };
        self.line(&format!("{marker} {message}"));
    }
}

impl ConfirmCallback for CliObserver {
    fn confirm(&self, prompt: &str) -> runbook::Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        let _guard = self
            .prompt_lock
            .lock()
            .map_err(|_| Error::Validation("confirmation prompt lock poisoned".to_string()))?;

        self.multi
            .suspend(|| {
                dialoguer::Confirm::new()
                    .with_prompt(prompt)
                    .default(false)
                    .interact()
            })
            .map_err(|e| {
                Error::Validation(format!(
                    "could not read confirmation ({e}); pass --yes to run non-interactively"
                ))
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assume_yes_confirms_without_prompting() {
        let observer = CliObserver::new(true).assume_yes(true);
        assert!(observer.confirm("Apply changes to Dev.Network?").unwrap());
    }

    #[test]
    fn test_spinner_is_tracked_per_stack() {
        let observer = CliObserver::new(false);
        observer.on_state_change("Dev.Network", StackState::InProgress);
        assert!(observer.take_spinner("Dev.Network").is_some());
        assert!(observer.take_spinner("Dev.Network").is_none());
    }

    #[test]
    fn test_quiet_observer_has_no_spinners() {
        let observer = CliObserver::new(true);
        observer.on_state_change("Dev.Network", StackState::InProgress);
        assert!(observer.take_spinner("Dev.Network").is_none());
    }
}
