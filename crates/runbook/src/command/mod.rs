//! Stack commands
//!
//! A command drives one stack through one operation. Commands carry only
//! operator flags; everything about the stack lives on the
//! [`StackDeploymentContext`] handed to [`StackCommand::execute`].

mod delete;
mod deploy;
mod status;
mod sync;
mod update;

pub use delete::DeleteCommand;
pub use deploy::DeployCommand;
pub use status::StatusCommand;
pub use sync::SyncCommand;
pub use update::UpdateCommand;

use crate::cancel::CancelToken;
use crate::client::{RemoteStack, RemoteStackClient, TerminalStatus, WaitBaseline, WaitKind};
use crate::context::{StackDeploymentContext, StackState};
use crate::descriptor::TemplateRef;
use crate::error::{Error, ErrorCategory, Result};
use crate::observer::{AutoConfirm, ConfirmCallback, NoObserver, RunObserver};
use crate::outcome::StackOutcome;
use crate::packager::{ArtifactLocation, NoPackager, TemplatePackager};
use crate::payload::TemplateSource;
use crate::retry::with_retry;
use crate::runbook::RunOptions;
use crate::tailer::EventTailer;
use std::fs;

/// Collaborators shared by every stack of a batch.
pub struct CommandEnv<'a> {
    pub client: &'a dyn RemoteStackClient,
    pub packager: &'a dyn TemplatePackager,
    pub observer: &'a dyn RunObserver,
    pub confirm: &'a dyn ConfirmCallback,
    pub cancel: &'a CancelToken,
}

impl<'a> CommandEnv<'a> {
    /// Environment with no packager, no observer and automatic confirmation.
    pub fn new(client: &'a dyn RemoteStackClient, cancel: &'a CancelToken) -> Self {
        Self {
            client,
            packager: &NoPackager,
            observer: &NoObserver,
            confirm: &AutoConfirm,
            cancel,
        }
    }

    pub fn with_packager(mut self, packager: &'a dyn TemplatePackager) -> Self {
        self.packager = packager;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn RunObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_confirm(mut self, confirm: &'a dyn ConfirmCallback) -> Self {
        self.confirm = confirm;
        self
    }
}

/// One operation applied to each selected stack.
pub trait StackCommand: Send + Sync {
    /// Name used in progress output ("deploy", "update", ...)
    fn name(&self) -> &'static str;

    /// Drive one stack. Errors are converted to outcomes by [`execute`](Self::execute).
    fn run(
        &self,
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> Result<StackOutcome>;

    /// Drive one stack to an outcome; never fails.
    fn execute(
        &self,
        ctx: &mut StackDeploymentContext,
        env: &CommandEnv<'_>,
        options: &RunOptions,
    ) -> StackOutcome {
        match self.run(ctx, env, options) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::debug!("{} {}: {e}", self.name(), ctx.name());
                StackOutcome::from(&e)
            }
        }
    }
}

/// Transition a context and notify the observer.
pub(crate) fn set_state(ctx: &mut StackDeploymentContext, env: &CommandEnv<'_>, state: StackState) {
    ctx.transition(state);
    env.observer.on_state_change(&ctx.name(), state);
}

/// Describe the stack, returning `None` when it does not exist.
///
/// Records the remote id and status on the context.
pub(crate) fn describe_existing(
    ctx: &mut StackDeploymentContext,
    env: &CommandEnv<'_>,
    options: &RunOptions,
) -> Result<Option<RemoteStack>> {
    let handle = ctx.handle();
    let described = with_retry(&options.wait.retry, env.cancel, "describe", || {
        env.client.describe(&handle)
    });
    match described {
        Ok(remote) if remote.status.as_str() == "DELETE_COMPLETE" => Ok(None),
        Ok(remote) => {
            ctx.remote_stack_id = Some(remote.stack_id.clone());
            ctx.remote_status = Some(remote.status.clone());
            ctx.remote_updated = remote.last_updated;
            Ok(Some(remote))
        }
        Err(Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Turn the descriptor's template into what is actually submitted.
///
/// Local templates are packaged when the descriptor asks for it, otherwise
/// read from disk. Remote URLs are passed through untouched.
pub(crate) fn resolve_template(
    ctx: &mut StackDeploymentContext,
    env: &CommandEnv<'_>,
) -> Result<TemplateSource> {
    let descriptor = ctx.descriptor();
    let source = match &descriptor.template {
        TemplateRef::Body(body) => TemplateSource::Body(body.clone()),
        TemplateRef::Url(url) => TemplateSource::Url(url.clone()),
        TemplateRef::Path(path) if descriptor.package => {
            let bucket = descriptor.artifact_store.clone().ok_or_else(|| Error::Packaging {
                path: path.clone(),
                message: "Package is set but no ArtifactStore is configured".to_string(),
            })?;
            let location = ArtifactLocation {
                bucket,
                region: descriptor.region.clone(),
                prefix: descriptor.name.clone(),
                account: descriptor.account.clone(),
            };
            env.observer
                .on_message(&ctx.name(), &format!("packaging {}", path.display()));
            match env.packager.package(path, &location)? {
                TemplateRef::Body(body) => TemplateSource::Body(body),
                TemplateRef::Url(url) => TemplateSource::Url(url),
                TemplateRef::Path(local) => {
                    return Err(Error::Packaging {
                        path: path.clone(),
                        message: format!(
                            "packager returned a local path ({})",
                            local.display()
                        ),
                    });
                }
            }
        }
        TemplateRef::Path(path) => TemplateSource::Body(fs::read_to_string(path).map_err(|e| {
            Error::Validation(format!("cannot read template {}: {e}", path.display()))
        })?),
    };
    ctx.resolved_template = Some(source.clone());
    Ok(source)
}

/// Wait for the submitted operation, tailing events meanwhile.
///
/// With `no_wait` the context is detached right away and counts as
/// succeeded.
pub(crate) fn await_terminal(
    ctx: &mut StackDeploymentContext,
    env: &CommandEnv<'_>,
    options: &RunOptions,
    kind: WaitKind,
) -> Result<StackOutcome> {
    if options.no_wait {
        set_state(ctx, env, StackState::Detached);
        env.observer.on_message(
            &ctx.name(),
            &format!("{} submitted, not waiting", kind.verb()),
        );
        return Ok(StackOutcome::Succeeded);
    }

    set_state(ctx, env, StackState::InProgress);
    let handle = ctx.handle();
    let baseline = WaitBaseline {
        status: ctx.remote_status.clone(),
        last_updated: ctx.remote_updated,
    };
    let wait = || {
        env.client
            .wait_for_terminal_state(&handle, kind, &baseline, &options.wait, env.cancel)
    };
    let terminal = if options.tail_events {
        let mut tailer = EventTailer::new(
            env.client,
            env.observer,
            env.cancel,
            ctx.name(),
            handle.clone(),
            options.wait.poll_interval,
        );
        tailer.tail_while(wait)?
    } else {
        wait()?
    };

    ctx.remote_status = Some(terminal.status().clone());
    let outcome = match terminal {
        TerminalStatus::Succeeded { .. } => {
            set_state(ctx, env, StackState::Succeeded);
            StackOutcome::Succeeded
        }
        TerminalStatus::RolledBack { status, reason } => {
            set_state(ctx, env, StackState::RolledBack);
            StackOutcome::failed(ErrorCategory::StackFailed, terminal_reason(&status.0, reason))
        }
        TerminalStatus::Failed { status, reason } => {
            set_state(ctx, env, StackState::Failed);
            StackOutcome::failed(ErrorCategory::StackFailed, terminal_reason(&status.0, reason))
        }
    };
    Ok(outcome)
}

fn terminal_reason(status: &str, reason: Option<String>) -> String {
    match reason {
        Some(reason) => format!("{status}: {reason}"),
        None => status.to_string(),
    }
}
