//! Remote stack API abstraction.
//!
//! The [`RemoteStackClient`] trait is the only way the runner talks to the
//! remote orchestration service, allowing for different implementations
//! (a CLI-backed adapter, a recording fake for tests).

use crate::cancel::CancelToken;
use crate::descriptor::{AccountSelector, StackDescriptor};
use crate::error::{Error, Result};
use crate::payload::StackPayload;
use crate::retry::{RetryConfig, with_retry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Identifies a stack on the remote side: name or id, plus where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackHandle {
    /// Stack name, or the remote stack id once known
    pub id: String,
    pub region: String,
    pub account: AccountSelector,
}

impl StackHandle {
    pub fn new(id: impl Into<String>, region: impl Into<String>, account: AccountSelector) -> Self {
        Self {
            id: id.into(),
            region: region.into(),
            account,
        }
    }

    /// Handle addressing a descriptor's stack by name.
    pub fn for_descriptor(descriptor: &StackDescriptor) -> Self {
        Self::new(
            descriptor.name.clone(),
            descriptor.region.clone(),
            descriptor.account.clone(),
        )
    }
}

impl fmt::Display for StackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.region)
    }
}

/// Coarse classification of a remote status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    InProgress,
    Complete,
    RolledBack,
    Failed,
    Deleted,
}

/// Raw remote status, e.g. `UPDATE_ROLLBACK_COMPLETE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteStatus(pub String);

impl RemoteStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the status.
    ///
    /// Rollback completions count as [`StatusClass::RolledBack`], not
    /// success; cleanup phases still count as in progress.
    pub fn class(&self) -> StatusClass {
        let s = self.0.as_str();
        if s.ends_with("_IN_PROGRESS") {
            StatusClass::InProgress
        } else if s.ends_with("_FAILED") {
            StatusClass::Failed
        } else if s == "DELETE_COMPLETE" {
            StatusClass::Deleted
        } else if s.contains("ROLLBACK") && s.ends_with("_COMPLETE") {
            StatusClass::RolledBack
        } else if s.ends_with("_COMPLETE") {
            StatusClass::Complete
        } else {
            // Unknown statuses are treated as still moving
            StatusClass::InProgress
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.class() != StatusClass::InProgress
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stack output value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

/// Result of a describe call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStack {
    pub stack_id: String,
    pub stack_name: String,
    pub status: RemoteStatus,
    pub status_reason: Option<String>,
    /// Current parameter values, in remote order
    pub parameters: Vec<(String, String)>,
    pub outputs: Vec<StackOutput>,
    pub termination_protection: Option<bool>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// One lifecycle event of a stack or one of its resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub logical_id: String,
    pub resource_type: String,
    pub status: RemoteStatus,
    pub reason: Option<String>,
}

/// Which operation a wait is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    Created,
    Updated,
    Deleted,
}

impl WaitKind {
    pub fn verb(&self) -> &'static str {
        match self {
            WaitKind::Created => "create",
            WaitKind::Updated => "update",
            WaitKind::Deleted => "delete",
        }
    }

    /// Status prefixes that belong to this operation
    fn prefixes(&self) -> &'static [&'static str] {
        match self {
            WaitKind::Created => &["CREATE_", "ROLLBACK_"],
            WaitKind::Updated => &["UPDATE_"],
            WaitKind::Deleted => &["DELETE_"],
        }
    }

    /// Whether `status` can end a wait of this kind.
    ///
    /// Terminal statuses of other operations are left to poll past.
    pub fn accepts(&self, status: &RemoteStatus) -> bool {
        status.is_terminal()
            && self
                .prefixes()
                .iter()
                .any(|prefix| status.as_str().starts_with(prefix))
    }
}

/// What the stack looked like before the operation was submitted.
///
/// A describe that still reports this exact status and update time is a
/// stale read, not the outcome of the new operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitBaseline {
    pub status: Option<RemoteStatus>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl WaitBaseline {
    pub fn of(remote: &RemoteStack) -> Self {
        Self {
            status: Some(remote.status.clone()),
            last_updated: remote.last_updated,
        }
    }

    fn is_stale(&self, remote: &RemoteStack) -> bool {
        self.status.as_ref() == Some(&remote.status) && self.last_updated == remote.last_updated
    }
}

/// Terminal outcome of a wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    /// Operation completed as requested
    Succeeded { status: RemoteStatus },
    /// Stack ended in a failed state
    Failed {
        status: RemoteStatus,
        reason: Option<String>,
    },
    /// Remote side rolled the operation back
    RolledBack {
        status: RemoteStatus,
        reason: Option<String>,
    },
}

impl TerminalStatus {
    /// Interpret a remote status for the given wait kind.
    ///
    /// `None` when the status does not end this kind of wait.
    pub fn from_remote(
        kind: WaitKind,
        status: RemoteStatus,
        reason: Option<String>,
    ) -> Option<Self> {
        if !kind.accepts(&status) {
            return None;
        }
        Some(match status.class() {
            StatusClass::Complete | StatusClass::Deleted => TerminalStatus::Succeeded { status },
            StatusClass::RolledBack => TerminalStatus::RolledBack { status, reason },
            StatusClass::Failed | StatusClass::InProgress => TerminalStatus::Failed { status, reason },
        })
    }

    pub fn status(&self) -> &RemoteStatus {
        match self {
            TerminalStatus::Succeeded { status }
            | TerminalStatus::Failed { status, .. }
            | TerminalStatus::RolledBack { status, .. } => status,
        }
    }
}

/// Bounds for a wait-for-terminal-state poll loop.
#[derive(Debug, Clone)]
pub struct WaitSettings {
    /// Give up after this long (the remote operation keeps running)
    pub timeout: Duration,
    /// Delay between describe calls
    pub poll_interval: Duration,
    /// Retry policy for throttled describe calls
    pub retry: RetryConfig,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60 * 60),
            poll_interval: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

/// Narrow interface to the remote stack API.
///
/// Implementations must be shareable across threads; the runner hands one
/// client to every stack of a batch and to the event tailer.
pub trait RemoteStackClient: Send + Sync {
    /// Describe a stack, or [`Error::NotFound`].
    fn describe(&self, stack: &StackHandle) -> Result<RemoteStack>;

    /// Submit a create call, returning the remote stack id.
    fn create(&self, stack: &StackHandle, payload: &StackPayload) -> Result<String>;

    /// Submit an update call. [`Error::NoUpdates`] when nothing would change.
    fn update(&self, stack: &StackHandle, payload: &StackPayload) -> Result<()>;

    /// Submit a delete call.
    fn delete(&self, stack: &StackHandle) -> Result<()>;

    /// Enable or disable termination protection.
    ///
    /// Fails with [`Error::CapabilityUnsupported`] when the remote side or the
    /// tooling cannot perform the call.
    fn set_termination_protection(&self, stack: &StackHandle, enabled: bool) -> Result<()>;

    /// Events at or after `since` (all recent events when `None`), oldest first.
    ///
    /// Callers dedupe by event id, so returning an event twice is harmless.
    fn fetch_recent_events(
        &self,
        stack: &StackHandle,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StackEvent>>;

    /// The template body the stack was last deployed with.
    fn fetch_template(&self, stack: &StackHandle) -> Result<String>;

    /// Block until the stack reaches a terminal state for `kind`.
    ///
    /// The default implementation polls [`describe`](Self::describe) and
    /// only stops on a status [`WaitKind::accepts`]. Until the stack has been
    /// seen in progress, a status matching `baseline` is a stale read and is
    /// polled past. Returns [`Error::Timeout`] once `settings.timeout`
    /// elapses and [`Error::Cancelled`] as soon as `cancel` is set.
    fn wait_for_terminal_state(
        &self,
        stack: &StackHandle,
        kind: WaitKind,
        baseline: &WaitBaseline,
        settings: &WaitSettings,
        cancel: &CancelToken,
    ) -> Result<TerminalStatus> {
        let started = Instant::now();
        let mut moved = false;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let described = with_retry(&settings.retry, cancel, "describe", || {
                self.describe(stack)
            });
            match described {
                Ok(remote) => {
                    log::debug!("{stack}: {}", remote.status);
                    if !remote.status.is_terminal() {
                        moved = true;
                    } else if !moved && baseline.is_stale(&remote) {
                        log::trace!("{stack}: {} predates the {}", remote.status, kind.verb());
                    } else if let Some(terminal) = TerminalStatus::from_remote(
                        kind,
                        remote.status.clone(),
                        remote.status_reason,
                    ) {
                        return Ok(terminal);
                    } else {
                        log::trace!("{stack}: {} does not end a {} wait", remote.status, kind.verb());
                    }
                }
                Err(Error::NotFound(_)) if kind == WaitKind::Deleted => {
                    return Ok(TerminalStatus::Succeeded {
                        status: RemoteStatus::new("DELETE_COMPLETE"),
                    });
                }
                Err(e) => return Err(e),
            }

            let elapsed = started.elapsed();
            if elapsed >= settings.timeout {
                return Err(Error::Timeout {
                    stack: stack.id.clone(),
                    waited: elapsed,
                });
            }
            let remaining = settings.timeout - elapsed;
            if cancel.sleep(settings.poll_interval.min(remaining)) {
                return Err(Error::Cancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        let class = |s: &str| RemoteStatus::new(s).class();
        assert_eq!(class("CREATE_IN_PROGRESS"), StatusClass::InProgress);
        assert_eq!(
            class("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            StatusClass::InProgress
        );
        assert_eq!(class("CREATE_COMPLETE"), StatusClass::Complete);
        assert_eq!(class("UPDATE_COMPLETE"), StatusClass::Complete);
        assert_eq!(class("ROLLBACK_COMPLETE"), StatusClass::RolledBack);
        assert_eq!(class("UPDATE_ROLLBACK_COMPLETE"), StatusClass::RolledBack);
        assert_eq!(class("UPDATE_ROLLBACK_FAILED"), StatusClass::Failed);
        assert_eq!(class("DELETE_COMPLETE"), StatusClass::Deleted);
        assert_eq!(class("DELETE_FAILED"), StatusClass::Failed);
    }

    #[test]
    fn test_terminal_status_per_kind() {
        let terminal = |kind, s: &str| TerminalStatus::from_remote(kind, RemoteStatus::new(s), None);
        assert!(matches!(
            terminal(WaitKind::Created, "CREATE_COMPLETE"),
            Some(TerminalStatus::Succeeded { .. })
        ));
        assert!(matches!(
            terminal(WaitKind::Created, "ROLLBACK_COMPLETE"),
            Some(TerminalStatus::RolledBack { .. })
        ));
        assert!(matches!(
            terminal(WaitKind::Updated, "UPDATE_ROLLBACK_COMPLETE"),
            Some(TerminalStatus::RolledBack { .. })
        ));
        assert!(matches!(
            terminal(WaitKind::Updated, "UPDATE_ROLLBACK_FAILED"),
            Some(TerminalStatus::Failed { .. })
        ));
        assert!(matches!(
            terminal(WaitKind::Deleted, "DELETE_COMPLETE"),
            Some(TerminalStatus::Succeeded { .. })
        ));
        assert!(matches!(
            terminal(WaitKind::Deleted, "DELETE_FAILED"),
            Some(TerminalStatus::Failed { .. })
        ));
    }

    #[test]
    fn test_other_operations_do_not_end_a_wait() {
        let terminal = |kind, s: &str| TerminalStatus::from_remote(kind, RemoteStatus::new(s), None);
        assert_eq!(terminal(WaitKind::Deleted, "CREATE_COMPLETE"), None);
        assert_eq!(terminal(WaitKind::Deleted, "ROLLBACK_COMPLETE"), None);
        assert_eq!(terminal(WaitKind::Updated, "CREATE_COMPLETE"), None);
        assert_eq!(terminal(WaitKind::Created, "UPDATE_COMPLETE"), None);
        assert_eq!(terminal(WaitKind::Updated, "UPDATE_IN_PROGRESS"), None);
    }

    #[test]
    fn test_baseline_marks_unchanged_reads_stale() {
        let remote = |status: &str, updated: Option<i64>| RemoteStack {
            stack_id: "arn:stack/Network".to_string(),
            stack_name: "Network".to_string(),
            status: RemoteStatus::new(status),
            status_reason: None,
            parameters: Vec::new(),
            outputs: Vec::new(),
            termination_protection: None,
            last_updated: updated.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        };
        let baseline = WaitBaseline::of(&remote("UPDATE_COMPLETE", Some(100)));

        assert!(baseline.is_stale(&remote("UPDATE_COMPLETE", Some(100))));
        assert!(!baseline.is_stale(&remote("UPDATE_COMPLETE", Some(200))));
        assert!(!baseline.is_stale(&remote("UPDATE_ROLLBACK_COMPLETE", Some(100))));
        assert!(!WaitBaseline::default().is_stale(&remote("UPDATE_COMPLETE", None)));
    }
}
