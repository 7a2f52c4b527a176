//! # runbook
//!
//! Multi-stack execution runner.
//!
//! This crate takes a set of stack descriptors, drives each one through a
//! remote lifecycle operation, and aggregates the per-stack outcomes of the
//! batch without losing track of stacks that are still in flight when
//! another one fails.
//!
//! ## Core Concepts
//!
//! - **StackDescriptor**: Immutable desired configuration of one stack
//! - **StackSelector**: Picks the stacks of a batch by stage/stack patterns
//! - **StackDeploymentContext**: Per-stack runtime state for one invocation
//! - **StackCommand**: Deploy, update, delete, status or sync one stack
//! - **RunBook**: Runs a command over every context, sequentially or in groups
//! - **EventTailer**: Streams remote events while a wait is blocked
//!
//! ## Example
//!
//! ```ignore
//! use runbook::{
//!     CancelToken, CommandEnv, DeployCommand, RunBook, RunOptions, StackSelector,
//! };
//!
//! let stacks = StackSelector::new("Dev", "*")?.select(&stages)?;
//! let cancel = CancelToken::new();
//! let env = CommandEnv::new(&client, &cancel).with_observer(&observer);
//!
//! let result = RunBook::new(stacks).execute(&DeployCommand, &env, &RunOptions::default());
//! std::process::exit(result.exit_code());
//! ```
//!
//! ## Provider Traits
//!
//! - [`RemoteStackClient`]: The remote stack API
//! - [`TemplatePackager`]: Uploads local template artifacts
//! - [`RunObserver`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles operator confirmations
//!
//! The crate never prints; the binary decides how progress looks.

pub mod cancel;
pub mod client;
pub mod command;
pub mod context;
pub mod descriptor;
pub mod diff;
pub mod error;
pub mod observer;
pub mod outcome;
pub mod packager;
pub mod payload;
pub mod policy;
pub mod retry;
pub mod runbook;
pub mod selector;
pub mod tailer;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use cancel::CancelToken;
pub use client::{
    RemoteStack, RemoteStackClient, RemoteStatus, StackEvent, StackHandle, StackOutput,
    StatusClass, TerminalStatus, WaitBaseline, WaitKind, WaitSettings,
};
pub use command::{
    CommandEnv, DeleteCommand, DeployCommand, StackCommand, StatusCommand, SyncCommand,
    UpdateCommand,
};
pub use context::{StackDeploymentContext, StackState};
pub use descriptor::{
    AccountSelector, OnFailure, StackDescriptor, StackPolicy, StageGroup, TemplateRef,
};
pub use diff::{DiffLine, ParameterChange, StackDiff, TemplateChange};
pub use error::{Error, ErrorCategory, Result};
pub use observer::{AutoConfirm, AutoDecline, ConfirmCallback, NoObserver, RunObserver};
pub use outcome::{BatchSummary, StackOutcome};
pub use packager::{ArtifactLocation, NoPackager, TemplatePackager};
pub use payload::{StackPayload, TemplateSource, UpdateFlags};
pub use policy::CannedPolicy;
pub use retry::{RetryConfig, with_retry};
pub use runbook::{BatchResult, RunBook, RunOptions};
pub use selector::{NamePattern, StackSelector, select};
pub use tailer::EventTailer;
