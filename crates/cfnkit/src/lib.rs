//! # cfnkit
//!
//! AWS CLI adapter for the [`runbook`] stack runner.
//!
//! This crate provides:
//! - [`AwsCliClient`]: a [`runbook::RemoteStackClient`] running
//!   `aws cloudformation ... --output json`
//! - [`AwsCliPackager`]: a [`runbook::TemplatePackager`] running
//!   `aws cloudformation package`
//! - stderr classification into runner errors (not found, no updates,
//!   throttling, missing CLI capabilities)
//!
//! ## Example
//!
//! ```no_run
//! use cfnkit::{AwsCli, AwsCliClient};
//! use runbook::{AccountSelector, RemoteStackClient, StackHandle};
//!
//! let client = AwsCliClient::new(AwsCli::default());
//! let handle = StackHandle::new("Network", "us-east-1", AccountSelector::profile("dev"));
//! let stack = client.describe(&handle).expect("describe failed");
//! println!("{}: {}", stack.stack_name, stack.status);
//! ```

pub mod classify;
pub mod cli;
pub mod client;
pub mod packager;
pub mod parse;

pub use cli::AwsCli;
pub use client::AwsCliClient;
pub use packager::AwsCliPackager;
