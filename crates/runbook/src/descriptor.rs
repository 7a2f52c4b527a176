//! Stack descriptors - the desired configuration of one stack

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a stack template comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateRef {
    /// Template text embedded in the configuration
    Body(String),
    /// Template file on the local filesystem
    Path(PathBuf),
    /// Template already hosted remotely (https:// or s3://)
    Url(String),
}

impl TemplateRef {
    /// Classify a template location string from the configuration.
    ///
    /// Anything that is not an `http(s)://` or `s3://` URL is a local path.
    pub fn from_location(location: &str) -> Self {
        if is_remote_url(location) {
            TemplateRef::Url(location.to_string())
        } else {
            TemplateRef::Path(PathBuf::from(location))
        }
    }

    /// Whether the template lives on the local filesystem.
    pub fn is_local(&self) -> bool {
        matches!(self, TemplateRef::Path(_))
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateRef::Body(_) => write!(f, "<inline template>"),
            TemplateRef::Path(path) => write!(f, "{}", path.display()),
            TemplateRef::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Check whether a location string is a remote URL.
pub fn is_remote_url(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://") || lower.starts_with("s3://")
}

/// Permanent stack policy attached at create time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackPolicy {
    /// Inline JSON policy document
    Body(String),
    /// Policy document hosted remotely
    Url(String),
}

/// What the remote side does when stack creation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnFailure {
    DoNothing,
    Rollback,
    Delete,
}

impl OnFailure {
    /// Remote API spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            OnFailure::DoNothing => "DO_NOTHING",
            OnFailure::Rollback => "ROLLBACK",
            OnFailure::Delete => "DELETE",
        }
    }

    /// Parse the remote API spelling (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DO_NOTHING" => Some(OnFailure::DoNothing),
            "ROLLBACK" => Some(OnFailure::Rollback),
            "DELETE" => Some(OnFailure::Delete),
            _ => None,
        }
    }
}

/// Which credentials profile a stack is operated with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountSelector {
    /// Named credentials profile; `None` uses the default credential chain
    pub profile: Option<String>,
}

impl AccountSelector {
    /// Selector for a named profile.
    pub fn profile(name: impl Into<String>) -> Self {
        Self {
            profile: Some(name.into()),
        }
    }
}

/// Desired configuration of one stack.
///
/// Descriptors are immutable once loaded. Anything derived at run time
/// (packaged template, remote id) lives on the
/// [`StackDeploymentContext`](crate::StackDeploymentContext) instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescriptor {
    pub name: String,
    pub stage_name: String,
    pub region: String,
    pub account: AccountSelector,
    pub template: TemplateRef,
    /// Ordered key/value parameters
    pub parameters: Vec<(String, String)>,
    /// Ordered key/value tags
    pub tags: Vec<(String, String)>,
    pub capabilities: Vec<String>,
    pub stack_policy: Option<StackPolicy>,
    pub on_failure: Option<OnFailure>,
    pub disable_rollback: bool,
    pub termination_protection: Option<bool>,
    pub role_arn: Option<String>,
    pub notification_arns: Vec<String>,
    pub timeout_in_minutes: Option<u32>,
    /// Package local artifacts before submission
    pub package: bool,
    /// Bucket receiving packaged artifacts
    pub artifact_store: Option<String>,
}

impl StackDescriptor {
    /// Create a descriptor with only the required fields set.
    pub fn new(
        stage_name: impl Into<String>,
        name: impl Into<String>,
        region: impl Into<String>,
        template: TemplateRef,
    ) -> Self {
        Self {
            name: name.into(),
            stage_name: stage_name.into(),
            region: region.into(),
            account: AccountSelector::default(),
            template,
            parameters: Vec::new(),
            tags: Vec::new(),
            capabilities: Vec::new(),
            stack_policy: None,
            on_failure: None,
            disable_rollback: false,
            termination_protection: None,
            role_arn: None,
            notification_arns: Vec::new(),
            timeout_in_minutes: None,
            package: false,
            artifact_store: None,
        }
    }

    /// `Stage.Stack` name used in progress output and summaries.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.stage_name, self.name)
    }

    /// Add a parameter (builder style).
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    /// Look up a parameter value by key.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check descriptor invariants that do not need the remote side.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(format!(
                "stack in stage '{}' has an empty name",
                self.stage_name
            )));
        }
        if self.region.trim().is_empty() {
            return Err(Error::Validation(format!(
                "stack {} has no region",
                self.qualified_name()
            )));
        }
        if self.disable_rollback && self.on_failure.is_some() {
            return Err(Error::Validation(format!(
                "stack {}: DisableRollback and OnFailure are mutually exclusive",
                self.qualified_name()
            )));
        }
        if let TemplateRef::Body(body) = &self.template {
            if body.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "stack {} has an empty template body",
                    self.qualified_name()
                )));
            }
        }
        if self.package && self.template.is_local() && self.artifact_store.is_none() {
            log::debug!(
                "{} packages without an ArtifactStore; packaging will fail",
                self.qualified_name()
            );
        }
        Ok(())
    }
}

/// Descriptors of one stage, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageGroup {
    pub name: String,
    pub stacks: Vec<StackDescriptor>,
}

impl StageGroup {
    pub fn new(name: impl Into<String>, stacks: Vec<StackDescriptor>) -> Self {
        Self {
            name: name.into(),
            stacks,
        }
    }

    /// Check that stack names are unique within the stage and each stack is valid.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for stack in &self.stacks {
            stack.validate()?;
            if !seen.insert(stack.name.as_str()) {
                return Err(Error::Validation(format!(
                    "stack name '{}' appears twice in stage '{}'",
                    stack.name, self.name
                )));
            }
        }
        Ok(())
    }
}
