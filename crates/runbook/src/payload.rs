//! Submission payloads built explicitly per operation
//!
//! A payload is derived from an immutable [`StackDescriptor`] for exactly one
//! remote call. Fields that a call does not accept are simply never set, so
//! nothing has to be stripped from shared state.

use crate::descriptor::{StackDescriptor, StackPolicy};
use crate::policy::CannedPolicy;
use serde::Serialize;

/// The template actually submitted, after packaging or reading from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Body(String),
    Url(String),
    /// Reuse whatever template the stack already has (update only)
    UsePrevious,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub parameter_key: String,
    pub parameter_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Request body for a create or update call.
///
/// Serializes to the remote API's field names so adapters can submit it
/// as-is (e.g. `--cli-input-json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackPayload {
    pub stack_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_body: Option<String>,
    #[serde(rename = "TemplateURL", skip_serializing_if = "Option::is_none")]
    pub template_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_previous_template: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_rollback: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_policy_body: Option<String>,
    #[serde(rename = "StackPolicyURL", skip_serializing_if = "Option::is_none")]
    pub stack_policy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_policy_during_update_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_termination_protection: Option<bool>,
    #[serde(rename = "RoleARN", skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(rename = "NotificationARNs", skip_serializing_if = "Vec::is_empty")]
    pub notification_arns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_in_minutes: Option<u32>,
}

/// Flags that shape an update payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateFlags {
    pub use_previous_template: bool,
    pub override_policy: Option<CannedPolicy>,
}

impl StackPayload {
    fn common(descriptor: &StackDescriptor) -> Self {
        let mut payload = Self {
            stack_name: descriptor.name.clone(),
            parameters: descriptor
                .parameters
                .iter()
                .map(|(k, v)| Parameter {
                    parameter_key: k.clone(),
                    parameter_value: v.clone(),
                })
                .collect(),
            capabilities: descriptor.capabilities.clone(),
            tags: descriptor
                .tags
                .iter()
                .map(|(k, v)| Tag {
                    key: k.clone(),
                    value: v.clone(),
                })
                .collect(),
            role_arn: descriptor.role_arn.clone(),
            notification_arns: descriptor.notification_arns.clone(),
            ..Default::default()
        };

        match &descriptor.stack_policy {
            Some(StackPolicy::Body(body)) => payload.stack_policy_body = Some(body.clone()),
            Some(StackPolicy::Url(url)) => payload.stack_policy_url = Some(url.clone()),
            None => {}
        }

        payload
    }

    fn set_template(&mut self, template: &TemplateSource) {
        match template {
            TemplateSource::Body(body) => self.template_body = Some(body.clone()),
            TemplateSource::Url(url) => self.template_url = Some(url.clone()),
            TemplateSource::UsePrevious => self.use_previous_template = Some(true),
        }
    }

    /// Payload for creating a stack.
    ///
    /// Carries the create-only fields: rollback behavior, creation timeout and
    /// termination protection.
    pub fn for_create(descriptor: &StackDescriptor, template: &TemplateSource) -> Self {
        let mut payload = Self::common(descriptor);
        payload.set_template(template);
        if descriptor.disable_rollback {
            payload.disable_rollback = Some(true);
        }
        payload.on_failure = descriptor.on_failure.map(|f| f.as_str().to_string());
        payload.timeout_in_minutes = descriptor.timeout_in_minutes;
        payload.enable_termination_protection = descriptor.termination_protection;
        payload
    }

    /// Payload for updating a stack.
    ///
    /// `DisableRollback`, `OnFailure` and termination protection are never
    /// included. With `use_previous_template` no template body or URL is sent.
    pub fn for_update(
        descriptor: &StackDescriptor,
        template: &TemplateSource,
        flags: UpdateFlags,
    ) -> Self {
        let mut payload = Self::common(descriptor);
        if flags.use_previous_template {
            payload.set_template(&TemplateSource::UsePrevious);
        } else {
            payload.set_template(template);
        }
        payload.stack_policy_during_update_body =
            flags.override_policy.map(|p| p.body().to_string());
        payload
    }

    /// Whether the payload carries a template body or URL.
    pub fn has_template(&self) -> bool {
        self.template_body.is_some() || self.template_url.is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
