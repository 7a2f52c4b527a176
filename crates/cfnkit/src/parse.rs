//! Parsing of `aws cloudformation ... --output json` responses

use chrono::{DateTime, Utc};
use runbook::{Error, RemoteStack, RemoteStatus, Result, StackEvent, StackOutput};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacks {
    #[serde(default)]
    stacks: Vec<StackJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StackJson {
    stack_id: String,
    stack_name: String,
    stack_status: String,
    stack_status_reason: Option<String>,
    #[serde(default)]
    parameters: Vec<ParameterJson>,
    #[serde(default)]
    outputs: Vec<OutputJson>,
    enable_termination_protection: Option<bool>,
    last_updated_time: Option<DateTime<Utc>>,
    creation_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParameterJson {
    parameter_key: String,
    #[serde(default)]
    parameter_value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OutputJson {
    output_key: String,
    #[serde(default)]
    output_value: String,
    description: Option<String>,
    export_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeEvents {
    #[serde(default)]
    stack_events: Vec<EventJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EventJson {
    event_id: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    logical_resource_id: String,
    #[serde(default)]
    resource_type: String,
    #[serde(default)]
    resource_status: String,
    resource_status_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateStack {
    stack_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetTemplate {
    template_body: serde_json::Value,
}

/// Parse `describe-stacks` output for one stack.
pub fn describe_stacks(json: &str, stack: &str) -> Result<RemoteStack> {
    let parsed: DescribeStacks = serde_json::from_str(json)?;
    let raw = parsed
        .stacks
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(stack.to_string()))?;

    Ok(RemoteStack {
        stack_id: raw.stack_id,
        stack_name: raw.stack_name,
        status: RemoteStatus::new(raw.stack_status),
        status_reason: raw.stack_status_reason,
        parameters: raw
            .parameters
            .into_iter()
            .map(|p| (p.parameter_key, p.parameter_value))
            .collect(),
        outputs: raw
            .outputs
            .into_iter()
            .map(|o| StackOutput {
                key: o.output_key,
                value: o.output_value,
                description: o.description,
                export_name: o.export_name,
            })
            .collect(),
        termination_protection: raw.enable_termination_protection,
        last_updated: raw.last_updated_time.or(raw.creation_time),
    })
}

/// Parse `describe-stack-events` output, oldest first.
///
/// The CLI lists events newest first.
pub fn stack_events(json: &str) -> Result<Vec<StackEvent>> {
    let parsed: DescribeEvents = serde_json::from_str(json)?;
    let mut events: Vec<StackEvent> = parsed
        .stack_events
        .into_iter()
        .map(|e| StackEvent {
            event_id: e.event_id,
            timestamp: e.timestamp,
            logical_id: e.logical_resource_id,
            resource_type: e.resource_type,
            status: RemoteStatus::new(e.resource_status),
            reason: e.resource_status_reason,
        })
        .collect();
    events.sort_by_key(|e| e.timestamp);
    Ok(events)
}

/// Parse the stack id from `create-stack` output.
pub fn created_stack_id(json: &str) -> Result<String> {
    let parsed: CreateStack = serde_json::from_str(json)?;
    Ok(parsed.stack_id)
}

/// Parse `get-template` output.
///
/// YAML templates come back as a string; JSON templates come back already
/// parsed and are re-serialized.
pub fn template_body(json: &str) -> Result<String> {
    let parsed: GetTemplate = serde_json::from_str(json)?;
    Ok(match parsed.template_body {
        serde_json::Value::String(body) => body,
        other => serde_json::to_string_pretty(&other)?,
    })
}
