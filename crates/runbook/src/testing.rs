//! Test doubles: a recording in-memory client, observer and packager

use crate::cancel::CancelToken;
use crate::client::{RemoteStack, RemoteStackClient, RemoteStatus, StackEvent, StackHandle, WaitSettings};
use crate::command::{CommandEnv, StackCommand};
use crate::context::{StackDeploymentContext, StackState};
use crate::descriptor::{StackDescriptor, TemplateRef};
use crate::diff::StackDiff;
use crate::error::{Error, Result};
use crate::observer::{AutoConfirm, ConfirmCallback, RunObserver};
use crate::outcome::StackOutcome;
use crate::packager::{ArtifactLocation, TemplatePackager};
use crate::payload::StackPayload;
use crate::retry::RetryConfig;
use crate::runbook::RunOptions;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

const ID_PREFIX: &str = "arn:fake:";

/// A remote call, keyed by stack name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Describe(String),
    Create(String),
    Update(String),
    Delete(String),
    TerminationProtection(String, bool),
    FetchTemplate(String),
}

#[derive(Debug, Clone)]
struct FakeStack {
    status: String,
    template: String,
    parameters: Vec<(String, String)>,
    updated: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct State {
    stacks: HashMap<String, FakeStack>,
    calls: Vec<Call>,
    create_payloads: Vec<StackPayload>,
    update_payloads: Vec<StackPayload>,
    events: HashMap<String, Vec<StackEvent>>,
    fail_events: bool,
    fail_create: HashSet<String>,
    no_updates: HashSet<String>,
    final_status: HashMap<String, String>,
    hanging: HashSet<String>,
    protection_unsupported: bool,
    scripted: HashMap<String, VecDeque<String>>,
    revision: i64,
}

impl State {
    /// A fresh update time, later than any handed out before
    fn tick(&mut self) -> Option<DateTime<Utc>> {
        self.revision += 1;
        DateTime::from_timestamp(1_700_000_000 + self.revision, 0)
    }
}

/// In-memory [`RemoteStackClient`] that records every call.
///
/// Mutations complete instantly unless the stack is marked with
/// [`hang`](Self::hang).
#[derive(Default)]
pub struct FakeClient {
    state: Mutex<State>,
}

fn stack_name(handle: &StackHandle) -> String {
    handle
        .id
        .strip_prefix(ID_PREFIX)
        .unwrap_or(&handle.id)
        .to_string()
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack(self, name: &str, status: &str) -> Self {
        self.state.lock().unwrap().stacks.insert(
            name.to_string(),
            FakeStack {
                status: status.to_string(),
                template: "Resources: {}\n".to_string(),
                parameters: Vec::new(),
                updated: None,
            },
        );
        self
    }

    pub fn with_template(self, name: &str, template: &str) -> Self {
        if let Some(stack) = self.state.lock().unwrap().stacks.get_mut(name) {
            stack.template = template.to_string();
        }
        self
    }

    pub fn with_parameters(self, name: &str, parameters: &[(&str, &str)]) -> Self {
        if let Some(stack) = self.state.lock().unwrap().stacks.get_mut(name) {
            stack.parameters = parameters
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        }
        self
    }

    pub fn push_events(&self, name: &str, events: Vec<StackEvent>) {
        self.state
            .lock()
            .unwrap()
            .events
            .entry(name.to_string())
            .or_default()
            .extend(events);
    }

    pub fn fail_events(&self, fail: bool) {
        self.state.lock().unwrap().fail_events = fail;
    }

    /// Make create calls for `name` fail with a remote error
    pub fn fail_create(&self, name: &str) {
        self.state.lock().unwrap().fail_create.insert(name.to_string());
    }

    /// Make update calls for `name` report no updates
    pub fn no_updates(&self, name: &str) {
        self.state.lock().unwrap().no_updates.insert(name.to_string());
    }

    /// Status the next mutation of `name` ends in
    pub fn finish_with(&self, name: &str, status: &str) {
        self.state
            .lock()
            .unwrap()
            .final_status
            .insert(name.to_string(), status.to_string());
    }

    /// Statuses the next describes of `name` report, one per call.
    ///
    /// Scripted reads carry no update time, like a lagging read that still
    /// shows the stack as it was before a mutation.
    pub fn script_statuses(&self, name: &str, statuses: &[&str]) {
        self.state.lock().unwrap().scripted.insert(
            name.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Keep `name` in progress forever once mutated
    pub fn hang(&self, name: &str) {
        self.state.lock().unwrap().hanging.insert(name.to_string());
    }

    pub fn termination_protection_unsupported(&self) {
        self.state.lock().unwrap().protection_unsupported = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Create, update, delete and termination-protection calls
    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Describe(_) | Call::FetchTemplate(_)))
            .count()
    }

    pub fn create_payloads(&self) -> Vec<StackPayload> {
        self.state.lock().unwrap().create_payloads.clone()
    }

    pub fn update_payloads(&self) -> Vec<StackPayload> {
        self.state.lock().unwrap().update_payloads.clone()
    }

    fn settle(state: &mut State, name: &str, default: &str) -> String {
        if state.hanging.contains(name) {
            return "UPDATE_IN_PROGRESS".to_string();
        }
        state
            .final_status
            .get(name)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

impl RemoteStackClient for FakeClient {
    fn describe(&self, stack: &StackHandle) -> Result<RemoteStack> {
        let name = stack_name(stack);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Describe(name.clone()));
        let scripted = state.scripted.get_mut(&name).and_then(VecDeque::pop_front);
        let fake = state.stacks.get(&name).ok_or_else(|| Error::NotFound(name.clone()))?;
        let (status, last_updated) = match scripted {
            Some(status) => (status, None),
            None => (fake.status.clone(), fake.updated),
        };
        Ok(RemoteStack {
            stack_id: format!("{ID_PREFIX}{name}"),
            stack_name: name.clone(),
            status: RemoteStatus::new(status),
            status_reason: None,
            parameters: fake.parameters.clone(),
            outputs: Vec::new(),
            termination_protection: None,
            last_updated,
        })
    }

    fn create(&self, stack: &StackHandle, payload: &StackPayload) -> Result<String> {
        let name = stack_name(stack);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(name.clone()));
        state.create_payloads.push(payload.clone());
        if state.fail_create.contains(&name) {
            return Err(Error::remote("AccessDenied: not authorized to create"));
        }
        let status = Self::settle(&mut state, &name, "CREATE_COMPLETE");
        let updated = state.tick();
        state.stacks.insert(
            name.clone(),
            FakeStack {
                status,
                template: payload.template_body.clone().unwrap_or_default(),
                parameters: payload
                    .parameters
                    .iter()
                    .map(|p| (p.parameter_key.clone(), p.parameter_value.clone()))
                    .collect(),
                updated,
            },
        );
        Ok(format!("{ID_PREFIX}{name}"))
    }

    fn update(&self, stack: &StackHandle, payload: &StackPayload) -> Result<()> {
        let name = stack_name(stack);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update(name.clone()));
        if state.no_updates.contains(&name) {
            return Err(Error::NoUpdates(name));
        }
        state.update_payloads.push(payload.clone());
        let status = Self::settle(&mut state, &name, "UPDATE_COMPLETE");
        let updated = state.tick();
        let fake = state.stacks.get_mut(&name).ok_or_else(|| Error::NotFound(name.clone()))?;
        fake.status = status;
        fake.updated = updated;
        if let Some(body) = &payload.template_body {
            fake.template = body.clone();
        }
        Ok(())
    }

    fn delete(&self, stack: &StackHandle) -> Result<()> {
        let name = stack_name(stack);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(name.clone()));
        if state.hanging.contains(&name) || state.final_status.contains_key(&name) {
            let status = Self::settle(&mut state, &name, "DELETE_COMPLETE");
            let updated = state.tick();
            if let Some(fake) = state.stacks.get_mut(&name) {
                fake.status = status;
                fake.updated = updated;
            }
        } else {
            state.stacks.remove(&name);
        }
        Ok(())
    }

    fn set_termination_protection(&self, stack: &StackHandle, enabled: bool) -> Result<()> {
        let name = stack_name(stack);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::TerminationProtection(name, enabled));
        if state.protection_unsupported {
            return Err(Error::CapabilityUnsupported {
                capability: "termination protection".to_string(),
                detail: "Invalid choice: 'update-termination-protection'".to_string(),
            });
        }
        Ok(())
    }

    fn fetch_recent_events(
        &self,
        stack: &StackHandle,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StackEvent>> {
        let state = self.state.lock().unwrap();
        if state.fail_events {
            return Err(Error::transient("Rate exceeded"));
        }
        Ok(state
            .events
            .get(&stack_name(stack))
            .map(|events| {
                events
                    .iter()
                    .filter(|e| since.is_none_or(|t| e.timestamp >= t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch_template(&self, stack: &StackHandle) -> Result<String> {
        let name = stack_name(stack);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FetchTemplate(name.clone()));
        state
            .stacks
            .get(&name)
            .map(|s| s.template.clone())
            .ok_or(Error::NotFound(name))
    }
}

/// Observer that keeps what it is told
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
    states: Mutex<Vec<(String, StackState)>>,
    diffs: Mutex<usize>,
}

impl RecordingObserver {
    pub fn event_ids(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<(String, StackState)> {
        self.states.lock().unwrap().clone()
    }

    pub fn diff_count(&self) -> usize {
        *self.diffs.lock().unwrap()
    }
}

impl RunObserver for RecordingObserver {
    fn on_state_change(&self, stack: &str, state: StackState) {
        self.states.lock().unwrap().push((stack.to_string(), state));
    }

    fn on_event(&self, _stack: &str, event: &StackEvent) {
        self.events.lock().unwrap().push(event.event_id.clone());
    }

    fn on_diff(&self, _stack: &str, _diff: &StackDiff) {
        *self.diffs.lock().unwrap() += 1;
    }
}

/// Packager returning a fixed body
pub struct RecordingPackager {
    body: String,
    packaged: Mutex<Vec<(PathBuf, String, String)>>,
}

impl RecordingPackager {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            packaged: Mutex::new(Vec::new()),
        }
    }

    /// (template, bucket, prefix) per call
    pub fn packaged(&self) -> Vec<(PathBuf, String, String)> {
        self.packaged.lock().unwrap().clone()
    }
}

impl TemplatePackager for RecordingPackager {
    fn package(&self, template: &Path, location: &ArtifactLocation) -> Result<TemplateRef> {
        self.packaged.lock().unwrap().push((
            template.to_path_buf(),
            location.bucket.clone(),
            location.prefix.clone(),
        ));
        Ok(TemplateRef::Body(self.body.clone()))
    }
}

/// Descriptor in stage `Dev` with an inline template
pub fn descriptor(name: &str) -> StackDescriptor {
    StackDescriptor::new(
        "Dev",
        name,
        "us-east-1",
        TemplateRef::Body("Resources: {}\n".to_string()),
    )
}

/// Options with millisecond polling and no tailing
pub fn fast_options() -> RunOptions {
    RunOptions {
        wait: WaitSettings {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(1),
            retry: RetryConfig {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                backoff_factor: 1.0,
                max_delay: Duration::from_millis(1),
            },
        },
        tail_events: false,
        ..RunOptions::default()
    }
}

fn run_in(
    command: &dyn StackCommand,
    env: &CommandEnv<'_>,
    descriptor: StackDescriptor,
) -> (StackDeploymentContext, StackOutcome) {
    let mut ctx = StackDeploymentContext::new(descriptor);
    ctx.begin();
    let outcome = command.execute(&mut ctx, env, &fast_options());
    ctx.finish(&outcome);
    (ctx, outcome)
}

/// Run one command against one stack with default collaborators
pub fn run_one(
    client: &FakeClient,
    command: &dyn StackCommand,
    descriptor: StackDescriptor,
) -> (StackDeploymentContext, StackOutcome) {
    let cancel = CancelToken::new();
    run_in(command, &CommandEnv::new(client, &cancel), descriptor)
}

pub fn run_one_with(
    client: &FakeClient,
    observer: &dyn RunObserver,
    confirm: &dyn ConfirmCallback,
    command: &dyn StackCommand,
    descriptor: StackDescriptor,
) -> (StackDeploymentContext, StackOutcome) {
    let cancel = CancelToken::new();
    let env = CommandEnv::new(client, &cancel)
        .with_observer(observer)
        .with_confirm(confirm);
    run_in(command, &env, descriptor)
}

pub fn run_one_with_packager(
    client: &FakeClient,
    packager: &dyn TemplatePackager,
    command: &dyn StackCommand,
    descriptor: StackDescriptor,
) -> (StackDeploymentContext, StackOutcome) {
    let cancel = CancelToken::new();
    let env = CommandEnv::new(client, &cancel)
        .with_packager(packager)
        .with_confirm(&AutoConfirm);
    run_in(command, &env, descriptor)
}
