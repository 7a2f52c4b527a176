//! Stack configuration file (`cfn-cli.yaml`)
//!
//! ```yaml
//! Version: 3
//! Blueprints:
//!   base:
//!     Region: us-east-1
//! Stages:
//!   Dev:
//!     Order: 1
//!     Network:
//!       Extends: base
//!       Template: templates/network.yaml
//! ```
//!
//! Stage mappings mix the `Order` key with stack entries, so stages are read
//! as raw YAML and each stack entry (merged over its blueprint) is then
//! deserialized into a typed stack entry.

use crate::paths;
use runbook::{
    AccountSelector, OnFailure, StackDescriptor, StackPolicy, StageGroup, TemplateRef,
};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--file` is not given
pub const DEFAULT_CONFIG_FILE: &str = "cfn-cli.yaml";

/// The only config schema version understood
pub const SUPPORTED_VERSION: u64 = 3;

const ORDER_KEY: &str = "Order";
const EXTENDS_KEY: &str = "Extends";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unsupported config Version {0} (expected 3)")]
    Version(String),

    #[error("stack {stack} extends unknown blueprint '{blueprint}'")]
    UnknownBlueprint { stack: String, blueprint: String },

    #[error("stack name '{stack}' appears twice in stage '{stage}'")]
    Duplicate { stage: String, stack: String },

    #[error("{context}: {message}")]
    Invalid { context: String, message: String },

    #[error(transparent)]
    Stack(#[from] runbook::Error),
}

impl ConfigError {
    fn invalid(context: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            context: context.into(),
            message: message.into(),
        }
    }
}

type Result<T> = std::result::Result<T, ConfigError>;

/// Values from outside the file that fill in missing stack keys
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// `--region`, then the settings default; used when a stack has no `Region`
    pub default_region: Option<String>,
    /// `--profile`; overrides every stack's `Profile`
    pub profile: Option<String>,
}

/// Keys of one stack entry, after blueprint merge (`Extends` removed)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct StackConfig {
    stack_name: Option<String>,
    profile: Option<String>,
    region: Option<String>,
    template: Option<String>,
    parameters: Option<Mapping>,
    tags: Option<Mapping>,
    #[serde(default)]
    capabilities: Vec<String>,
    stack_policy: Option<String>,
    on_failure: Option<String>,
    disable_rollback: Option<bool>,
    termination_protection: Option<bool>,
    #[serde(rename = "RoleARN")]
    role_arn: Option<String>,
    #[serde(rename = "NotificationARNs", default)]
    notification_arns: Vec<String>,
    timeout_in_minutes: Option<u32>,
    package: Option<bool>,
    artifact_store: Option<String>,
    order: Option<i64>,
}

/// A loaded configuration file: stages in run order.
#[derive(Debug, Clone)]
pub struct RunConfig {
    path: PathBuf,
    stages: Vec<StageGroup>,
}

impl RunConfig {
    /// Load and validate the config file at `path`.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let root: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let stages = parse_root(&root, base_dir, options)?;
        log::debug!(
            "loaded {} stage(s) from {}",
            stages.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            stages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stages(&self) -> &[StageGroup] {
        &self.stages
    }

    /// Total number of stacks across all stages
    pub fn stack_count(&self) -> usize {
        self.stages.iter().map(|s| s.stacks.len()).sum()
    }
}

fn parse_root(root: &Value, base_dir: &Path, options: &LoadOptions) -> Result<Vec<StageGroup>> {
    let root = root
        .as_mapping()
        .ok_or_else(|| ConfigError::invalid("config", "top level must be a mapping"))?;

    check_version(root.get("Version"))?;

    let blueprints = match root.get("Blueprints") {
        Some(Value::Mapping(map)) => map.clone(),
        Some(Value::Null) | None => Mapping::new(),
        Some(_) => return Err(ConfigError::invalid("Blueprints", "must be a mapping")),
    };

    let stages = match root.get("Stages") {
        Some(Value::Mapping(map)) => map,
        _ => return Err(ConfigError::invalid("Stages", "must be a non-empty mapping")),
    };

    let mut ordered = Vec::with_capacity(stages.len());
    for (key, value) in stages {
        let stage_name = key_name(key, "Stages")?;
        let body = value
            .as_mapping()
            .ok_or_else(|| ConfigError::invalid(format!("stage {stage_name}"), "must be a mapping"))?;
        let order = read_order(body.get(ORDER_KEY), &stage_name)?;
        let stage = parse_stage(&stage_name, body, &blueprints, base_dir, options)?;
        ordered.push((order, stage));
    }

    // Stable sort keeps declaration order for equal (or missing) Order
    ordered.sort_by_key(|(order, _)| order.unwrap_or(i64::MAX));
    Ok(ordered.into_iter().map(|(_, stage)| stage).collect())
}

fn check_version(version: Option<&Value>) -> Result<()> {
    match version {
        Some(Value::Number(n)) if n.as_u64() == Some(SUPPORTED_VERSION) => Ok(()),
        Some(Value::String(s)) if s.trim() == SUPPORTED_VERSION.to_string() => Ok(()),
        Some(other) => Err(ConfigError::Version(scalar_to_string(other).unwrap_or_default())),
        None => Err(ConfigError::Version("<missing>".to_string())),
    }
}

fn parse_stage(
    stage_name: &str,
    body: &Mapping,
    blueprints: &Mapping,
    base_dir: &Path,
    options: &LoadOptions,
) -> Result<StageGroup> {
    let mut stacks = Vec::new();
    let mut seen = HashSet::new();

    for (key, value) in body {
        let key = key_name(key, stage_name)?;
        if key == ORDER_KEY {
            continue;
        }
        let context = format!("{stage_name}.{key}");
        let merged = merge_blueprint(value, blueprints, &context)?;
        let config: StackConfig = serde_yaml::from_value(Value::Mapping(merged))
            .map_err(|e| ConfigError::invalid(&context, e.to_string()))?;

        let order = config.order;
        let descriptor = build_descriptor(stage_name, &key, config, base_dir, options)?;
        if !seen.insert(descriptor.name.clone()) {
            return Err(ConfigError::Duplicate {
                stage: stage_name.to_string(),
                stack: descriptor.name,
            });
        }
        stacks.push((order, descriptor));
    }

    stacks.sort_by_key(|(order, _)| order.unwrap_or(i64::MAX));
    let stage = StageGroup::new(stage_name, stacks.into_iter().map(|(_, d)| d).collect());
    stage.validate()?;
    Ok(stage)
}

/// Lay the stack's own keys over its blueprint's keys.
fn merge_blueprint(value: &Value, blueprints: &Mapping, context: &str) -> Result<Mapping> {
    let own = value
        .as_mapping()
        .ok_or_else(|| ConfigError::invalid(context, "stack entry must be a mapping"))?;

    let Some(extends) = own.get(EXTENDS_KEY) else {
        return Ok(own.clone());
    };
    let blueprint_name = extends
        .as_str()
        .ok_or_else(|| ConfigError::invalid(context, "Extends must be a blueprint name"))?;
    let blueprint = blueprints
        .get(blueprint_name)
        .and_then(Value::as_mapping)
        .ok_or_else(|| ConfigError::UnknownBlueprint {
            stack: context.to_string(),
            blueprint: blueprint_name.to_string(),
        })?;

    let mut merged = blueprint.clone();
    for (k, v) in own {
        merged.insert(k.clone(), v.clone());
    }
    // Blueprints do not chain
    merged.remove(EXTENDS_KEY);
    Ok(merged)
}

fn build_descriptor(
    stage_name: &str,
    key: &str,
    config: StackConfig,
    base_dir: &Path,
    options: &LoadOptions,
) -> Result<StackDescriptor> {
    let context = format!("{stage_name}.{key}");
    let name = config.stack_name.unwrap_or_else(|| key.to_string());

    let region = config
        .region
        .or_else(|| options.default_region.clone())
        .ok_or_else(|| {
            ConfigError::invalid(&context, "no Region (set it, pass --region or a default_region)")
        })?;

    let location = config
        .template
        .ok_or_else(|| ConfigError::invalid(&context, "no Template"))?;
    let template = match TemplateRef::from_location(&location) {
        TemplateRef::Path(_) => TemplateRef::Path(paths::resolve_against(base_dir, &location)),
        other => other,
    };

    let on_failure = config
        .on_failure
        .map(|raw| {
            OnFailure::parse(&raw).ok_or_else(|| {
                ConfigError::invalid(
                    &context,
                    format!("OnFailure must be DO_NOTHING, ROLLBACK or DELETE, got '{raw}'"),
                )
            })
        })
        .transpose()?;

    let stack_policy = config
        .stack_policy
        .map(|raw| load_policy(&raw, base_dir, &context))
        .transpose()?;

    let profile = options.profile.clone().or(config.profile);

    let mut descriptor = StackDescriptor::new(stage_name, name, region, template);
    descriptor.account = AccountSelector { profile };
    descriptor.parameters = stringify_pairs(config.parameters, &context, "Parameters")?;
    descriptor.tags = stringify_pairs(config.tags, &context, "Tags")?;
    descriptor.capabilities = config.capabilities;
    descriptor.stack_policy = stack_policy;
    descriptor.on_failure = on_failure;
    descriptor.disable_rollback = config.disable_rollback.unwrap_or(false);
    descriptor.termination_protection = config.termination_protection;
    descriptor.role_arn = config.role_arn;
    descriptor.notification_arns = config.notification_arns;
    descriptor.timeout_in_minutes = config.timeout_in_minutes;
    descriptor.package = config.package.unwrap_or(false);
    descriptor.artifact_store = config.artifact_store;
    Ok(descriptor)
}

/// `StackPolicy` is an inline JSON document, a URL, or a path to a JSON file.
fn load_policy(raw: &str, base_dir: &Path, context: &str) -> Result<StackPolicy> {
    let trimmed = raw.trim();
    if runbook::descriptor::is_remote_url(trimmed) {
        return Ok(StackPolicy::Url(trimmed.to_string()));
    }

    let body = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        let path = paths::resolve_against(base_dir, trimmed);
        fs::read_to_string(&path).map_err(|e| {
            ConfigError::invalid(
                context,
                format!("could not read StackPolicy {}: {e}", path.display()),
            )
        })?
    };

    serde_json::from_str::<serde_json::Value>(&body)
        .map_err(|e| ConfigError::invalid(context, format!("StackPolicy is not valid JSON: {e}")))?;
    Ok(StackPolicy::Body(body))
}

/// Ordered key/value pairs with scalar values stringified.
fn stringify_pairs(
    map: Option<Mapping>,
    context: &str,
    field: &str,
) -> Result<Vec<(String, String)>> {
    let Some(map) = map else {
        return Ok(Vec::new());
    };
    map.iter()
        .map(|(k, v)| {
            let key = key_name(k, context)?;
            let value = match v {
                // Lists become CommaDelimitedList values
                Value::Sequence(items) => items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Option<Vec<_>>>()
                    .map(|parts| parts.join(",")),
                other => scalar_to_string(other),
            }
            .ok_or_else(|| {
                ConfigError::invalid(context, format!("{field}.{key} must be a scalar or a list"))
            })?;
            Ok((key, value))
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn key_name(key: &Value, context: &str) -> Result<String> {
    scalar_to_string(key)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::invalid(context, "keys must be non-empty scalars"))
}

fn read_order(value: Option<&Value>, context: &str) -> Result<Option<i64>> {
    match value {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(context, "Order must be an integer")),
        Some(_) => Err(ConfigError::invalid(context, "Order must be an integer")),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn load(content: &str) -> Result<RunConfig> {
        let (_dir, path) = write_config(content);
        RunConfig::load(&path, &LoadOptions::default())
    }

    fn names(config: &RunConfig) -> Vec<String> {
        config
            .stages()
            .iter()
            .flat_map(|s| s.stacks.iter().map(StackDescriptor::qualified_name))
            .collect()
    }

    #[test]
    fn test_blueprint_merge_under_own_keys() {
        let config = load(
            r"
Version: 3
Blueprints:
  base:
    Region: eu-west-1
    Capabilities: [CAPABILITY_IAM]
    Parameters: { Env: base }
Stages:
  Dev:
    Network:
      Extends: base
      Template: https://example.com/network.yaml
      Parameters: { Env: dev, Size: 3, Enabled: true }
",
        )
        .unwrap();

        let stack = &config.stages()[0].stacks[0];
        assert_eq!(stack.region, "eu-west-1");
        assert_eq!(stack.capabilities, vec!["CAPABILITY_IAM"]);
        // Own Parameters replace the blueprint's as a whole
        assert_eq!(
            stack.parameters,
            vec![
                ("Env".to_string(), "dev".to_string()),
                ("Size".to_string(), "3".to_string()),
                ("Enabled".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_stage_and_stack_ordering() {
        let config = load(
            r"
Version: 3
Stages:
  Prod:
    Order: 2
    App: { Region: us-east-1, Template: https://e.com/t.yaml }
  Dev:
    Order: 1
    Db: { Region: us-east-1, Template: https://e.com/t.yaml, Order: 2 }
    Network: { Region: us-east-1, Template: https://e.com/t.yaml, Order: 1 }
    Cache: { Region: us-east-1, Template: https://e.com/t.yaml }
",
        )
        .unwrap();

        assert_eq!(
            names(&config),
            vec!["Dev.Network", "Dev.Db", "Dev.Cache", "Prod.App"]
        );
    }

    #[test]
    fn test_relative_template_resolves_against_config_dir() {
        let (dir, path) = write_config(
            r"
Version: 3
Stages:
  Dev:
    Network:
      Region: us-east-1
      Template: templates/network.yaml
",
        );
        let config = RunConfig::load(&path, &LoadOptions::default()).unwrap();
        assert_eq!(
            config.stages()[0].stacks[0].template,
            TemplateRef::Path(dir.path().join("templates/network.yaml"))
        );
    }

    #[test]
    fn test_duplicate_stack_name_in_stage() {
        let err = load(
            r"
Version: 3
Stages:
  Dev:
    First: { StackName: Shared, Region: us-east-1, Template: https://e.com/t.yaml }
    Second: { StackName: Shared, Region: us-east-1, Template: https://e.com/t.yaml }
",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Duplicate { .. }));
    }

    #[test]
    fn test_unknown_blueprint() {
        let err = load(
            r"
Version: 3
Stages:
  Dev:
    Network: { Extends: missing, Region: us-east-1, Template: https://e.com/t.yaml }
",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBlueprint { .. }));
    }

    #[test]
    fn test_unsupported_version() {
        let err = load("Version: 2\nStages: { Dev: {} }\n").unwrap_err();
        assert!(matches!(err, ConfigError::Version(v) if v == "2"));
    }

    #[test]
    fn test_region_falls_back_to_options_and_profile_overrides() {
        let (_dir, path) = write_config(
            r"
Version: 3
Stages:
  Dev:
    Network: { Profile: dev, Template: https://e.com/t.yaml }
",
        );
        let options = LoadOptions {
            default_region: Some("ap-southeast-2".to_string()),
            profile: Some("ops".to_string()),
        };
        let config = RunConfig::load(&path, &options).unwrap();
        let stack = &config.stages()[0].stacks[0];
        assert_eq!(stack.region, "ap-southeast-2");
        assert_eq!(stack.account.profile.as_deref(), Some("ops"));
    }

    #[test]
    fn test_missing_region_is_an_error() {
        let err = load(
            r"
Version: 3
Stages:
  Dev:
    Network: { Template: https://e.com/t.yaml }
",
        )
        .unwrap_err();
        assert!(err.to_string().contains("no Region"));
    }

    #[test]
    fn test_unknown_stack_key_is_rejected() {
        let err = load(
            r"
Version: 3
Stages:
  Dev:
    Network: { Region: us-east-1, Template: https://e.com/t.yaml, Tempalte: x }
",
        )
        .unwrap_err();
        assert!(err.to_string().contains("Dev.Network"));
    }

    #[test]
    fn test_stack_policy_from_file_and_inline() {
        let (dir, path) = write_config(
            r#"
Version: 3
Stages:
  Dev:
    FromFile: { Region: us-east-1, Template: https://e.com/t.yaml, StackPolicy: policy.json }
    Inline: { Region: us-east-1, Template: https://e.com/t.yaml, StackPolicy: '{"Statement": []}' }
"#,
        );
        fs::write(dir.path().join("policy.json"), r#"{"Statement": [1]}"#).unwrap();

        let config = RunConfig::load(&path, &LoadOptions::default()).unwrap();
        let stacks = &config.stages()[0].stacks;
        assert_eq!(
            stacks[0].stack_policy,
            Some(StackPolicy::Body(r#"{"Statement": [1]}"#.to_string()))
        );
        assert_eq!(
            stacks[1].stack_policy,
            Some(StackPolicy::Body(r#"{"Statement": []}"#.to_string()))
        );
    }

    #[test]
    fn test_rollback_conflict_is_reported() {
        let err = load(
            r"
Version: 3
Stages:
  Dev:
    Network:
      Region: us-east-1
      Template: https://e.com/t.yaml
      DisableRollback: true
      OnFailure: DELETE
",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Stack(_)));
    }

    #[test]
    fn test_list_parameters_are_comma_joined() {
        let config = load(
            r"
Version: 3
Stages:
  Dev:
    Network:
      Region: us-east-1
      Template: https://e.com/t.yaml
      Parameters:
        Subnets: [a, b, c]
      Tags:
        Team: platform
",
        )
        .unwrap();
        let stack = &config.stages()[0].stacks[0];
        assert_eq!(stack.parameter("Subnets"), Some("a,b,c"));
        assert_eq!(stack.tags, vec![("Team".to_string(), "platform".to_string())]);
    }
}
