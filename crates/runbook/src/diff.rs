//! Drift detection between a deployed stack and its descriptor

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Masked value the remote API returns for `NoEcho` parameters.
const MASKED: &str = "****";

/// How the desired template compares to the deployed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateChange {
    /// Same content (digests match)
    Unchanged,
    /// Content differs; changed lines only
    Changed { lines: Vec<DiffLine> },
    /// Desired template is only known by URL and cannot be compared
    Unknown,
}

/// One added or removed template line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub added: bool,
    pub text: String,
}

/// A parameter whose desired value differs from the deployed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterChange {
    pub key: String,
    /// Deployed value, `None` if the stack does not have the parameter
    pub current: Option<String>,
    pub desired: String,
}

/// Differences between a deployed stack and its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDiff {
    pub template: TemplateChange,
    pub current_digest: String,
    pub desired_digest: Option<String>,
    pub parameters: Vec<ParameterChange>,
}

impl StackDiff {
    /// Compare a deployed stack against the desired template and parameters.
    ///
    /// `desired_template` is `None` when the desired template is a remote URL
    /// (or the template is reused as-is); `None` with `reuse_template` set
    /// means the template is unchanged by definition.
    pub fn compute(
        current_template: &str,
        desired_template: Option<&str>,
        reuse_template: bool,
        current_parameters: &[(String, String)],
        desired_parameters: &[(String, String)],
    ) -> Self {
        let current_digest = template_digest(current_template);
        let (template, desired_digest) = match desired_template {
            _ if reuse_template => (TemplateChange::Unchanged, None),
            None => (TemplateChange::Unknown, None),
            Some(desired) => {
                let digest = template_digest(desired);
                let change = if digest == current_digest {
                    TemplateChange::Unchanged
                } else {
                    TemplateChange::Changed {
                        lines: changed_lines(current_template, desired),
                    }
                };
                (change, Some(digest))
            }
        };

        Self {
            template,
            current_digest,
            desired_digest,
            parameters: parameter_changes(current_parameters, desired_parameters),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.template == TemplateChange::Unchanged && self.parameters.is_empty()
    }
}

/// blake3 digest of a template after normalization.
///
/// JSON templates are compared by value, since the remote API may hand them
/// back re-serialized. Other templates ignore trailing whitespace.
pub fn template_digest(template: &str) -> String {
    blake3::hash(normalize(template).as_bytes())
        .to_hex()
        .to_string()
}

fn normalize(template: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(template) {
        return value.to_string();
    }
    let mut lines: Vec<&str> = template.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn changed_lines(current: &str, desired: &str) -> Vec<DiffLine> {
    let diff = TextDiff::from_lines(current, desired);
    diff.iter_all_changes()
        .filter_map(|change| match change.tag() {
            ChangeTag::Delete => Some(false),
            ChangeTag::Insert => Some(true),
            ChangeTag::Equal => None,
        }
        .map(|added| DiffLine {
            added,
            text: change.value().trim_end_matches('\n').to_string(),
        }))
        .collect()
}

/// Desired parameters that are missing or different remotely.
///
/// Remote-only parameters are running on template defaults and are not
/// reported; masked values cannot be compared and count as unchanged.
fn parameter_changes(
    current: &[(String, String)],
    desired: &[(String, String)],
) -> Vec<ParameterChange> {
    desired
        .iter()
        .filter_map(|(key, value)| {
            let deployed = current.iter().find(|(k, _)| k == key).map(|(_, v)| v);
            match deployed {
                Some(v) if v == value || v == MASKED => None,
                _ => Some(ParameterChange {
                    key: key.clone(),
                    current: deployed.cloned(),
                    desired: value.clone(),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_identical_templates_have_no_diff() {
        let diff = StackDiff::compute(
            "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n",
            Some("Resources:\n  Bucket:\n    Type: AWS::S3::Bucket   \n\n"),
            false,
            &params(&[("Env", "dev")]),
            &params(&[("Env", "dev")]),
        );
        assert!(diff.is_empty());
        assert_eq!(diff.desired_digest.as_deref(), Some(diff.current_digest.as_str()));
    }

    #[test]
    fn test_json_templates_compare_by_value() {
        let diff = StackDiff::compute(
            r#"{"Resources":{"Bucket":{"Type":"AWS::S3::Bucket"}}}"#,
            Some("{\n  \"Resources\": {\n    \"Bucket\": { \"Type\": \"AWS::S3::Bucket\" }\n  }\n}\n"),
            false,
            &[],
            &[],
        );
        assert!(diff.is_empty());
    }

    #[test]
    fn test_changed_template_lists_lines() {
        let diff = StackDiff::compute(
            "Resources:\n  A: 1\n",
            Some("Resources:\n  A: 2\n"),
            false,
            &[],
            &[],
        );
        let TemplateChange::Changed { lines } = &diff.template else {
            panic!("expected a template change, got {:?}", diff.template);
        };
        assert_eq!(
            lines,
            &vec![
                DiffLine {
                    added: false,
                    text: "  A: 1".into()
                },
                DiffLine {
                    added: true,
                    text: "  A: 2".into()
                },
            ]
        );
    }

    #[test]
    fn test_url_template_always_counts_as_changed() {
        let diff = StackDiff::compute("Resources: {}", None, false, &[], &[]);
        assert_eq!(diff.template, TemplateChange::Unknown);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_reused_template_is_unchanged() {
        let diff = StackDiff::compute("Resources: {}", None, true, &[], &[]);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_parameter_changes() {
        let diff = StackDiff::compute(
            "x",
            Some("x"),
            false,
            &params(&[("Env", "dev"), ("Secret", "****"), ("Defaulted", "1")]),
            &params(&[("Env", "prod"), ("Secret", "hunter2"), ("New", "a")]),
        );
        assert_eq!(
            diff.parameters,
            vec![
                ParameterChange {
                    key: "Env".into(),
                    current: Some("dev".into()),
                    desired: "prod".into(),
                },
                ParameterChange {
                    key: "New".into(),
                    current: None,
                    desired: "a".into(),
                },
            ]
        );
    }
}
