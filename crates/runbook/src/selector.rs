//! Stack selection by stage/stack name patterns

use crate::descriptor::{StackDescriptor, StageGroup};
use crate::error::{Error, Result};
use regex::Regex;

/// A glob pattern (`*`, `?`, `[...]`) compiled to an anchored regex.
///
/// An empty pattern matches everything.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Option<Regex>,
}

impl NamePattern {
    /// Compile a glob pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() || pattern == "*" {
            return Ok(Self {
                source: pattern.to_string(),
                regex: None,
            });
        }

        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|e| {
            Error::Validation(format!("invalid name pattern '{pattern}': {e}"))
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex: Some(regex),
        })
    }

    /// Check if a name matches.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().is_none_or(|r| r.is_match(name))
    }

    /// The pattern as written by the operator.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Translate a shell glob into an anchored regex.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                // Character class; `[!..]` negates like fnmatch
                let mut class = String::from("[");
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if inner == '\\' {
                        class.push_str("\\\\");
                    } else {
                        class.push(inner);
                    }
                }
                if closed {
                    class.push(']');
                    out.push_str(&class);
                } else {
                    out.push_str(&regex::escape(&format!("[{}", &class[1..])));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

/// Filters the loaded stages down to the operator's selection.
#[derive(Debug, Clone)]
pub struct StackSelector {
    stage: NamePattern,
    stack: NamePattern,
}

impl StackSelector {
    /// Build a selector from stage and stack patterns (empty selects all).
    pub fn new(stage_pattern: &str, stack_pattern: &str) -> Result<Self> {
        Ok(Self {
            stage: NamePattern::new(stage_pattern)?,
            stack: NamePattern::new(stack_pattern)?,
        })
    }

    /// Build a selector from a combined `Stage.Stack` pattern.
    ///
    /// A pattern without a dot selects that stack name in every stage.
    pub fn from_qualified(pattern: &str) -> Result<Self> {
        match pattern.split_once('.') {
            Some((stage, stack)) => Self::new(stage, stack),
            None => Self::new("", pattern),
        }
    }

    /// Select all descriptors matching both patterns.
    ///
    /// Output keeps declaration order: stages in order, stacks in order within
    /// each stage. Zero matches is an error, not an empty batch.
    pub fn select(&self, stages: &[StageGroup]) -> Result<Vec<StackDescriptor>> {
        let selected: Vec<StackDescriptor> = stages
            .iter()
            .filter(|stage| self.stage.matches(&stage.name))
            .flat_map(|stage| stage.stacks.iter())
            .filter(|stack| self.stack.matches(&stack.name))
            .cloned()
            .collect();

        if selected.is_empty() {
            return Err(Error::Selection {
                stage: self.stage.as_str().to_string(),
                stack: self.stack.as_str().to_string(),
            });
        }

        log::debug!(
            "selected {} stack(s) with stage='{}' stack='{}'",
            selected.len(),
            self.stage.as_str(),
            self.stack.as_str()
        );
        Ok(selected)
    }
}

/// Convenience wrapper for [`StackSelector::select`].
pub fn select(
    stages: &[StageGroup],
    stage_pattern: &str,
    stack_pattern: &str,
) -> Result<Vec<StackDescriptor>> {
    StackSelector::new(stage_pattern, stack_pattern)?.select(stages)
}
