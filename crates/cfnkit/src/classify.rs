//! Map AWS CLI failures onto runner errors.
//!
//! The CLI reports every failure as text on stderr, e.g.
//! `An error occurred (ValidationError) when calling the UpdateStack
//! operation: No updates are to be performed.` The markers below are matched
//! case-insensitively.

use runbook::Error;

const NOT_FOUND: &[&str] = &["does not exist"];

const NO_UPDATES: &[&str] = &["no updates are to be performed"];

const TRANSIENT: &[&str] = &[
    "throttling",
    "rate exceeded",
    "requestlimitexceeded",
    "could not connect to the endpoint",
    "connection was closed",
    "connect timeout",
    "read timeout",
    "timed out",
    "serviceunavailable",
    "internalfailure",
];

/// Markers of a CLI that does not know a subcommand or flag
const UNSUPPORTED: &[&str] = &["invalid choice", "unknown options"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Classify stderr of a failed `aws` invocation for `stack`.
pub fn classify(stderr: &str, stack: &str) -> Error {
    let message = stderr.trim();
    let lower = message.to_lowercase();

    if contains_any(&lower, NOT_FOUND) {
        return Error::NotFound(stack.to_string());
    }
    if contains_any(&lower, NO_UPDATES) {
        return Error::NoUpdates(stack.to_string());
    }
    if contains_any(&lower, TRANSIENT) {
        return Error::transient(message);
    }
    Error::remote(message)
}

/// Classify stderr of a call that needs `capability` from the installed CLI.
///
/// An unknown subcommand or option means the CLI predates the API.
pub fn classify_capability(stderr: &str, stack: &str, capability: &str) -> Error {
    if contains_any(&stderr.to_lowercase(), UNSUPPORTED) {
        return Error::CapabilityUnsupported {
            capability: capability.to_string(),
            detail: stderr.trim().to_string(),
        };
    }
    classify(stderr, stack)
}
